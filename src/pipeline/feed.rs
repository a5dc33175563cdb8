//! One fetch cycle: resolve the high-water mark, walk backwards, and answer
//! the request with either the batch or a cycle-level error message.

use crate::api::ProposalApiClient;
use crate::pipeline::attribution::AttributionResolver;
use crate::pipeline::high_water::HighWaterMarkResolver;
use crate::pipeline::outcome::Outcome;
use crate::pipeline::record::RecordFetcher;
use crate::pipeline::sources::{NameSource, ProposalCountSource, ProposalSource};
use crate::pipeline::walker::BatchWalker;
use crate::rpc::ChainRpcClient;
use crate::runtime::config::FeedConfig;
use crate::runtime::protocol::{FetchRequest, FetchResponse};
use crate::runtime::telemetry::Telemetry;
use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// External collaborators a [`ProposalFeed`] is assembled from.
pub struct FeedSources {
    pub counts: Arc<dyn ProposalCountSource>,
    pub names: Arc<dyn NameSource>,
    pub proposals: Arc<dyn ProposalSource>,
}

#[derive(Clone)]
pub struct ProposalFeed {
    resolver: HighWaterMarkResolver,
    walker: BatchWalker,
    telemetry: Arc<Telemetry>,
}

impl ProposalFeed {
    pub fn new(resolver: HighWaterMarkResolver, walker: BatchWalker, telemetry: Arc<Telemetry>) -> Self {
        Self {
            resolver,
            walker,
            telemetry,
        }
    }

    /// Wires the production clients described by `config`.
    pub fn from_config(
        config: &FeedConfig,
        telemetry: Arc<Telemetry>,
        shutdown: CancellationToken,
    ) -> Result<Self> {
        let chain = Arc::new(ChainRpcClient::from_config(config)?);
        let api = Arc::new(ProposalApiClient::from_config(config)?);
        let sources = FeedSources {
            counts: chain.clone(),
            names: chain,
            proposals: api,
        };
        Ok(Self::from_sources(config, sources, telemetry, shutdown))
    }

    pub fn from_sources(
        config: &FeedConfig,
        sources: FeedSources,
        telemetry: Arc<Telemetry>,
        shutdown: CancellationToken,
    ) -> Self {
        let policy = config.retry_policy();
        let resolver =
            HighWaterMarkResolver::new(sources.counts, policy).with_cancellation(shutdown.clone());
        let attribution = AttributionResolver::new(sources.names, policy, telemetry.clone());
        let fetcher = RecordFetcher::new(sources.proposals, attribution, config.request_timeout());
        let walker = BatchWalker::new(Arc::new(fetcher), telemetry.clone())
            .with_slack(config.walk_slack())
            .with_pacing(config.walk_pacing())
            .with_cancellation(shutdown);
        Self::new(resolver, walker, telemetry)
    }

    /// Runs one complete cycle. Exactly one response per request.
    pub async fn handle(&self, request: &FetchRequest) -> FetchResponse {
        let target_count = request.target_count();
        self.telemetry.record_fetch_cycle();

        let latest_id = match self.resolver.resolve_latest_id().await {
            Outcome::Value(latest_id) => latest_id,
            Outcome::Fatal(err) => return self.fail(err),
            Outcome::Skipped(reason) => return self.fail(anyhow::anyhow!(reason)),
        };

        tracing::info!(target_count, latest_id, "fetching proposals");
        let report = self.walker.collect(latest_id, target_count).await;
        FetchResponse::Data(report.batch)
    }

    fn fail(&self, err: anyhow::Error) -> FetchResponse {
        tracing::error!(error = %format!("{err:#}"), "fetch cycle failed");
        self.telemetry.record_failed_cycle();
        FetchResponse::Error(err.to_string())
    }
}
