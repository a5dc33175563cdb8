//! Resolves the newest record identifier, the point the backward walk
//! starts from.

use crate::pipeline::outcome::Outcome;
use crate::pipeline::sources::ProposalCountSource;
use crate::rpc::retry::{retry_with_backoff, RetryContext, RetryPolicy, PROPOSAL_COUNT_RETRY};
use anyhow::anyhow;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const LATEST_ID_UNAVAILABLE: &str = "Failed to retrieve the latest proposal ID";

#[derive(Clone)]
pub struct HighWaterMarkResolver {
    source: Arc<dyn ProposalCountSource>,
    policy: RetryPolicy,
    cancellation: CancellationToken,
}

impl HighWaterMarkResolver {
    pub fn new(source: Arc<dyn ProposalCountSource>, policy: RetryPolicy) -> Self {
        Self {
            source,
            policy,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns the record count as the latest identifier, or `Fatal` once the
    /// retry budget is spent. A count of zero names no identifier and is also
    /// `Fatal`. Never `Skipped`.
    pub async fn resolve_latest_id(&self) -> Outcome<u64> {
        tracing::debug!("resolving latest proposal id");
        let context = RetryContext::new(&PROPOSAL_COUNT_RETRY).with_cancellation(&self.cancellation);
        match retry_with_backoff(self.policy, context, |_| self.source.proposal_count()).await {
            Ok(0) => {
                tracing::warn!("proposal count is zero");
                Outcome::Fatal(anyhow!(LATEST_ID_UNAVAILABLE))
            }
            Ok(latest) => {
                tracing::info!(latest_id = latest, "resolved latest proposal id");
                Outcome::Value(latest)
            }
            Err(err) => Outcome::Fatal(err.context(LATEST_ID_UNAVAILABLE)),
        }
    }
}
