//! HTTP client for the per-identifier proposal endpoint
//! (`{base_url}/proposal/{id}`).

use crate::api::payload::RawProposal;
use crate::pipeline::sources::ProposalSource;
use crate::runtime::config::FeedConfig;
use anyhow::{anyhow, bail, Context, Result};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
pub enum ApiError {
    Timeout { id: u64 },
    Status { id: u64, status: u16 },
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ApiError::Timeout { id } => write!(f, "request for proposal {id} timed out"),
            ApiError::Status { id, status } => {
                write!(f, "proposal {id} request returned HTTP {status}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Clone)]
pub struct ProposalApiClient {
    base_url: Arc<String>,
    client: reqwest::Client,
    request_timeout: Duration,
}

impl ProposalApiClient {
    pub fn new(base_url: impl Into<String>, request_timeout: Duration) -> Result<Self> {
        if request_timeout.is_zero() {
            bail!("request_timeout must be greater than 0");
        }
        let base_url = base_url.into().trim().trim_end_matches('/').to_owned();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            bail!("api_base_url must start with http:// or https://");
        }

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .context("failed to build proposal API client")?;

        Ok(Self {
            base_url: Arc::new(base_url),
            client,
            request_timeout,
        })
    }

    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        Self::new(config.api_base_url(), config.request_timeout())
    }

    pub fn endpoint_for(&self, id: u64) -> String {
        format!("{}/proposal/{id}", self.base_url)
    }

    /// One GET for proposal `id`, bounded by the configured timeout.
    pub async fn fetch_proposal(&self, id: u64) -> Result<RawProposal> {
        let url = self.endpoint_for(id);
        let response = self
            .client
            .get(&url)
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|err| classify_transport_error(id, err))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                id,
                status: status.as_u16(),
            }
            .into());
        }

        response
            .json::<RawProposal>()
            .await
            .map_err(|err| classify_transport_error(id, err))
            .with_context(|| format!("malformed payload for proposal {id}"))
    }
}

impl ProposalSource for ProposalApiClient {
    fn fetch_proposal(&self, id: u64) -> BoxFuture<'_, Result<RawProposal>> {
        Box::pin(ProposalApiClient::fetch_proposal(self, id))
    }
}

fn classify_transport_error(id: u64, err: reqwest::Error) -> anyhow::Error {
    if err.is_timeout() {
        ApiError::Timeout { id }.into()
    } else {
        anyhow!("proposal {id} request failed: {err}")
    }
}
