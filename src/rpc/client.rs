//! JSON-RPC client for the two read-only chain queries the feed needs: the
//! governor's `proposalCount()` (the high-water mark) and ENS reverse
//! resolution for proposer addresses, confirmed by a forward lookup. Each
//! method issues single attempts; retrying is the caller's business.

use crate::pipeline::sources::{NameSource, ProposalCountSource};
use crate::rpc::abi;
use crate::rpc::auth::build_auth_headers;
use crate::rpc::metrics::{RpcMetrics, RpcMetricsSnapshot};
use crate::rpc::options::RpcClientOptions;
use crate::runtime::config::FeedConfig;
use alloy_primitives::{Address, B256};
use anyhow::{anyhow, Result};
use futures::future::BoxFuture;
use jsonrpsee::core::client::{ClientT, Error as JsonRpcError};
use jsonrpsee::http_client::{HttpClient, HttpClientBuilder};
use jsonrpsee::rpc_params;
use serde_json::json;
use std::str::FromStr;
use std::sync::Arc;
use tokio::time::{timeout, Instant};

const ETH_CALL: &str = "eth_call";
const PROPOSAL_COUNT_SIGNATURE: &str = "proposalCount()";
const RESOLVER_SIGNATURE: &str = "resolver(bytes32)";
const NAME_SIGNATURE: &str = "name(bytes32)";
const ADDR_SIGNATURE: &str = "addr(bytes32)";

#[derive(Debug)]
pub enum RpcError {
    Timeout { method: &'static str },
    MalformedResult { call: &'static str },
    InvalidAddress { raw: String },
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcError::Timeout { method } => write!(f, "rpc method {method} timed out"),
            RpcError::MalformedResult { call } => {
                write!(f, "rpc call {call} returned a malformed result")
            }
            RpcError::InvalidAddress { raw } => write!(f, "{raw:?} is not a valid address"),
        }
    }
}

impl std::error::Error for RpcError {}

#[derive(Debug, Clone)]
pub struct ChainRpcClient {
    rpc_url: Arc<String>,
    client: HttpClient,
    options: RpcClientOptions,
    metrics: Arc<RpcMetrics>,
}

impl ChainRpcClient {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::with_options(url, None, RpcClientOptions::default())
    }

    pub fn with_options(
        url: impl Into<String>,
        credentials: Option<(&str, &str)>,
        options: RpcClientOptions,
    ) -> Result<Self> {
        options.validate()?;

        let rpc_url = url.into();
        let headers = build_auth_headers(credentials)?;
        let client = HttpClientBuilder::default()
            .set_headers(headers)
            .request_timeout(options.request_timeout)
            .max_concurrent_requests(options.max_concurrent_requests)
            .build(&rpc_url)
            .map_err(|err| anyhow!("failed to build RPC client: {err}"))?;

        Ok(Self {
            rpc_url: Arc::new(rpc_url),
            client,
            options,
            metrics: Arc::new(RpcMetrics::default()),
        })
    }

    pub fn from_config(config: &FeedConfig) -> Result<Self> {
        let options = RpcClientOptions {
            request_timeout: config.rpc_timeout(),
            governor_address: config.governor_address(),
            ens_registry_address: config.ens_registry_address(),
            ..RpcClientOptions::default()
        };
        Self::with_options(config.rpc_url().to_owned(), config.rpc_credentials(), options)
    }

    pub fn endpoint(&self) -> &str {
        &self.rpc_url
    }

    pub fn metrics(&self) -> RpcMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Reads `proposalCount()` from the governor contract.
    pub async fn proposal_count(&self) -> Result<u64> {
        let data = abi::encode_call(PROPOSAL_COUNT_SIGNATURE, &[]);
        let raw = self
            .eth_call(self.options.governor_address, data, PROPOSAL_COUNT_SIGNATURE)
            .await?;
        let count = abi::decode_u64(&raw).map_err(|err| {
            tracing::debug!(error = %err, "proposalCount result did not decode");
            RpcError::MalformedResult {
                call: PROPOSAL_COUNT_SIGNATURE,
            }
        })?;
        tracing::debug!(count, "read proposal count");
        Ok(count)
    }

    /// Reverse-resolves `address` through the ENS registry. The name is only
    /// returned when it resolves forward to the same address. `Ok(None)` means
    /// no resolver, an empty name, or a name claimed by another address.
    pub async fn lookup_name(&self, address: &str) -> Result<Option<String>> {
        let parsed = Address::from_str(address.trim()).map_err(|_| RpcError::InvalidAddress {
            raw: address.to_owned(),
        })?;
        let node = abi::reverse_node(&parsed);

        let Some(resolver) = self.resolver_for(node).await? else {
            tracing::trace!(address, "no reverse resolver registered");
            return Ok(None);
        };

        let raw_name = self
            .eth_call(
                resolver,
                abi::encode_call(NAME_SIGNATURE, &[node]),
                NAME_SIGNATURE,
            )
            .await?;
        let name = abi::decode_string(&raw_name).map_err(|_| RpcError::MalformedResult {
            call: NAME_SIGNATURE,
        })?;
        if name.trim().is_empty() {
            return Ok(None);
        }

        let forward_node = abi::namehash(&name);
        let Some(forward_resolver) = self.resolver_for(forward_node).await? else {
            tracing::debug!(address, name = %name, "reverse name has no forward resolver");
            return Ok(None);
        };
        let raw_addr = self
            .eth_call(
                forward_resolver,
                abi::encode_call(ADDR_SIGNATURE, &[forward_node]),
                ADDR_SIGNATURE,
            )
            .await?;
        if !resolves_to(&raw_addr, &parsed)? {
            tracing::debug!(address, name = %name, "reverse name resolves to a different address");
            return Ok(None);
        }

        Ok(Some(name))
    }

    /// Registry resolver for `node`, `None` when unset.
    async fn resolver_for(&self, node: B256) -> Result<Option<Address>> {
        let raw = self
            .eth_call(
                self.options.ens_registry_address,
                abi::encode_call(RESOLVER_SIGNATURE, &[node]),
                RESOLVER_SIGNATURE,
            )
            .await?;
        let resolver = abi::decode_address(&raw).map_err(|_| RpcError::MalformedResult {
            call: RESOLVER_SIGNATURE,
        })?;
        Ok(Some(resolver).filter(|resolver| !resolver.is_zero()))
    }

    async fn eth_call(&self, to: Address, data: String, call: &'static str) -> Result<String> {
        let start = Instant::now();
        let request = json!({ "to": to.to_string(), "data": data });
        let result = timeout(
            self.options.request_timeout,
            self.client
                .request::<String, _>(ETH_CALL, rpc_params![request, "latest"]),
        )
        .await;

        match result {
            Err(_) => {
                self.metrics.record_timeout(start.elapsed());
                Err(RpcError::Timeout { method: ETH_CALL }.into())
            }
            Ok(Err(err)) => {
                self.metrics.record_failure(start.elapsed());
                Err(map_rpc_error(call, err))
            }
            Ok(Ok(value)) => {
                self.metrics.record_success(start.elapsed());
                Ok(value)
            }
        }
    }
}

impl ProposalCountSource for ChainRpcClient {
    fn proposal_count(&self) -> BoxFuture<'_, Result<u64>> {
        Box::pin(ChainRpcClient::proposal_count(self))
    }
}

impl NameSource for ChainRpcClient {
    fn lookup_name<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<Option<String>>> {
        Box::pin(ChainRpcClient::lookup_name(self, address))
    }
}

fn resolves_to(raw_addr: &str, expected: &Address) -> Result<bool> {
    let forward = abi::decode_address(raw_addr).map_err(|_| RpcError::MalformedResult {
        call: ADDR_SIGNATURE,
    })?;
    Ok(forward == *expected)
}

fn map_rpc_error(call: &'static str, err: JsonRpcError) -> anyhow::Error {
    match err {
        JsonRpcError::RequestTimeout => RpcError::Timeout { method: ETH_CALL }.into(),
        other => anyhow!("rpc {call} call failed: {other}"),
    }
}
