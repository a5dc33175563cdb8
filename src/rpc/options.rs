//! Knobs for the chain JSON-RPC client along with validation so callers can
//! reason about timeouts, concurrency and contract addresses.

use alloy_primitives::Address;
use anyhow::{bail, Result};
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_GOVERNOR_ADDRESS: &str = "0x6f3e6272a167e8accb32072d08e0957f9c79223d";
pub const DEFAULT_ENS_REGISTRY_ADDRESS: &str = "0x00000000000C2E074eC69A0dFb2997BA6C7d2e1e";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 8;

#[derive(Debug, Clone)]
pub struct RpcClientOptions {
    pub request_timeout: Duration,
    pub max_concurrent_requests: usize,
    pub governor_address: Address,
    pub ens_registry_address: Address,
}

impl Default for RpcClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
            governor_address: parse_builtin(DEFAULT_GOVERNOR_ADDRESS),
            ens_registry_address: parse_builtin(DEFAULT_ENS_REGISTRY_ADDRESS),
        }
    }
}

impl RpcClientOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.request_timeout.is_zero() {
            bail!("request_timeout must be greater than 0");
        }
        if self.max_concurrent_requests == 0 {
            bail!("max_concurrent_requests must be greater than 0");
        }
        if self.governor_address.is_zero() {
            bail!("governor_address cannot be the zero address");
        }
        if self.ens_registry_address.is_zero() {
            bail!("ens_registry_address cannot be the zero address");
        }
        Ok(())
    }
}

fn parse_builtin(address: &str) -> Address {
    Address::from_str(address).unwrap_or(Address::ZERO)
}
