//! Chain JSON-RPC plumbing: the `eth_call` client, ABI helpers, optional
//! basic auth, per-call metrics, and the shared retry executor.

pub mod abi;
pub mod auth;
pub mod client;
pub mod metrics;
pub mod options;
pub mod retry;

pub use client::{ChainRpcClient, RpcError};
pub use metrics::RpcMetricsSnapshot;
pub use options::RpcClientOptions;
pub use retry::{retry_with_backoff, RetryContext, RetryPolicy};
