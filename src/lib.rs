pub mod api;
pub mod display;
pub mod pipeline;
pub mod rpc;
pub mod runtime;

pub use api::{ApiError, ProposalApiClient};
pub use display::{Frame, PageLayout, PageView, PaginationScheduler, PaginationState, ProposalEntry, ViewState};
pub use pipeline::{
    BatchWalker, FeedSources, HighWaterMarkResolver, Outcome, ProposalBatch, ProposalFeed,
    ProposalRecord, VoteTally,
};
pub use rpc::{ChainRpcClient, RetryPolicy, RpcError};
pub use runtime::config::{DisplayConfig, FeedConfig, FeedConfigBuilder, FeedConfigParams};
pub use runtime::protocol::{FetchRequest, FetchResponse};
pub use runtime::runner::FeedRunner;
pub use runtime::telemetry::{init_tracing, init_tracing_with_default, Telemetry, TelemetrySnapshot};
