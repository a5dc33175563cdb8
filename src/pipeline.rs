//! Retrieval pipeline: resolve the high-water mark, walk identifiers
//! backwards, fetch and enrich each record, and package the batch.

pub mod attribution;
pub mod feed;
pub mod high_water;
pub mod outcome;
pub mod record;
pub mod sources;
pub mod walker;

pub use attribution::{truncate_address, AttributionResolver};
pub use feed::{FeedSources, ProposalFeed};
pub use high_water::HighWaterMarkResolver;
pub use outcome::Outcome;
pub use record::{ProposalRecord, RecordFetcher, VoteShares, VoteTally};
pub use sources::{NameSource, ProposalCountSource, ProposalSource, RecordLookup};
pub use walker::{BatchWalker, ProposalBatch, WalkReport};
