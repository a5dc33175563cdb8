//! REST record source: the per-identifier proposal endpoint and the payload
//! shape it returns.

pub mod client;
pub mod payload;

pub use client::{ApiError, ProposalApiClient};
pub use payload::{RawProposal, RawVote, VoteSupport};
