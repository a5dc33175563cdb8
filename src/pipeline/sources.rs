//! Seams between the pipeline and the outside world. Production code plugs
//! in [`crate::rpc::ChainRpcClient`] and [`crate::api::ProposalApiClient`];
//! tests plug in scripted fakes.

use crate::api::payload::RawProposal;
use crate::pipeline::outcome::Outcome;
use crate::pipeline::record::ProposalRecord;
use anyhow::Result;
use futures::future::BoxFuture;

/// Read-only source of the current record count.
pub trait ProposalCountSource: Send + Sync {
    fn proposal_count(&self) -> BoxFuture<'_, Result<u64>>;
}

/// Read-only point lookup of one raw record.
pub trait ProposalSource: Send + Sync {
    fn fetch_proposal(&self, id: u64) -> BoxFuture<'_, Result<RawProposal>>;
}

/// Maps an address-like string to an optional display name.
pub trait NameSource: Send + Sync {
    fn lookup_name<'a>(&'a self, address: &'a str) -> BoxFuture<'a, Result<Option<String>>>;
}

/// Produces a finished record for one identifier, or a skip.
pub trait RecordLookup: Send + Sync {
    fn lookup(&self, id: u64) -> BoxFuture<'_, Outcome<ProposalRecord>>;
}
