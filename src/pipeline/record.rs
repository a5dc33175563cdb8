//! Fetches a single proposal, aggregates its votes and enriches it with a
//! proposer display name.

use crate::api::payload::{RawProposal, RawVote, VoteSupport};
use crate::pipeline::attribution::AttributionResolver;
use crate::pipeline::outcome::Outcome;
use crate::pipeline::sources::{ProposalSource, RecordLookup};
use crate::rpc::retry::duration_to_millis;
use futures::future::BoxFuture;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_millis(5_000);
pub const UNKNOWN_STATUS: &str = "UNKNOWN";
pub const ANONYMOUS_PROPOSER: &str = "Anonymous";

/// Per-category vote sums.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteTally {
    pub for_votes: u64,
    pub against_votes: u64,
    pub abstain_votes: u64,
}

impl VoteTally {
    pub fn from_votes(votes: impl IntoIterator<Item = RawVote>) -> Self {
        votes.into_iter().fold(Self::default(), |mut tally, vote| {
            let slot = match vote.support {
                VoteSupport::For => &mut tally.for_votes,
                VoteSupport::Against => &mut tally.against_votes,
                VoteSupport::Abstain => &mut tally.abstain_votes,
            };
            *slot = slot.saturating_add(vote.weight);
            tally
        })
    }

    pub fn total(&self) -> u64 {
        self.for_votes
            .saturating_add(self.against_votes)
            .saturating_add(self.abstain_votes)
    }

    /// Percent of the total per category; all zero when nobody voted.
    pub fn shares(&self) -> VoteShares {
        let total = self.total();
        if total == 0 {
            return VoteShares::default();
        }
        let percent = |votes: u64| votes as f64 / total as f64 * 100.0;
        VoteShares {
            for_percent: percent(self.for_votes),
            against_percent: percent(self.against_votes),
            abstain_percent: percent(self.abstain_votes),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoteShares {
    pub for_percent: f64,
    pub against_percent: f64,
    pub abstain_percent: f64,
}

/// A fully populated proposal. Built once by [`RecordFetcher`] and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalRecord {
    #[serde(rename = "proposalId")]
    id: u64,
    title: String,
    proposer_display: String,
    quorum_votes: u64,
    status_label: String,
    #[serde(flatten)]
    tally: VoteTally,
}

impl ProposalRecord {
    pub fn new(
        id: u64,
        title: impl Into<String>,
        proposer_display: impl Into<String>,
        quorum_votes: u64,
        status_label: impl Into<String>,
        tally: VoteTally,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            proposer_display: proposer_display.into(),
            quorum_votes,
            status_label: status_label.into(),
            tally,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn proposer_display(&self) -> &str {
        &self.proposer_display
    }

    pub fn quorum_votes(&self) -> u64 {
        self.quorum_votes
    }

    pub fn status_label(&self) -> &str {
        &self.status_label
    }

    pub fn tally(&self) -> VoteTally {
        self.tally
    }

    /// Position of the quorum marker in percent of the votes cast. `None`
    /// without a quorum or without votes.
    pub fn quorum_marker(&self) -> Option<f64> {
        let total = self.tally.total();
        if self.quorum_votes == 0 || total == 0 {
            return None;
        }
        Some(self.quorum_votes as f64 / total as f64 * 100.0)
    }
}

pub fn placeholder_title(id: u64) -> String {
    format!("Proposal {id}")
}

#[derive(Clone)]
pub struct RecordFetcher {
    source: Arc<dyn ProposalSource>,
    attribution: AttributionResolver,
    request_timeout: Duration,
}

impl RecordFetcher {
    pub fn new(
        source: Arc<dyn ProposalSource>,
        attribution: AttributionResolver,
        request_timeout: Duration,
    ) -> Self {
        Self {
            source,
            attribution,
            request_timeout,
        }
    }

    /// One bounded read for `id`. Network faults, timeouts and malformed
    /// payloads all come back as `Skipped`; this never returns `Fatal`.
    pub async fn fetch(&self, id: u64) -> Outcome<ProposalRecord> {
        let raw = match timeout(self.request_timeout, self.source.fetch_proposal(id)).await {
            Ok(Ok(raw)) => raw,
            Ok(Err(err)) => {
                tracing::warn!(proposal_id = id, error = %err, "failed to fetch proposal");
                return Outcome::Skipped(format!("{err:#}"));
            }
            Err(_) => {
                let timeout_ms = duration_to_millis(self.request_timeout);
                tracing::warn!(proposal_id = id, timeout_ms, "proposal fetch timed out");
                return Outcome::Skipped(format!("proposal {id} timed out after {timeout_ms}ms"));
            }
        };

        Outcome::Value(self.build_record(id, &raw).await)
    }

    async fn build_record(&self, id: u64, raw: &RawProposal) -> ProposalRecord {
        let tally = VoteTally::from_votes(raw.votes());
        let proposer_display = match raw.proposer() {
            Some(proposer) => self.attribution.resolve_display(proposer).await,
            None => ANONYMOUS_PROPOSER.to_owned(),
        };
        let title = raw
            .title()
            .map(str::to_owned)
            .unwrap_or_else(|| placeholder_title(id));

        ProposalRecord::new(
            id,
            title,
            proposer_display,
            raw.quorum_votes().unwrap_or(0),
            raw.status_label().unwrap_or(UNKNOWN_STATUS),
            tally,
        )
    }
}

impl RecordLookup for RecordFetcher {
    fn lookup(&self, id: u64) -> BoxFuture<'_, Outcome<ProposalRecord>> {
        Box::pin(self.fetch(id))
    }
}
