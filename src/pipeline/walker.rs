//! Backward walk over sequential identifiers.
//!
//! The record source only supports point lookups, so the walker starts at the
//! high-water mark and steps down one identifier at a time. Each identifier
//! is tried once; gaps and failures cost one unit of the attempt budget and
//! are otherwise ignored. Requests are strictly sequential and paced.

use crate::pipeline::outcome::Outcome;
use crate::pipeline::record::ProposalRecord;
use crate::pipeline::sources::RecordLookup;
use crate::runtime::telemetry::Telemetry;
use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_WALK_SLACK: usize = 20;
pub const DEFAULT_WALK_PACING: Duration = Duration::from_millis(200);

/// Records in discovery order (descending identifier). Cheap to clone and
/// never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProposalBatch(Arc<[ProposalRecord]>);

impl ProposalBatch {
    pub fn new(records: Vec<ProposalRecord>) -> Self {
        Self(records.into())
    }

    pub fn records(&self) -> &[ProposalRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ids(&self) -> Vec<u64> {
        self.0.iter().map(ProposalRecord::id).collect()
    }
}

impl Default for ProposalBatch {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl From<Vec<ProposalRecord>> for ProposalBatch {
    fn from(records: Vec<ProposalRecord>) -> Self {
        Self::new(records)
    }
}

impl Serialize for ProposalBatch {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

/// What a walk produced and what it cost.
#[derive(Debug, Clone)]
pub struct WalkReport {
    pub batch: ProposalBatch,
    pub start_id: u64,
    pub budget: usize,
    pub attempts: usize,
    pub skipped: usize,
}

#[derive(Clone)]
pub struct BatchWalker {
    lookup: Arc<dyn RecordLookup>,
    slack: usize,
    pacing: Duration,
    telemetry: Arc<Telemetry>,
    cancellation: CancellationToken,
}

impl BatchWalker {
    pub fn new(lookup: Arc<dyn RecordLookup>, telemetry: Arc<Telemetry>) -> Self {
        Self {
            lookup,
            slack: DEFAULT_WALK_SLACK,
            pacing: DEFAULT_WALK_PACING,
            telemetry,
            cancellation: CancellationToken::new(),
        }
    }

    pub fn with_slack(mut self, slack: usize) -> Self {
        self.slack = slack;
        self
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Walks down from `start_id` until `target_count` records are collected,
    /// `target_count + slack` identifiers have been tried, or identifier 0
    /// would be next.
    pub async fn collect(&self, start_id: u64, target_count: usize) -> WalkReport {
        let budget = target_count.saturating_add(self.slack);
        let mut remaining = budget;
        let mut cursor = start_id;
        let mut records = Vec::with_capacity(target_count);
        let mut skipped = 0;

        tracing::info!(start_id, target_count, budget, "starting backward walk");

        while records.len() < target_count && remaining > 0 && cursor > 0 {
            if self.cancellation.is_cancelled() {
                tracing::info!(cursor, "walk cancelled");
                break;
            }

            match self.lookup.lookup(cursor).await {
                Outcome::Value(record) => {
                    tracing::debug!(proposal_id = cursor, title = record.title(), "fetched proposal");
                    records.push(record);
                }
                Outcome::Skipped(reason) => {
                    tracing::debug!(proposal_id = cursor, reason = %reason, "skipped proposal");
                    self.telemetry.record_gap();
                    skipped += 1;
                }
                Outcome::Fatal(err) => {
                    tracing::warn!(proposal_id = cursor, error = %err, "record lookup failed; treating as gap");
                    self.telemetry.record_gap();
                    skipped += 1;
                }
            }

            cursor -= 1;
            remaining -= 1;

            let continuing = records.len() < target_count && remaining > 0 && cursor > 0;
            if continuing && !self.pause().await {
                break;
            }
        }

        records.truncate(target_count);
        let attempts = budget - remaining;
        self.telemetry.record_records_fetched(records.len());
        tracing::info!(
            collected = records.len(),
            target_count,
            attempts,
            skipped,
            "backward walk finished"
        );

        WalkReport {
            batch: ProposalBatch::new(records),
            start_id,
            budget,
            attempts,
            skipped,
        }
    }

    /// Returns `false` if the walk was cancelled during the pause.
    async fn pause(&self) -> bool {
        if self.pacing.is_zero() {
            return !self.cancellation.is_cancelled();
        }
        tokio::select! {
            _ = self.cancellation.cancelled() => false,
            _ = sleep(self.pacing) => true,
        }
    }
}
