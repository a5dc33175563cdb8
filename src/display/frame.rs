//! Snapshots of what should be on screen. The scheduler publishes one after
//! every state change.

use crate::display::paging::PaginationState;
use crate::pipeline::record::{ProposalRecord, VoteShares, VoteTally};
use crate::pipeline::walker::ProposalBatch;
use crate::runtime::config::DisplayConfig;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Loading,
    Error { message: String },
    Page(PageView),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageView {
    pub header: String,
    pub entries: Vec<ProposalEntry>,
    pub page_index: usize,
    pub page_count: usize,
    /// How long the presentation layer should take to swap pages.
    pub transition: Duration,
}

impl PageView {
    pub fn new(batch: &ProposalBatch, pagination: &PaginationState, config: &DisplayConfig) -> Self {
        let entries = batch
            .records()
            .get(pagination.page_range())
            .unwrap_or_default()
            .iter()
            .map(|record| ProposalEntry::from_record(record, config.show_proposer))
            .collect();

        Self {
            header: config.header.clone(),
            entries,
            page_index: pagination.current_page,
            page_count: pagination.page_count(),
            transition: config.animation_speed,
        }
    }

    /// "Page 2/3", only when there is something to cycle through.
    pub fn page_indicator(&self) -> Option<String> {
        (self.page_count > 1).then(|| format!("Page {}/{}", self.page_index + 1, self.page_count))
    }
}

/// One row of a page.
#[derive(Debug, Clone, PartialEq)]
pub struct ProposalEntry {
    pub id: u64,
    pub title: String,
    pub status_label: String,
    pub proposer: Option<String>,
    pub tally: VoteTally,
    pub shares: VoteShares,
    pub quorum_votes: u64,
    pub quorum_marker: Option<f64>,
}

impl ProposalEntry {
    pub fn from_record(record: &ProposalRecord, show_proposer: bool) -> Self {
        let proposer = Some(record.proposer_display())
            .filter(|display| show_proposer && !display.is_empty())
            .map(str::to_owned);

        Self {
            id: record.id(),
            title: record.title().to_owned(),
            status_label: record.status_label().to_owned(),
            proposer,
            tally: record.tally(),
            shares: record.tally().shares(),
            quorum_votes: record.quorum_votes(),
            quorum_marker: record.quorum_marker(),
        }
    }

    pub fn heading(&self) -> String {
        match &self.proposer {
            Some(proposer) => format!("Prop {} | {}", self.id, proposer),
            None => format!("Prop {}", self.id),
        }
    }

    pub fn vote_summary(&self) -> String {
        format!(
            "For {} · Abstain {} · Against {}",
            self.tally.for_votes, self.tally.abstain_votes, self.tally.against_votes
        )
    }
}
