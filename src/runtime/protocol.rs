//! Messages exchanged between the presentation side and the fetch worker.
//! One request yields exactly one response; failures travel as data.

use crate::pipeline::walker::ProposalBatch;
use serde::{Deserialize, Serialize};

/// Count used when a request omits `max_proposals` or asks for zero.
pub const DEFAULT_MAX_PROPOSALS: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FetchRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_proposals: Option<usize>,
}

impl FetchRequest {
    pub fn new(max_proposals: usize) -> Self {
        Self {
            max_proposals: Some(max_proposals),
        }
    }

    /// Number of records the walk should collect.
    pub fn target_count(&self) -> usize {
        match self.max_proposals {
            Some(count) if count > 0 => count,
            _ => DEFAULT_MAX_PROPOSALS,
        }
    }
}

/// Serialized as `{"data": [...]}` or `{"error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchResponse {
    Data(ProposalBatch),
    Error(String),
}

impl FetchResponse {
    pub fn is_error(&self) -> bool {
        matches!(self, FetchResponse::Error(_))
    }
}
