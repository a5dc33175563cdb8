//! Lenient serde model of a proposal payload. Only the consumed fields are
//! modelled; anything else in the response is ignored.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProposal {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub proposer: Option<String>,
    #[serde(default)]
    pub quorum_votes: Option<Value>,
    #[serde(default)]
    pub status: Option<RawStatus>,
    #[serde(default)]
    pub votes: Option<Vec<Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawStatus {
    #[serde(default)]
    pub current_status: Option<String>,
}

/// Support category of a single vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteSupport {
    For,
    Against,
    Abstain,
}

impl VoteSupport {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "FOR" => Some(Self::For),
            "AGAINST" => Some(Self::Against),
            "ABSTAIN" => Some(Self::Abstain),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawVote {
    pub support: VoteSupport,
    pub weight: u64,
}

impl RawVote {
    /// Returns `None` for entries with an unrecognised category or a weight
    /// that is missing, negative or fractional.
    pub fn from_value(value: &Value) -> Option<Self> {
        let support = value
            .get("support")
            .and_then(Value::as_str)
            .and_then(VoteSupport::parse)?;
        let weight = value.get("votes").and_then(lenient_u64)?;
        Some(Self { support, weight })
    }
}

impl RawProposal {
    pub fn title(&self) -> Option<&str> {
        non_blank(self.title.as_deref())
    }

    pub fn proposer(&self) -> Option<&str> {
        non_blank(self.proposer.as_deref())
    }

    pub fn quorum_votes(&self) -> Option<u64> {
        self.quorum_votes.as_ref().and_then(lenient_u64)
    }

    pub fn status_label(&self) -> Option<&str> {
        non_blank(
            self.status
                .as_ref()
                .and_then(|status| status.current_status.as_deref()),
        )
    }

    /// Parseable votes; malformed entries are dropped.
    pub fn votes(&self) -> impl Iterator<Item = RawVote> + '_ {
        self.votes
            .iter()
            .flatten()
            .filter_map(RawVote::from_value)
    }
}

/// Accepts non-negative integers given as JSON numbers (including `12.0`) or
/// numeric strings.
fn lenient_u64(value: &Value) -> Option<u64> {
    match value {
        Value::Number(number) => number.as_u64().or_else(|| {
            number
                .as_f64()
                .filter(|float| *float >= 0.0 && float.fract() == 0.0 && *float <= u64::MAX as f64)
                .map(|float| float as u64)
        }),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|text| !text.trim().is_empty())
}
