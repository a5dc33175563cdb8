//! Human-readable proposer attribution with a fallback chain: resolved name,
//! then a truncated form of the raw identifier.

use crate::pipeline::sources::NameSource;
use crate::rpc::retry::{retry_with_backoff, RetryContext, RetryPolicy, NAME_LOOKUP_RETRY};
use crate::runtime::telemetry::Telemetry;
use std::sync::Arc;

const HEAD_CHARS: usize = 6;
const TAIL_CHARS: usize = 4;

#[derive(Clone)]
pub struct AttributionResolver {
    names: Arc<dyn NameSource>,
    policy: RetryPolicy,
    telemetry: Arc<Telemetry>,
}

impl AttributionResolver {
    pub fn new(names: Arc<dyn NameSource>, policy: RetryPolicy, telemetry: Arc<Telemetry>) -> Self {
        Self {
            names,
            policy,
            telemetry,
        }
    }

    /// Never fails: lookup errors and empty names both fall back to
    /// [`truncate_address`].
    pub async fn resolve_display(&self, raw_id: &str) -> String {
        let context = RetryContext::new(&NAME_LOOKUP_RETRY).with_subject(raw_id);
        let lookup =
            retry_with_backoff(self.policy, context, |_| self.names.lookup_name(raw_id)).await;

        match lookup {
            Ok(Some(name)) if !name.trim().is_empty() => name,
            Ok(_) => {
                tracing::debug!(address = raw_id, "no name registered; using truncated address");
                self.telemetry.record_attribution_fallback();
                truncate_address(raw_id)
            }
            Err(err) => {
                tracing::debug!(address = raw_id, error = %err, "name lookup failed; using truncated address");
                self.telemetry.record_attribution_fallback();
                truncate_address(raw_id)
            }
        }
    }
}

/// First six and last four characters joined by `...`. Identifiers too short
/// to shorten are returned as-is.
pub fn truncate_address(raw: &str) -> String {
    let count = raw.chars().count();
    if count <= HEAD_CHARS + TAIL_CHARS {
        return raw.to_owned();
    }
    let head: String = raw.chars().take(HEAD_CHARS).collect();
    let tail: String = raw.chars().skip(count - TAIL_CHARS).collect();
    format!("{head}...{tail}")
}
