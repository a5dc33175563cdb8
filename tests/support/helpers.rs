use std::time::Duration;

use anyhow::{bail, Result};
use once_cell::sync::Lazy;
use proposal_feed::{DisplayConfig, FeedConfig, Frame};
use tokio::sync::watch;
use tokio::time::{timeout, Instant};
use tracing_subscriber::EnvFilter;

static TRACING_SUBSCRIBER: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn init_tracing() {
    Lazy::force(&TRACING_SUBSCRIBER);
}

/// Config pointing both surfaces at the mock server, with delays shrunk so
/// retries and pacing stay in the millisecond range.
pub fn fast_config(base_url: &str, display: DisplayConfig) -> FeedConfig {
    FeedConfig::builder()
        .rpc_url(base_url)
        .api_base_url(base_url)
        .request_timeout(Duration::from_millis(300))
        .rpc_timeout(Duration::from_secs(2))
        .retry_initial_delay(Duration::from_millis(10))
        .walk_pacing(Duration::from_millis(5))
        .display(display)
        .build()
        .expect("test config must validate")
}

/// Waits until a published frame satisfies `predicate` and returns it.
pub async fn wait_for_frame<F>(
    frames: &mut watch::Receiver<Frame>,
    limit: Duration,
    mut predicate: F,
) -> Result<Frame>
where
    F: FnMut(&Frame) -> bool,
{
    let deadline = Instant::now() + limit;
    loop {
        {
            let current = frames.borrow_and_update();
            if predicate(&current) {
                return Ok(current.clone());
            }
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        match timeout(remaining, frames.changed()).await {
            Ok(Ok(())) => continue,
            Ok(Err(_)) => bail!("frame channel closed"),
            Err(_) => bail!("timed out waiting for frame; last frame {:?}", *frames.borrow()),
        }
    }
}

pub fn page_ids(frame: &Frame) -> Vec<u64> {
    match frame {
        Frame::Page(view) => view.entries.iter().map(|entry| entry.id).collect(),
        _ => Vec::new(),
    }
}
