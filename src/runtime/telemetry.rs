use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Default interval used by the metrics reporter task.
pub const DEFAULT_METRICS_INTERVAL: Duration = Duration::from_secs(60);

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Installs a basic tracing subscriber (if one is not already active).
///
/// The subscriber honours `RUST_LOG` if it is present, otherwise it falls back to `info`.
/// Calling this function multiple times is harmless.
pub fn init_tracing() {
    init_tracing_with_default("info");
}

/// Like [`init_tracing`], with `default_directive` used when `RUST_LOG` is
/// unset or unparsable.
pub fn init_tracing_with_default(default_directive: &str) {
    if TRACING_INIT.get().is_some() {
        return;
    }

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter_or(default_directive))
        .with_target(true)
        .try_init();

    let _ = TRACING_INIT.set(());
}

fn env_filter_or(default_directive: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive))
}

/// Running totals for the feed, shared by every stage of a fetch cycle.
#[derive(Default, Debug)]
pub struct Telemetry {
    fetch_cycles: AtomicU64,
    failed_cycles: AtomicU64,
    records_fetched: AtomicU64,
    gaps_skipped: AtomicU64,
    attribution_fallbacks: AtomicU64,
}

impl Telemetry {
    pub fn record_fetch_cycle(&self) {
        self.fetch_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_failed_cycle(&self) {
        self.failed_cycles.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_records_fetched(&self, count: usize) {
        if count == 0 {
            return;
        }
        self.records_fetched.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn record_gap(&self) {
        self.gaps_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_attribution_fallback(&self) {
        self.attribution_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        TelemetrySnapshot {
            fetch_cycles: self.fetch_cycles.load(Ordering::Relaxed),
            failed_cycles: self.failed_cycles.load(Ordering::Relaxed),
            records_fetched: self.records_fetched.load(Ordering::Relaxed),
            gaps_skipped: self.gaps_skipped.load(Ordering::Relaxed),
            attribution_fallbacks: self.attribution_fallbacks.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    pub fetch_cycles: u64,
    pub failed_cycles: u64,
    pub records_fetched: u64,
    pub gaps_skipped: u64,
    pub attribution_fallbacks: u64,
}

/// Spawns a background task that periodically logs cycle counts, per-interval
/// record throughput and lookup fallbacks.
pub fn spawn_metrics_reporter(
    telemetry: Arc<Telemetry>,
    shutdown: CancellationToken,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last_snapshot = telemetry.snapshot();

        loop {
            select! {
                _ = shutdown.cancelled() => {
                    tracing::info!(target: "proposal_feed::metrics", "metrics reporter shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let current = telemetry.snapshot();
                    let fetched_delta = current
                        .records_fetched
                        .saturating_sub(last_snapshot.records_fetched);

                    tracing::info!(
                        target: "proposal_feed::metrics",
                        fetch_cycles = current.fetch_cycles,
                        failed_cycles = current.failed_cycles,
                        records_fetched = current.records_fetched,
                        fetched_since_last = fetched_delta,
                        gaps_skipped = current.gaps_skipped,
                        attribution_fallbacks = current.attribution_fallbacks,
                        "feed metrics snapshot"
                    );

                    last_snapshot = current;
                }
            }
        }
    })
}
