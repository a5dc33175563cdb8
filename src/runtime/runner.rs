use crate::display::frame::Frame;
use crate::display::scheduler::{CycleTick, FetchTicket, PaginationScheduler};
use crate::pipeline::feed::ProposalFeed;
use crate::rpc::retry::duration_to_millis;
use crate::runtime::config::FeedConfig;
use crate::runtime::protocol::FetchResponse;
use crate::runtime::telemetry::{spawn_metrics_reporter, Telemetry};
use anyhow::{anyhow, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Drives the feed: a long-period update timer issues fetch requests to a
/// worker task, responses and cycle ticks are fed into the scheduler, and
/// frames are published to subscribers. Only one fetch cycle is outstanding
/// at a time.
pub struct FeedRunner {
    feed: ProposalFeed,
    scheduler: PaginationScheduler,
    ticks: mpsc::Receiver<CycleTick>,
    update_interval: Duration,
    metrics_interval: Duration,
    telemetry: Arc<Telemetry>,
    shutdown: CancellationToken,
}

impl FeedRunner {
    /// Wires the production chain and REST clients from `config`.
    pub fn new(config: FeedConfig) -> Result<Self> {
        let shutdown = CancellationToken::new();
        let telemetry = Arc::new(Telemetry::default());
        let feed = ProposalFeed::from_config(&config, telemetry.clone(), shutdown.clone())?;
        Ok(Self::with_feed(&config, feed, telemetry, shutdown))
    }

    /// Runs against an already assembled feed. `shutdown` should be the token
    /// the feed was built with so cancellation also interrupts retries and
    /// walks.
    pub fn with_feed(
        config: &FeedConfig,
        feed: ProposalFeed,
        telemetry: Arc<Telemetry>,
        shutdown: CancellationToken,
    ) -> Self {
        let (tick_tx, ticks) = mpsc::channel(4);
        let scheduler = PaginationScheduler::new(config.display().clone(), tick_tx);
        Self {
            feed,
            scheduler,
            ticks,
            update_interval: config.display().update_interval,
            metrics_interval: config.metrics_interval(),
            telemetry,
            shutdown,
        }
    }

    /// Frames published on every state change, starting with `Loading`.
    pub fn subscribe(&self) -> watch::Receiver<Frame> {
        self.scheduler.subscribe()
    }

    /// Returns a clone of the root shutdown token so external callers can integrate
    /// with their own signal handlers or cancellation strategies.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn telemetry(&self) -> Arc<Telemetry> {
        self.telemetry.clone()
    }

    /// Runs until the shutdown token is cancelled.
    pub async fn run(self) -> Result<()> {
        let FeedRunner {
            feed,
            mut scheduler,
            mut ticks,
            update_interval,
            metrics_interval,
            telemetry,
            shutdown,
        } = self;

        let (request_tx, request_rx) = mpsc::channel::<FetchTicket>(1);
        let (response_tx, mut response_rx) = mpsc::channel::<(u64, FetchResponse)>(1);
        let worker = spawn_fetch_worker(feed, request_rx, response_tx, shutdown.clone());
        let reporter = spawn_metrics_reporter(telemetry, shutdown.clone(), metrics_interval);

        let mut updates = time::interval(update_interval);
        updates.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight = false;

        tracing::info!(
            update_interval_ms = duration_to_millis(update_interval),
            "feed runner started"
        );

        let result = loop {
            tokio::select! {
                _ = shutdown.cancelled() => break Ok(()),
                _ = updates.tick() => {
                    if in_flight {
                        tracing::debug!("previous fetch cycle still running; skipping update");
                    } else {
                        let ticket = scheduler.begin_fetch();
                        if request_tx.send(ticket).await.is_err() {
                            break Err(anyhow!("fetch worker stopped unexpectedly"));
                        }
                        in_flight = true;
                    }
                }
                Some((sequence, response)) = response_rx.recv() => {
                    in_flight = false;
                    scheduler.apply_response(sequence, response);
                }
                Some(tick) = ticks.recv() => {
                    scheduler.on_tick(tick);
                }
            }
        };

        shutdown.cancel();
        drop(request_tx);
        drop(scheduler);
        if let Err(err) = worker.await {
            tracing::warn!(error = %err, "fetch worker did not shut down cleanly");
        }
        if let Err(err) = reporter.await {
            tracing::warn!(error = %err, "metrics reporter did not shut down cleanly");
        }
        tracing::info!("feed runner stopped");
        result
    }

    /// Runs until a Ctrl-C (SIGINT) is received or the shutdown token is cancelled elsewhere.
    pub async fn run_until_ctrl_c(self) -> Result<()> {
        let shutdown = self.shutdown.clone();
        let signal_shutdown = shutdown.clone();
        let watcher = tokio::spawn(async move {
            tokio::select! {
                _ = signal::ctrl_c() => {
                    tracing::info!("Ctrl-C received; shutting down feed runner");
                    signal_shutdown.cancel();
                }
                _ = signal_shutdown.cancelled() => {}
            }
        });

        let result = self.run().await;
        shutdown.cancel();
        let _ = watcher.await;
        result
    }
}

fn spawn_fetch_worker(
    feed: ProposalFeed,
    mut requests: mpsc::Receiver<FetchTicket>,
    responses: mpsc::Sender<(u64, FetchResponse)>,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let ticket = tokio::select! {
                _ = shutdown.cancelled() => break,
                ticket = requests.recv() => match ticket {
                    Some(ticket) => ticket,
                    None => break,
                },
            };

            let response = tokio::select! {
                _ = shutdown.cancelled() => break,
                response = feed.handle(&ticket.request) => response,
            };

            if responses.send((ticket.sequence, response)).await.is_err() {
                break;
            }
        }
        tracing::debug!("fetch worker exiting");
    })
}
