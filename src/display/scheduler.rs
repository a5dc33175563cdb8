//! Pagination state machine.
//!
//! States: `Loading` (a fetch is outstanding), `Error` (the last cycle failed)
//! and `Displaying` (a batch is on screen). Only `Displaying` with more than
//! one page owns a cycling timer; every transition out of it, or into a new
//! `Displaying`, drops the previous timer. Ticks and responses carry a
//! generation / sequence so late arrivals from an abandoned timer or fetch
//! are recognised and ignored.

use crate::display::frame::{Frame, PageView};
use crate::display::paging::PaginationState;
use crate::pipeline::walker::ProposalBatch;
use crate::runtime::config::DisplayConfig;
use crate::rpc::retry::duration_to_millis;
use crate::runtime::protocol::{FetchRequest, FetchResponse};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

#[derive(Debug, Clone, PartialEq)]
pub enum ViewState {
    Loading,
    Error(String),
    Displaying {
        batch: ProposalBatch,
        pagination: PaginationState,
    },
}

/// Page-advance signal from the cycling timer of one `Displaying` episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleTick {
    pub generation: u64,
}

/// A request to hand to the fetch worker, stamped so its response can be
/// matched back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub sequence: u64,
    pub request: FetchRequest,
}

/// Periodic tick source, cancelled when dropped.
struct CycleTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

impl CycleTimer {
    fn start(generation: u64, period: Duration, ticks: mpsc::Sender<CycleTick>) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if ticks.send(CycleTick { generation }).await.is_err() {
                    break;
                }
            }
        });
        Self { generation, handle }
    }
}

impl Drop for CycleTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub struct PaginationScheduler {
    config: DisplayConfig,
    state: ViewState,
    frames: watch::Sender<Frame>,
    ticks: mpsc::Sender<CycleTick>,
    cycle: Option<CycleTimer>,
    next_generation: u64,
    next_sequence: u64,
    awaiting: Option<u64>,
}

impl PaginationScheduler {
    /// `ticks` is where the cycling timer delivers [`CycleTick`]s; the owner
    /// feeds them back through [`PaginationScheduler::on_tick`].
    pub fn new(config: DisplayConfig, ticks: mpsc::Sender<CycleTick>) -> Self {
        let (frames, _) = watch::channel(Frame::Loading);
        Self {
            config,
            state: ViewState::Loading,
            frames,
            ticks,
            cycle: None,
            next_generation: 0,
            next_sequence: 0,
            awaiting: None,
        }
    }

    pub fn config(&self) -> &DisplayConfig {
        &self.config
    }

    pub fn state(&self) -> &ViewState {
        &self.state
    }

    pub fn subscribe(&self) -> watch::Receiver<Frame> {
        self.frames.subscribe()
    }

    pub fn cycling_active(&self) -> bool {
        self.cycle.is_some()
    }

    /// Enters `Loading` and returns the request to send. Any earlier
    /// outstanding request is superseded.
    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.next_sequence += 1;
        let sequence = self.next_sequence;
        self.awaiting = Some(sequence);
        self.stop_cycling();
        self.state = ViewState::Loading;
        self.publish();

        FetchTicket {
            sequence,
            request: FetchRequest::new(self.config.max_proposals),
        }
    }

    /// Applies the response for `sequence`. Returns `false` when it was
    /// dropped as stale or unsolicited.
    pub fn apply_response(&mut self, sequence: u64, response: FetchResponse) -> bool {
        if self.awaiting != Some(sequence) {
            tracing::debug!(sequence, awaiting = ?self.awaiting, "dropping stale fetch response");
            return false;
        }
        self.awaiting = None;
        self.stop_cycling();

        match response {
            FetchResponse::Error(message) => {
                tracing::warn!(error = %message, "fetch cycle reported an error");
                self.state = ViewState::Error(message);
            }
            FetchResponse::Data(batch) => {
                let pagination = PaginationState::reset(
                    batch.len(),
                    self.config.proposals_per_page,
                    self.config.min_proposals_per_page,
                );
                if pagination.layout.page_size != self.config.proposals_per_page {
                    tracing::info!(
                        total = batch.len(),
                        configured = self.config.proposals_per_page,
                        page_size = pagination.layout.page_size,
                        "adjusted page size for small batch"
                    );
                }
                if pagination.cycling() {
                    self.start_cycling(pagination.page_count());
                }
                self.state = ViewState::Displaying { batch, pagination };
            }
        }

        self.publish();
        true
    }

    /// Advances one page if `tick` belongs to the active timer.
    pub fn on_tick(&mut self, tick: CycleTick) -> bool {
        let active = self.cycle.as_ref().map(|cycle| cycle.generation);
        if active != Some(tick.generation) {
            tracing::trace!(generation = tick.generation, "ignoring stale cycle tick");
            return false;
        }

        let ViewState::Displaying { pagination, .. } = &mut self.state else {
            return false;
        };
        *pagination = pagination.advanced();
        tracing::debug!(page = pagination.current_page, "advanced page");
        self.publish();
        true
    }

    /// The frame for the current state.
    pub fn frame(&self) -> Frame {
        match &self.state {
            ViewState::Loading => Frame::Loading,
            ViewState::Error(message) => Frame::Error {
                message: message.clone(),
            },
            ViewState::Displaying { batch, pagination } => {
                Frame::Page(PageView::new(batch, pagination, &self.config))
            }
        }
    }

    fn publish(&self) {
        self.frames.send_replace(self.frame());
    }

    fn start_cycling(&mut self, page_count: usize) {
        self.next_generation += 1;
        tracing::info!(
            page_count,
            interval_ms = duration_to_millis(self.config.cycle_interval),
            "starting page cycling"
        );
        self.cycle = Some(CycleTimer::start(
            self.next_generation,
            self.config.cycle_interval,
            self.ticks.clone(),
        ));
    }

    fn stop_cycling(&mut self) {
        if self.cycle.take().is_some() {
            tracing::info!("stopped page cycling");
        }
    }
}
