//! The polling engine.
//!
//! A single-task loop over the board: acquire a snapshot, select a
//! candidate, act or wait, refresh, back off. Per-attempt failures are
//! contained and logged; the loop terminates on the first successful
//! booking action, on budget exhaustion, or on abort (cancellation or
//! an invalid session).

use std::time::Duration;

use chrono::{Local, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::notify::{Notify, ReportScheduler};
use crate::page::{BookingDesk, PageError, TicketBoard};
use crate::selector::{Selection, select};

use super::params::WatchPlan;
use super::state::{AbortReason, BookedTicket, Outcome, RunState};

/// Tunables of the poll loop itself; the itinerary and strategy live in
/// [`WatchPlan`].
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Bounded wait for the result table on each attempt.
    pub snapshot_timeout: Duration,

    /// Miss summaries are logged on the first attempt and every Nth
    /// after, to surface progress without flooding.
    pub log_every: u32,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            snapshot_timeout: Duration::from_secs(5),
            log_every: 5,
        }
    }
}

/// Result of one attempt, before the loop decides what happens next.
enum AttemptOutcome {
    /// The booking action went through: the run is over.
    Booked(BookedTicket),

    /// Nothing actionable on the board this time.
    Miss,

    /// A recoverable failure; the loop keeps going.
    Failed(String),

    /// An unrecoverable failure; the run ends now.
    Abort(AbortReason),
}

/// Drives one monitoring run to its terminal outcome.
pub struct Watcher<'a, B, D, N> {
    board: &'a B,
    desk: &'a D,
    scheduler: ReportScheduler<N>,
    plan: &'a WatchPlan,
    config: WatcherConfig,
    cancel: CancellationToken,
    state: RunState,
}

impl<'a, B, D, N> Watcher<'a, B, D, N>
where
    B: TicketBoard,
    D: BookingDesk,
    N: Notify,
{
    /// Create a watcher for one run.
    ///
    /// The caller keeps ownership of the session behind `board`/`desk`
    /// and is responsible for closing it once the run returns.
    pub fn new(
        board: &'a B,
        desk: &'a D,
        scheduler: ReportScheduler<N>,
        plan: &'a WatchPlan,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            board,
            desk,
            scheduler,
            plan,
            config: WatcherConfig::default(),
            cancel,
            state: RunState::begin(Utc::now()),
        }
    }

    /// Override the loop tunables.
    pub fn with_config(mut self, config: WatcherConfig) -> Self {
        self.config = config;
        self
    }

    /// Run to a terminal outcome.
    pub async fn run(mut self) -> Outcome {
        info!(
            from = %self.plan.from,
            to = %self.plan.to,
            date = %self.plan.travel_date,
            strategy = %self.plan.strategy,
            max_attempts = self.plan.max_attempts,
            "watch starting"
        );
        self.scheduler.run_started(self.plan, Utc::now()).await;

        let outcome = if self.wait_for_booking_open().await {
            self.poll_loop().await
        } else {
            Outcome::Aborted(AbortReason::Cancelled)
        };

        self.scheduler
            .finished(self.plan, &outcome, &self.state, Utc::now())
            .await;
        info!(%outcome, attempts = self.state.attempts, "watch finished");
        outcome
    }

    /// Suspend until the configured booking-open instant, if it is
    /// still ahead. Returns false when cancelled while waiting.
    async fn wait_for_booking_open(&self) -> bool {
        let Some(open_at) = self.plan.booking_open else {
            return true;
        };
        let Ok(wait) = (open_at - Local::now()).to_std() else {
            // Already open.
            return true;
        };

        info!(
            open_at = %open_at.format("%Y-%m-%d %H:%M:%S"),
            wait_secs = wait.as_secs(),
            "suspending until booking opens"
        );
        tokio::select! {
            _ = self.cancel.cancelled() => false,
            _ = tokio::time::sleep(wait) => {
                info!("booking open, starting to poll");
                true
            }
        }
    }

    async fn poll_loop(&mut self) -> Outcome {
        loop {
            // Cancellation is checked before any new work is requested.
            if self.cancel.is_cancelled() {
                return Outcome::Aborted(AbortReason::Cancelled);
            }

            self.state.attempts += 1;
            let attempt = self.state.attempts;

            match self.attempt_once(attempt).await {
                AttemptOutcome::Booked(ticket) => return Outcome::Booked(ticket),
                AttemptOutcome::Abort(reason) => return Outcome::Aborted(reason),
                AttemptOutcome::Miss => {}
                AttemptOutcome::Failed(message) => {
                    self.scheduler
                        .anomaly(self.plan, attempt, &message, Utc::now())
                        .await;
                }
            }

            self.scheduler
                .maybe_progress(self.plan, &self.state, Utc::now())
                .await;

            if self.plan.max_attempts > 0 && attempt >= self.plan.max_attempts {
                info!(attempts = attempt, "attempt budget exhausted");
                return Outcome::Exhausted { attempts: attempt };
            }

            self.refresh_board(attempt).await;
            self.backoff().await;
        }
    }

    /// One query-evaluate-act pass.
    async fn attempt_once(&self, attempt: u32) -> AttemptOutcome {
        if let Err(err) = self.board.wait_for_results(self.config.snapshot_timeout).await {
            return self.page_failure(attempt, "awaiting results", err);
        }

        let rows = match self.board.snapshot().await {
            Ok(rows) => rows,
            Err(err) => return self.page_failure(attempt, "reading snapshot", err),
        };

        match select(&self.plan.strategy, &rows) {
            Selection::Hit(row) => {
                info!(
                    attempt,
                    code = row.code.as_ref().map(|c| c.as_str()).unwrap_or("?"),
                    departs = %row.departs.map(|t| t.to_string()).unwrap_or_default(),
                    "candidate found, submitting order"
                );
                match self.desk.submit(row).await {
                    Ok(()) => {
                        info!(attempt, "booking action submitted");
                        AttemptOutcome::Booked(BookedTicket {
                            code: row.code.clone(),
                            departs: row.departs,
                            attempt,
                        })
                    }
                    Err(err) => {
                        // A failed submission does not mean the row is
                        // gone; keep monitoring.
                        warn!(attempt, error = %err, "booking submission failed");
                        AttemptOutcome::Failed(format!("booking submission: {err}"))
                    }
                }
            }
            Selection::Miss(reason) => {
                if attempt == 1 || attempt % self.config.log_every.max(1) == 0 {
                    info!(attempt, %reason, "no candidate yet");
                }
                AttemptOutcome::Miss
            }
        }
    }

    fn page_failure(&self, attempt: u32, stage: &str, err: PageError) -> AttemptOutcome {
        if !err.is_recoverable() {
            error!(attempt, stage, error = %err, "unrecoverable failure, aborting run");
            return AttemptOutcome::Abort(AbortReason::SessionExpired);
        }
        warn!(attempt, stage, error = %err, "attempt failed");
        AttemptOutcome::Failed(format!("{stage}: {err}"))
    }

    /// Refresh the board for the next attempt, falling back to a full
    /// reload once. Failure of both is recoverable: the next attempt's
    /// bounded wait will report whatever state the board is in.
    async fn refresh_board(&mut self, attempt: u32) {
        match self.board.refresh().await {
            Ok(()) => return,
            Err(err) => {
                warn!(attempt, error = %err, "refresh failed, falling back to full reload");
            }
        }

        if let Err(err) = self.board.reload().await {
            warn!(attempt, error = %err, "reload fallback failed");
            self.scheduler
                .anomaly(
                    self.plan,
                    attempt,
                    &format!("refresh and reload both failed: {err}"),
                    Utc::now(),
                )
                .await;
        }
    }

    /// Randomized wait before the next attempt, cut short by
    /// cancellation (which the loop top then observes).
    async fn backoff(&self) {
        let delay = self.plan.refresh_delay.sample();
        debug!(delay_ms = delay.as_millis() as u64, "waiting before next attempt");
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = tokio::time::sleep(delay) => {}
        }
    }
}
