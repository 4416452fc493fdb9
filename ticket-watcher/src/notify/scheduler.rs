//! Delivery cadence for status reports.
//!
//! Attempts may run every few seconds; reports must not. The scheduler
//! owns the wall-clock cadence (independent of attempt count) and
//! swallows transport failures so they never reach the polling loop.

use chrono::{DateTime, Duration, Local, Utc};
use tracing::warn;

use crate::watch::{Outcome, RunState, WatchPlan};

use super::{Notify, Report, report};

/// Default gap between periodic "still monitoring" reports.
const PROGRESS_INTERVAL_MINS: i64 = 30;

/// Decides when to emit a report and hands it to the transport.
pub struct ReportScheduler<N> {
    notifier: N,
    interval: Duration,
    /// When the last report of any kind went out.
    last_sent: Option<DateTime<Utc>>,
}

impl<N: Notify> ReportScheduler<N> {
    /// Create a scheduler with the default 30-minute progress cadence.
    pub fn new(notifier: N) -> Self {
        Self {
            notifier,
            interval: Duration::minutes(PROGRESS_INTERVAL_MINS),
            last_sent: None,
        }
    }

    /// Override the progress cadence (useful for testing).
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Emit the one-time "run started" report.
    pub async fn run_started(&mut self, plan: &WatchPlan, now: DateTime<Utc>) {
        self.deliver(report::run_started(plan, local(now))).await;
        self.last_sent = Some(now);
    }

    /// Emit a periodic progress report if one is due. Returns whether a
    /// report went out.
    pub async fn maybe_progress(
        &mut self,
        plan: &WatchPlan,
        state: &RunState,
        now: DateTime<Utc>,
    ) -> bool {
        let due = match self.last_sent {
            None => true,
            Some(prev) => now.signed_duration_since(prev) >= self.interval,
        };
        if !due {
            return false;
        }

        self.deliver(report::progress(
            plan,
            state.attempts,
            state.elapsed_minutes(now),
            local(now),
        ))
        .await;
        self.last_sent = Some(now);
        true
    }

    /// Emit a best-effort anomaly report. Not throttled: every
    /// per-attempt failure gets its own delivery attempt.
    pub async fn anomaly(&self, plan: &WatchPlan, attempt: u32, error: &str, now: DateTime<Utc>) {
        self.deliver(report::anomaly(plan, attempt, error, local(now)))
            .await;
    }

    /// Emit the exactly-once terminal report.
    pub async fn finished(
        &self,
        plan: &WatchPlan,
        outcome: &Outcome,
        state: &RunState,
        now: DateTime<Utc>,
    ) {
        self.deliver(report::finished(
            plan,
            outcome,
            state.attempts,
            state.elapsed_minutes(now),
            local(now),
        ))
        .await;
    }

    async fn deliver(&self, report: Report) {
        if let Err(err) = self.notifier.send(&report).await {
            warn!(title = %report.title, error = %err, "notification delivery failed");
        }
    }
}

fn local(now: DateTime<Utc>) -> DateTime<Local> {
    now.with_timezone(&Local)
}
