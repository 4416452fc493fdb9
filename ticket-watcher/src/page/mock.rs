//! Scripted board for testing without network access.
//!
//! Serves a queue of pre-scripted snapshots (or failures) as if they
//! were live query results, and records every call the watcher makes.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::convert::TrainRow;
use super::error::{BookError, PageError};
use super::{BookingDesk, TicketBoard};

/// Scripted implementation of [`TicketBoard`] and [`BookingDesk`].
///
/// Each `snapshot` call consumes the next scripted entry; once the
/// script runs dry the board serves empty snapshots forever. Submission
/// outcomes are scripted the same way and default to success.
#[derive(Default)]
pub struct ScriptedBoard {
    snapshots: Mutex<VecDeque<Result<Vec<TrainRow>, PageError>>>,
    submits: Mutex<VecDeque<Result<(), BookError>>>,
    submitted: Mutex<Vec<TrainRow>>,
    fail_refreshes: AtomicU32,
    snapshot_calls: AtomicU32,
    refresh_calls: AtomicU32,
    reload_calls: AtomicU32,
}

impl ScriptedBoard {
    /// Create a board with an empty script.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a snapshot for the next attempt.
    pub fn with_snapshot(mut self, rows: Vec<TrainRow>) -> Self {
        self.snapshots.get_mut().push_back(Ok(rows));
        self
    }

    /// Queue a snapshot failure for the next attempt.
    pub fn with_snapshot_error(mut self, err: PageError) -> Self {
        self.snapshots.get_mut().push_back(Err(err));
        self
    }

    /// Queue a submission outcome (default when exhausted: success).
    pub fn with_submit_result(mut self, result: Result<(), BookError>) -> Self {
        self.submits.get_mut().push_back(result);
        self
    }

    /// Make the next `n` refresh calls fail, forcing the reload fallback.
    pub fn with_failing_refreshes(self, n: u32) -> Self {
        self.fail_refreshes.store(n, Ordering::SeqCst);
        self
    }

    /// Rows the watcher submitted orders for, in call order.
    pub async fn submitted(&self) -> Vec<TrainRow> {
        self.submitted.lock().await.clone()
    }

    /// How many snapshots the watcher requested.
    pub fn snapshot_calls(&self) -> u32 {
        self.snapshot_calls.load(Ordering::SeqCst)
    }

    /// How many in-place refreshes the watcher requested.
    pub fn refresh_calls(&self) -> u32 {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    /// How many full reloads the watcher requested.
    pub fn reload_calls(&self) -> u32 {
        self.reload_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TicketBoard for ScriptedBoard {
    async fn wait_for_results(&self, _timeout: Duration) -> Result<(), PageError> {
        Ok(())
    }

    async fn snapshot(&self) -> Result<Vec<TrainRow>, PageError> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        match self.snapshots.lock().await.pop_front() {
            Some(scripted) => scripted,
            None => Ok(Vec::new()),
        }
    }

    async fn refresh(&self) -> Result<(), PageError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);

        let remaining = self.fail_refreshes.load(Ordering::SeqCst);
        if remaining > 0 {
            self.fail_refreshes.store(remaining - 1, Ordering::SeqCst);
            return Err(PageError::Api {
                status: 503,
                message: "scripted refresh failure".to_string(),
            });
        }
        Ok(())
    }

    async fn reload(&self) -> Result<(), PageError> {
        self.reload_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl BookingDesk for ScriptedBoard {
    async fn submit(&self, row: &TrainRow) -> Result<(), BookError> {
        self.submitted.lock().await.push(row.clone());
        match self.submits.lock().await.pop_front() {
            Some(scripted) => scripted,
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(token: &str) -> TrainRow {
        TrainRow {
            code: None,
            departs: None,
            bookable: true,
            booking_token: Some(token.to_string()),
        }
    }

    #[tokio::test]
    async fn serves_scripted_snapshots_then_empty() {
        let board = ScriptedBoard::new().with_snapshot(vec![row("a")]);

        assert_eq!(board.snapshot().await.unwrap().len(), 1);
        assert!(board.snapshot().await.unwrap().is_empty());
        assert_eq!(board.snapshot_calls(), 2);
    }

    #[tokio::test]
    async fn scripted_refresh_failures_then_success() {
        let board = ScriptedBoard::new().with_failing_refreshes(1);

        assert!(board.refresh().await.is_err());
        assert!(board.refresh().await.is_ok());
        assert_eq!(board.refresh_calls(), 2);
    }

    #[tokio::test]
    async fn records_submitted_rows() {
        let board = ScriptedBoard::new()
            .with_submit_result(Err(BookError::NotActionable));

        assert!(board.submit(&row("a")).await.is_err());
        assert!(board.submit(&row("b")).await.is_ok());

        let submitted = board.submitted().await;
        assert_eq!(submitted.len(), 2);
        assert_eq!(submitted[0].booking_token.as_deref(), Some("a"));
    }
}
