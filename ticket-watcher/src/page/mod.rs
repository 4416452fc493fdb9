//! Board query and booking interfaces.
//!
//! The watcher never talks to the remote booking site directly; it goes
//! through the two traits here. The production implementation is
//! [`QueryClient`], an HTTP client for the left-ticket query API. A
//! scripted implementation lives in [`mock`] for development and tests.

use std::time::Duration;

use async_trait::async_trait;

mod client;
mod convert;
mod error;
pub mod mock;
mod types;

pub use client::{BoardConfig, BoardQuery, QueryClient};
pub use convert::{TrainRow, parse_board};
pub use error::{BookError, PageError};
pub use types::{QueryData, QueryResponse, SubmitResponse};

/// Read access to the remote result board.
///
/// One poll attempt acquires a snapshot via `wait_for_results` followed
/// by `snapshot`, and ends with `refresh` (falling back to `reload`)
/// before the next attempt.
#[async_trait]
pub trait TicketBoard: Send + Sync {
    /// Block until the result table is available, up to `timeout`.
    async fn wait_for_results(&self, timeout: Duration) -> Result<(), PageError>;

    /// Read the current result rows. Rows are owned by this attempt and
    /// must not be held across a refresh.
    async fn snapshot(&self) -> Result<Vec<TrainRow>, PageError>;

    /// Re-run the query in place (the cheap path).
    async fn refresh(&self) -> Result<(), PageError>;

    /// Full re-load of the query surface, used when `refresh` fails.
    async fn reload(&self) -> Result<(), PageError>;
}

/// Write access: trigger the booking action for a row.
#[async_trait]
pub trait BookingDesk: Send + Sync {
    /// Submit an order for the given row.
    ///
    /// Implementations retry a transport-level failure once via an
    /// alternate invocation path before returning `BookError`.
    async fn submit(&self, row: &TrainRow) -> Result<(), BookError>;
}
