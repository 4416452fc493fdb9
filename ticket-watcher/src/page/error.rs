//! Board query and booking error types.

use std::time::Duration;

/// Errors from the board query surface.
///
/// Everything except `SessionExpired` is recoverable within a
/// monitoring run: the watcher logs the failure and tries again on the
/// next attempt.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The query API answered but flagged the request as failed
    #[error("query API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("malformed query response: {0}")]
    Malformed(String),

    /// The result table never became available within the bounded wait
    #[error("results did not appear within {}s", .0.as_secs())]
    Timeout(Duration),

    /// The session handle is no longer accepted by the remote side.
    /// Fatal to the run: only the caller can establish a new session.
    #[error("session expired or not authenticated")]
    SessionExpired,
}

impl PageError {
    /// Whether the watcher can keep polling after this error.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, PageError::SessionExpired)
    }
}

/// Errors from triggering a booking action.
///
/// A failed booking attempt never ends the run: the row may still be
/// there on the next snapshot, so the watcher keeps monitoring.
#[derive(Debug, thiserror::Error)]
pub enum BookError {
    /// The row carries no usable booking control
    #[error("row has no usable booking control")]
    NotActionable,

    /// The booking request could not be delivered (already retried once
    /// via the alternate invocation path)
    #[error("booking request failed: {0}")]
    Transport(#[source] reqwest::Error),

    /// The remote side answered but refused the booking
    #[error("booking rejected: {message}")]
    Rejected { message: String },
}
