//! Status notifications for a monitoring run.
//!
//! Content construction ([`report`]) is pure; delivery cadence is owned
//! by [`ReportScheduler`]; the wire transport is a DingTalk robot
//! webhook ([`DingTalkNotifier`]). A delivery failure is never allowed
//! to disturb the polling loop.

use async_trait::async_trait;
use tracing::debug;

mod dingtalk;
pub mod report;
mod scheduler;

pub use dingtalk::{DingTalkConfig, DingTalkNotifier};
pub use scheduler::ReportScheduler;

/// One status report, built on demand and discarded after delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub title: String,
    pub body: String,
}

/// Errors from a notification transport.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The robot answered but refused the message
    #[error("robot rejected message (errcode {code}): {message}")]
    Rejected { code: i64, message: String },

    /// The signing secret cannot be used as an HMAC key
    #[error("invalid webhook signing secret")]
    InvalidSecret,
}

/// A notification transport.
#[async_trait]
pub trait Notify: Send + Sync {
    /// Deliver one report. Best-effort: callers log failures and move on.
    async fn send(&self, report: &Report) -> Result<(), NotifyError>;
}

/// Transport used when no robot token is configured: drops every
/// report, leaving a trace in the logs.
pub struct NoopNotifier;

#[async_trait]
impl Notify for NoopNotifier {
    async fn send(&self, report: &Report) -> Result<(), NotifyError> {
        debug!(title = %report.title, "notifications disabled, dropping report");
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use std::sync::Arc;

    use async_trait::async_trait;
    use tokio::sync::Mutex;

    use super::{Notify, NotifyError, Report};

    /// Records every report it is handed.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingNotifier {
        sent: Arc<Mutex<Vec<Report>>>,
    }

    impl RecordingNotifier {
        pub(crate) async fn reports(&self) -> Vec<Report> {
            self.sent.lock().await.clone()
        }

        pub(crate) async fn titles(&self) -> Vec<String> {
            self.sent
                .lock()
                .await
                .iter()
                .map(|r| r.title.clone())
                .collect()
        }
    }

    #[async_trait]
    impl Notify for RecordingNotifier {
        async fn send(&self, report: &Report) -> Result<(), NotifyError> {
            self.sent.lock().await.push(report.clone());
            Ok(())
        }
    }

    /// Fails every delivery, for checking that failures stay contained.
    pub(crate) struct FailingNotifier;

    #[async_trait]
    impl Notify for FailingNotifier {
        async fn send(&self, _report: &Report) -> Result<(), NotifyError> {
            Err(NotifyError::Rejected {
                code: 310000,
                message: "scripted failure".to_string(),
            })
        }
    }
}
