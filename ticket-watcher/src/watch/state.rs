//! Run state and terminal outcomes.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::domain::{DepartTime, TrainCode};

/// Mutable state of one monitoring run.
///
/// Owned and mutated only by the polling engine, strictly sequentially.
#[derive(Debug, Clone)]
pub struct RunState {
    /// Attempts performed so far.
    pub attempts: u32,

    /// When the run began.
    pub started_at: DateTime<Utc>,
}

impl RunState {
    /// Fresh state for a run beginning now.
    pub fn begin(now: DateTime<Utc>) -> Self {
        Self {
            attempts: 0,
            started_at: now,
        }
    }

    /// Whole minutes elapsed since the run began.
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.started_at).num_minutes()
    }
}

/// What the run managed to book.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookedTicket {
    /// Code of the matched row, when the board carried one.
    pub code: Option<TrainCode>,

    /// Departure time of the matched row, when the board carried one.
    pub departs: Option<DepartTime>,

    /// The attempt on which the order went through.
    pub attempt: u32,
}

impl fmt::Display for BookedTicket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.departs) {
            (Some(code), Some(t)) => write!(f, "train {code} departing {t}"),
            (Some(code), None) => write!(f, "train {code}"),
            (None, Some(t)) => write!(f, "departure at {t}"),
            (None, None) => f.write_str("matched row"),
        }
    }
}

/// Why a run was aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The caller cancelled the run.
    Cancelled,

    /// The remote side stopped accepting the session handle.
    SessionExpired,
}

impl fmt::Display for AbortReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AbortReason::Cancelled => f.write_str("cancelled by caller"),
            AbortReason::SessionExpired => f.write_str("session no longer valid"),
        }
    }
}

/// Terminal result of a monitoring run. Exactly one of these is
/// produced per run, and the run performs nothing further once it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The booking action was triggered successfully.
    Booked(BookedTicket),

    /// The attempt budget ran out without a match (bounded runs only).
    Exhausted { attempts: u32 },

    /// The run ended early without exhausting its budget.
    Aborted(AbortReason),
}

impl Outcome {
    /// Whether the run achieved its goal.
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Booked(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Booked(ticket) => {
                write!(f, "order submitted for {ticket} on attempt {}", ticket.attempt)
            }
            Outcome::Exhausted { attempts } => {
                write!(f, "no match within {attempts} attempts")
            }
            Outcome::Aborted(reason) => write!(f, "run aborted: {reason}"),
        }
    }
}
