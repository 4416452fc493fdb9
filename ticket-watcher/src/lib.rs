//! Availability watcher for a train booking board.
//!
//! Polls the left-ticket query surface for a seat matching either a
//! target train code or a departure-time window, triggers the booking
//! action the moment a match appears, and reports progress to a
//! DingTalk robot on a wall-clock cadence.

pub mod domain;
pub mod notify;
pub mod page;
pub mod selector;
pub mod watch;
