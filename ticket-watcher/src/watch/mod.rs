//! The monitoring run: parameters, state, and the polling engine.
//!
//! A run is configured once ([`RunParams`] validated into a
//! [`WatchPlan`]), then driven by [`Watcher`] until it produces exactly
//! one terminal [`Outcome`].

mod engine;
mod params;
mod state;


pub use engine::{Watcher, WatcherConfig};
pub use params::{DelayRange, ParamsError, RawDelay, RawWindow, RunParams, WatchPlan};
pub use state::{AbortReason, BookedTicket, Outcome, RunState};
