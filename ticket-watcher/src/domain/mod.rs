//! Domain types for the ticket watcher.
//!
//! This module contains the core domain model types that represent
//! validated booking-board data. All types enforce their invariants at
//! construction time, so code that receives these types can trust their
//! validity.

mod fare;
mod telecode;
mod time;
mod train_code;

pub use fare::FareClass;
pub use telecode::{InvalidTelecode, Telecode};
pub use time::{DepartTime, TimeError, TimeWindow};
pub use train_code::{InvalidTrainCode, TrainCode};
