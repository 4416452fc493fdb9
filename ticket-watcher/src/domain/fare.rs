//! Fare class (ticket type) for the query.

use std::fmt;

use serde::Deserialize;

/// The fare class a run searches for.
///
/// Maps to the query API's purpose code: `ADULT` for full-fare tickets,
/// `0X00` for student tickets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FareClass {
    #[default]
    Adult,
    Student,
}

impl FareClass {
    /// The purpose code sent with left-ticket queries.
    pub fn purpose_code(&self) -> &'static str {
        match self {
            FareClass::Adult => "ADULT",
            FareClass::Student => "0X00",
        }
    }
}

impl fmt::Display for FareClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FareClass::Adult => f.write_str("adult"),
            FareClass::Student => f.write_str("student"),
        }
    }
}
