//! Wire types for the left-ticket query API.
//!
//! The query endpoint answers with a JSON envelope whose `data.result`
//! is a list of pipe-delimited records, one per train. Only the fields
//! the watcher needs are documented here; the records carry dozens more.

use serde::Deserialize;

/// Envelope returned by the left-ticket query endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryResponse {
    /// Whether the remote side considers the query successful.
    #[serde(default)]
    pub status: bool,

    /// Human-readable failure messages, empty on success.
    #[serde(default)]
    pub messages: Vec<String>,

    /// Absent when the session has been bounced back to login.
    #[serde(default)]
    pub data: Option<QueryData>,
}

/// Payload of a successful query.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryData {
    /// Pipe-delimited train records.
    #[serde(default)]
    pub result: Vec<String>,
}

/// Envelope returned by the order submission endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitResponse {
    #[serde(default)]
    pub status: bool,

    #[serde(default)]
    pub messages: Vec<String>,
}

/// Positions of the fields we read out of a pipe-delimited record.
pub(crate) mod field {
    /// Opaque booking token, empty when the row cannot be booked.
    pub const SECRET: usize = 0;
    /// Train code as displayed on the board (e.g. "G101").
    pub const TRAIN_CODE: usize = 3;
    /// Departure time as "HH:MM"; "24:00" when unknown.
    pub const START_TIME: usize = 8;
    /// "Y" when the row has an enabled booking control.
    pub const CAN_BUY: usize = 11;

    /// Shortest record we accept; anything shorter is dropped.
    pub const MIN_FIELDS: usize = 12;
}
