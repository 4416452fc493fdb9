//! Conversion from wire records to domain rows.
//!
//! Records are tolerated per-field: a row whose train code or departure
//! time cannot be read keeps the fields that did parse. Records too
//! short to index are dropped entirely.

use tracing::trace;

use crate::domain::{DepartTime, TrainCode};

use super::types::field;

/// One entry of a board snapshot.
///
/// Produced fresh on every poll attempt and never persisted across
/// attempts. `code` and `departs` are independently optional because
/// either extraction may fail on a real board row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainRow {
    /// Train code, if the record carried a well-formed one.
    pub code: Option<TrainCode>,

    /// Departure time, if the record carried a well-formed one.
    pub departs: Option<DepartTime>,

    /// Whether the row has an enabled booking control.
    pub bookable: bool,

    /// Opaque token needed to submit an order for this row.
    pub booking_token: Option<String>,
}

/// Parse a board snapshot out of the query payload's records.
///
/// Unreadable records are dropped; the returned rows preserve board
/// order, which the selector relies on for stable tie-breaking.
pub fn parse_board(records: &[String]) -> Vec<TrainRow> {
    records
        .iter()
        .filter_map(|record| parse_record(record))
        .collect()
}

fn parse_record(record: &str) -> Option<TrainRow> {
    let fields: Vec<&str> = record.split('|').collect();

    if fields.len() < field::MIN_FIELDS {
        trace!(fields = fields.len(), "dropping short board record");
        return None;
    }

    let code = TrainCode::parse(fields[field::TRAIN_CODE]).ok();
    let departs = DepartTime::parse_hhmm(fields[field::START_TIME]).ok();
    let bookable = fields[field::CAN_BUY] == "Y";
    let booking_token = match fields[field::SECRET] {
        "" => None,
        token => Some(token.to_string()),
    };

    Some(TrainRow {
        code,
        departs,
        bookable,
        booking_token,
    })
}
