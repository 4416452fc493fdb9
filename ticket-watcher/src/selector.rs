//! Candidate selection logic.
//!
//! This module contains the core logic for picking the one row of a
//! board snapshot worth acting on, under the run's selection strategy.
//! It is a pure function of its inputs: no clocks, no side effects.

use std::fmt;

use crate::domain::{DepartTime, TimeWindow, TrainCode};
use crate::page::TrainRow;

/// How many distinct departure times a miss reports for diagnostics.
const SCAN_SAMPLE: usize = 6;

/// The selection policy for a monitoring run.
///
/// Chosen once from run parameters and immutable for the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Policy {
    /// Earliest bookable departure inside an inclusive time window.
    ByWindow(TimeWindow),

    /// The bookable row with exactly this train code.
    ByTrainCode(TrainCode),
}

impl fmt::Display for Policy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Policy::ByWindow(window) => write!(f, "departures within {window}"),
            Policy::ByTrainCode(code) => write!(f, "train {code}"),
        }
    }
}

/// Result of one selection pass over a snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<'a> {
    /// A row worth acting on.
    Hit(&'a TrainRow),

    /// Nothing actionable, with the reason for diagnostics.
    Miss(MissReason),
}

impl<'a> Selection<'a> {
    /// The selected row, if any.
    pub fn row(&self) -> Option<&'a TrainRow> {
        match self {
            Selection::Hit(row) => Some(row),
            Selection::Miss(_) => None,
        }
    }
}

/// Why a selection pass came up empty.
///
/// Callers treat every variant the same way (wait and retry); the
/// distinction exists for logging, in particular "target not on the
/// board" versus "target on the board but sold out".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissReason {
    /// The snapshot had no rows at all.
    EmptyBoard,

    /// No bookable departure inside the window.
    NoneInWindow {
        /// Total rows scanned.
        rows_scanned: usize,
        /// Sorted sample of the distinct departure times that were parsed.
        times_seen: Vec<DepartTime>,
    },

    /// The target train code is not on the board.
    CodeNotOnBoard,

    /// The target train code is on the board but cannot be booked.
    CodeNotBookable,
}

impl fmt::Display for MissReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MissReason::EmptyBoard => f.write_str("no rows on the board"),
            MissReason::NoneInWindow {
                rows_scanned,
                times_seen,
            } => {
                write!(f, "no bookable departure in window ({rows_scanned} rows scanned")?;
                if !times_seen.is_empty() {
                    let times: Vec<String> =
                        times_seen.iter().map(DepartTime::to_string).collect();
                    write!(f, "; departures seen: {}", times.join(","))?;
                }
                f.write_str(")")
            }
            MissReason::CodeNotOnBoard => f.write_str("target train not on the board"),
            MissReason::CodeNotBookable => {
                f.write_str("target train on the board but not bookable")
            }
        }
    }
}

/// Pick at most one actionable row from a snapshot.
///
/// - [`Policy::ByWindow`]: among bookable rows whose departure time is
///   inside the window (inclusive on both ends), the earliest departure
///   wins; ties keep the first in board order.
/// - [`Policy::ByTrainCode`]: the row carrying exactly the target
///   code, and only if it is bookable.
///
/// Rows with no parsed departure time never match a window; rows with
/// no parsed code never match a target code.
pub fn select<'a>(policy: &Policy, rows: &'a [TrainRow]) -> Selection<'a> {
    if rows.is_empty() {
        return Selection::Miss(MissReason::EmptyBoard);
    }

    match policy {
        Policy::ByWindow(window) => select_in_window(*window, rows),
        Policy::ByTrainCode(code) => select_by_code(code, rows),
    }
}

fn select_in_window(window: TimeWindow, rows: &[TrainRow]) -> Selection<'_> {
    let mut best: Option<(&TrainRow, DepartTime)> = None;

    for row in rows {
        let Some(departs) = row.departs else {
            continue;
        };
        if !row.bookable || !window.contains(departs) {
            continue;
        }
        match &best {
            // Strict improvement only: ties keep the earlier board row.
            Some((_, held)) if *held <= departs => {}
            _ => best = Some((row, departs)),
        }
    }

    match best {
        Some((row, _)) => Selection::Hit(row),
        None => Selection::Miss(MissReason::NoneInWindow {
            rows_scanned: rows.len(),
            times_seen: scan_sample(rows),
        }),
    }
}

fn select_by_code<'a>(target: &TrainCode, rows: &'a [TrainRow]) -> Selection<'a> {
    let mut found_unbookable = false;

    for row in rows {
        if row.code.as_ref() == Some(target) {
            if row.bookable {
                return Selection::Hit(row);
            }
            found_unbookable = true;
        }
    }

    Selection::Miss(if found_unbookable {
        MissReason::CodeNotBookable
    } else {
        MissReason::CodeNotOnBoard
    })
}

/// Sorted, deduplicated sample of the departure times on the board.
fn scan_sample(rows: &[TrainRow]) -> Vec<DepartTime> {
    let mut times: Vec<DepartTime> = rows.iter().filter_map(|row| row.departs).collect();
    times.sort_unstable();
    times.dedup();
    times.truncate(SCAN_SAMPLE);
    times
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn depart_time() -> impl Strategy<Value = DepartTime> {
        (0u32..24, 0u32..60).prop_map(|(h, m)| {
            DepartTime::parse_hhmm(&format!("{:02}:{:02}", h, m)).unwrap()
        })
    }

    fn train_row() -> impl Strategy<Value = TrainRow> {
        (
            proptest::option::of("[GDKCTZXYFS][0-9]{1,4}"),
            proptest::option::of(depart_time()),
            proptest::bool::ANY,
        )
            .prop_map(|(code, departs, bookable)| TrainRow {
                code: code.and_then(|c| TrainCode::parse(&c).ok()),
                departs,
                bookable,
                booking_token: bookable.then(|| "tok".to_string()),
            })
    }

    proptest! {
        /// A window hit is always bookable, timed, and inside the window.
        #[test]
        fn window_hit_is_valid(
            rows in proptest::collection::vec(train_row(), 0..12),
            a in depart_time(),
            b in depart_time(),
        ) {
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            let w = TimeWindow::new(start, end);

            if let Selection::Hit(row) = select(&Policy::ByWindow(w), &rows) {
                prop_assert!(row.bookable);
                let departs = row.departs.expect("hit must have a departure time");
                prop_assert!(w.contains(departs));

                // And it is the minimum over all matching rows.
                let min = rows
                    .iter()
                    .filter(|r| r.bookable)
                    .filter_map(|r| r.departs)
                    .filter(|t| w.contains(*t))
                    .min()
                    .expect("a hit implies at least one matching row");
                prop_assert_eq!(departs, min);
            }
        }

        /// A code hit carries exactly the target code and is bookable.
        #[test]
        fn code_hit_is_valid(
            rows in proptest::collection::vec(train_row(), 0..12),
            target in "[GDKCTZXYFS][0-9]{1,4}",
        ) {
            let target = TrainCode::parse(&target).unwrap();
            if let Selection::Hit(row) = select(&Policy::ByTrainCode(target.clone()), &rows) {
                prop_assert_eq!(row.code.as_ref(), Some(&target));
                prop_assert!(row.bookable);
            }
        }

        /// Selection is a pure function of its inputs.
        #[test]
        fn select_pure(
            rows in proptest::collection::vec(train_row(), 0..12),
            a in depart_time(),
            b in depart_time(),
        ) {
            let strategy = Policy::ByWindow(TimeWindow::new(a, b));
            prop_assert_eq!(select(&strategy, &rows), select(&strategy, &rows));
        }
    }
}
