//! Departure time handling for the booking board.
//!
//! The query surface provides departure times as "HH:MM" strings. This
//! module provides a validated time-of-day type and the inclusive time
//! window used by the window selection strategy.

use std::cmp::Ordering;
use std::fmt;

/// Error returned when parsing an invalid time string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid time: {reason}")]
pub struct TimeError {
    reason: &'static str,
}

impl TimeError {
    fn new(reason: &'static str) -> Self {
        Self { reason }
    }
}

/// A time of day in the range 00:00-23:59.
///
/// Only well-formed two-digit "HH:MM" strings parse. Malformed input is
/// a parse error, never a silent midnight: a row whose time cannot be
/// read must be treated as having no time at all.
///
/// # Examples
///
/// ```
/// use ticket_watcher::domain::DepartTime;
///
/// let t = DepartTime::parse_hhmm("08:05").unwrap();
/// assert_eq!(t.to_string(), "08:05");
///
/// // Invalid formats
/// assert!(DepartTime::parse_hhmm("805").is_err());
/// assert!(DepartTime::parse_hhmm("8:05").is_err());
/// assert!(DepartTime::parse_hhmm("24:00").is_err());
/// assert!(DepartTime::parse_hhmm("08:60").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct DepartTime {
    hour: u8,
    minute: u8,
}

impl DepartTime {
    /// Parse a time from strict "HH:MM" format.
    pub fn parse_hhmm(s: &str) -> Result<Self, TimeError> {
        // Must be exactly 5 characters: HH:MM
        if s.len() != 5 {
            return Err(TimeError::new("expected HH:MM format"));
        }

        let bytes = s.as_bytes();

        if bytes[2] != b':' {
            return Err(TimeError::new("expected colon at position 2"));
        }

        let hour =
            parse_two_digits(&bytes[0..2]).ok_or_else(|| TimeError::new("invalid hour digits"))?;
        if hour > 23 {
            return Err(TimeError::new("hour must be 0-23"));
        }

        let minute = parse_two_digits(&bytes[3..5])
            .ok_or_else(|| TimeError::new("invalid minute digits"))?;
        if minute > 59 {
            return Err(TimeError::new("minute must be 0-59"));
        }

        Ok(Self {
            hour: hour as u8,
            minute: minute as u8,
        })
    }

    /// Returns the hour (0-23).
    pub fn hour(&self) -> u32 {
        self.hour as u32
    }

    /// Returns the minute (0-59).
    pub fn minute(&self) -> u32 {
        self.minute as u32
    }

    /// Minutes since midnight, the ordering key for "earliest departure".
    pub fn minutes_from_midnight(&self) -> u32 {
        self.hour() * 60 + self.minute()
    }
}

impl Ord for DepartTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.minutes_from_midnight()
            .cmp(&other.minutes_from_midnight())
    }
}

impl PartialOrd for DepartTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Debug for DepartTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DepartTime({:02}:{:02})", self.hour, self.minute)
    }
}

impl fmt::Display for DepartTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, self.minute)
    }
}

/// Parse two ASCII digit bytes into a u32.
fn parse_two_digits(bytes: &[u8]) -> Option<u32> {
    if bytes.len() != 2 {
        return None;
    }
    let d1 = (bytes[0] as char).to_digit(10)?;
    let d2 = (bytes[1] as char).to_digit(10)?;
    Some(d1 * 10 + d2)
}

/// An inclusive departure-time window.
///
/// Both ends are inclusive: a departure at exactly `start` or exactly
/// `end` is inside the window. Construction does not require
/// `start <= end`; an inverted window is valid but contains no time at
/// all, matching the query tool this replaces rather than raising.
///
/// # Examples
///
/// ```
/// use ticket_watcher::domain::{DepartTime, TimeWindow};
///
/// let window = TimeWindow::new(
///     DepartTime::parse_hhmm("08:00").unwrap(),
///     DepartTime::parse_hhmm("09:00").unwrap(),
/// );
///
/// assert!(window.contains(DepartTime::parse_hhmm("08:00").unwrap()));
/// assert!(window.contains(DepartTime::parse_hhmm("08:40").unwrap()));
/// assert!(window.contains(DepartTime::parse_hhmm("09:00").unwrap()));
/// assert!(!window.contains(DepartTime::parse_hhmm("09:01").unwrap()));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeWindow {
    start: DepartTime,
    end: DepartTime,
}

impl TimeWindow {
    /// Create a window from its bounds.
    pub fn new(start: DepartTime, end: DepartTime) -> Self {
        Self { start, end }
    }

    /// Returns the start bound.
    pub fn start(&self) -> DepartTime {
        self.start
    }

    /// Returns the end bound.
    pub fn end(&self) -> DepartTime {
        self.end
    }

    /// Whether the window is inverted (start after end).
    ///
    /// An inverted window contains nothing; callers that construct one
    /// from user input should warn about it up front.
    pub fn is_inverted(&self) -> bool {
        self.start > self.end
    }

    /// Inclusive containment on both ends.
    pub fn contains(&self, t: DepartTime) -> bool {
        self.start <= t && t <= self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(s: &str) -> DepartTime {
        DepartTime::parse_hhmm(s).unwrap()
    }

    #[test]
    fn parse_valid_times() {
        assert!(DepartTime::parse_hhmm("00:00").is_ok());
        assert!(DepartTime::parse_hhmm("23:59").is_ok());
        assert!(DepartTime::parse_hhmm("08:05").is_ok());
        assert!(DepartTime::parse_hhmm("12:30").is_ok());
    }

    #[test]
    fn reject_bad_shapes() {
        assert!(DepartTime::parse_hhmm("").is_err());
        assert!(DepartTime::parse_hhmm("0800").is_err());
        assert!(DepartTime::parse_hhmm("8:00").is_err());
        assert!(DepartTime::parse_hhmm("08-00").is_err());
        assert!(DepartTime::parse_hhmm("08:00 ").is_err());
        assert!(DepartTime::parse_hhmm("ab:cd").is_err());
    }

    #[test]
    fn reject_out_of_range() {
        assert!(DepartTime::parse_hhmm("24:00").is_err());
        assert!(DepartTime::parse_hhmm("99:00").is_err());
        assert!(DepartTime::parse_hhmm("10:60").is_err());
        assert!(DepartTime::parse_hhmm("10:99").is_err());
    }

    #[test]
    fn ordering_by_minutes() {
        assert!(t("08:00") < t("08:01"));
        assert!(t("08:59") < t("09:00"));
        assert!(t("00:00") < t("23:59"));
        assert_eq!(t("12:34"), t("12:34"));
    }

    #[test]
    fn minutes_from_midnight() {
        assert_eq!(t("00:00").minutes_from_midnight(), 0);
        assert_eq!(t("08:05").minutes_from_midnight(), 485);
        assert_eq!(t("23:59").minutes_from_midnight(), 1439);
    }

    #[test]
    fn display_roundtrip() {
        assert_eq!(t("08:05").to_string(), "08:05");
        assert_eq!(t("23:59").to_string(), "23:59");
    }

    #[test]
    fn window_inclusive_bounds() {
        let w = TimeWindow::new(t("08:00"), t("09:00"));
        assert!(w.contains(t("08:00")));
        assert!(w.contains(t("09:00")));
        assert!(!w.contains(t("07:59")));
        assert!(!w.contains(t("09:01")));
    }

    #[test]
    fn single_instant_window() {
        let w = TimeWindow::new(t("08:30"), t("08:30"));
        assert!(w.contains(t("08:30")));
        assert!(!w.contains(t("08:29")));
        assert!(!w.contains(t("08:31")));
    }

    #[test]
    fn inverted_window_contains_nothing() {
        let w = TimeWindow::new(t("09:00"), t("08:00"));
        assert!(w.is_inverted());
        assert!(!w.contains(t("08:00")));
        assert!(!w.contains(t("08:30")));
        assert!(!w.contains(t("09:00")));
        assert!(!w.contains(t("00:00")));
        assert!(!w.contains(t("23:59")));
    }

    #[test]
    fn window_display() {
        let w = TimeWindow::new(t("08:00"), t("09:30"));
        assert_eq!(w.to_string(), "08:00-09:30");
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Strategy for generating valid "HH:MM" strings.
    fn valid_hhmm() -> impl Strategy<Value = String> {
        (0u32..24, 0u32..60).prop_map(|(h, m)| format!("{:02}:{:02}", h, m))
    }

    fn depart_time() -> impl Strategy<Value = DepartTime> {
        valid_hhmm().prop_map(|s| DepartTime::parse_hhmm(&s).unwrap())
    }

    proptest! {
        /// Roundtrip: parse then Display returns the original
        #[test]
        fn roundtrip(s in valid_hhmm()) {
            let t = DepartTime::parse_hhmm(&s).unwrap();
            prop_assert_eq!(t.to_string(), s);
        }

        /// Any valid HH:MM parses
        #[test]
        fn valid_always_parses(s in valid_hhmm()) {
            prop_assert!(DepartTime::parse_hhmm(&s).is_ok());
        }

        /// Wrong-length strings are rejected
        #[test]
        fn wrong_length_rejected(s in "[0-9:]{0,4}|[0-9:]{6,10}") {
            prop_assert!(DepartTime::parse_hhmm(&s).is_err());
        }

        /// Hours above 23 are rejected
        #[test]
        fn out_of_range_hour_rejected(h in 24u32..100, m in 0u32..60) {
            let s = format!("{:02}:{:02}", h, m);
            prop_assert!(DepartTime::parse_hhmm(&s).is_err());
        }

        /// Minutes above 59 are rejected
        #[test]
        fn out_of_range_minute_rejected(h in 0u32..24, m in 60u32..100) {
            let s = format!("{:02}:{:02}", h, m);
            prop_assert!(DepartTime::parse_hhmm(&s).is_err());
        }

        /// Ordering agrees with minutes from midnight
        #[test]
        fn ordering_matches_minutes(a in depart_time(), b in depart_time()) {
            prop_assert_eq!(
                a.cmp(&b),
                a.minutes_from_midnight().cmp(&b.minutes_from_midnight())
            );
        }

        /// A non-inverted window always contains its own bounds
        #[test]
        fn window_contains_bounds(a in depart_time(), b in depart_time()) {
            let (start, end) = if a <= b { (a, b) } else { (b, a) };
            let w = TimeWindow::new(start, end);
            prop_assert!(w.contains(start));
            prop_assert!(w.contains(end));
        }

        /// An inverted window contains no time
        #[test]
        fn inverted_window_empty(a in depart_time(), b in depart_time(), probe in depart_time()) {
            prop_assume!(a != b);
            let (start, end) = if a > b { (a, b) } else { (b, a) };
            let w = TimeWindow::new(start, end);
            prop_assert!(!w.contains(probe));
        }
    }
}
