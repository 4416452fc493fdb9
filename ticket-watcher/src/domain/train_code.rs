//! Train code (service identity) type.

use std::fmt;

/// Category letters a train code may start with.
///
/// G: high-speed, D: electric multiple unit, C: intercity, Z: direct
/// express, T: express, K: fast, plus the less common X/Y/F/S services.
const CATEGORY_LETTERS: &[u8] = b"GDKCTZXYFS";

/// Error returned when parsing an invalid train code.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid train code: {reason}")]
pub struct InvalidTrainCode {
    reason: &'static str,
}

/// A validated train code: one category letter followed by 1-5 digits.
///
/// Parsing normalizes its input (leading/trailing whitespace trimmed,
/// letters uppercased), so user-entered codes like `" d5 "` compare
/// equal to the `D5` shown on the departure board.
///
/// # Examples
///
/// ```
/// use ticket_watcher::domain::TrainCode;
///
/// let code = TrainCode::parse("G101").unwrap();
/// assert_eq!(code.as_str(), "G101");
/// assert_eq!(code.category(), 'G');
///
/// // Lowercase and surrounding whitespace are normalized away
/// assert_eq!(TrainCode::parse(" d5 ").unwrap().as_str(), "D5");
///
/// // Anything else is rejected
/// assert!(TrainCode::parse("").is_err());
/// assert!(TrainCode::parse("101").is_err());
/// assert!(TrainCode::parse("A101").is_err());
/// assert!(TrainCode::parse("G123456").is_err());
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TrainCode(String);

impl TrainCode {
    /// Parse a train code, normalizing case and surrounding whitespace.
    pub fn parse(s: &str) -> Result<Self, InvalidTrainCode> {
        let normalized = s.trim().to_ascii_uppercase();
        let bytes = normalized.as_bytes();

        if bytes.is_empty() {
            return Err(InvalidTrainCode {
                reason: "empty after trimming",
            });
        }

        if bytes.len() < 2 || bytes.len() > 6 {
            return Err(InvalidTrainCode {
                reason: "must be a category letter plus 1-5 digits",
            });
        }

        if !CATEGORY_LETTERS.contains(&bytes[0]) {
            return Err(InvalidTrainCode {
                reason: "unknown category letter",
            });
        }

        if !bytes[1..].iter().all(u8::is_ascii_digit) {
            return Err(InvalidTrainCode {
                reason: "expected digits after category letter",
            });
        }

        Ok(TrainCode(normalized))
    }

    /// Returns the train code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the category letter (first character).
    pub fn category(&self) -> char {
        self.0.as_bytes()[0] as char
    }
}

impl fmt::Debug for TrainCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TrainCode({})", self.0)
    }
}

impl fmt::Display for TrainCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
