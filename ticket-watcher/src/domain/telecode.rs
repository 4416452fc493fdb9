//! Station code types.

use std::fmt;

/// Error returned when parsing an invalid station telecode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid station telecode: {reason}")]
pub struct InvalidTelecode {
    reason: &'static str,
}

/// A valid 3-letter station telecode.
///
/// The booking query API identifies stations by 3 uppercase ASCII
/// letters (e.g. `BJP` for Beijing, `SHH` for Shanghai Hongqiao). This
/// type guarantees that any `Telecode` value is valid by construction.
///
/// # Examples
///
/// ```
/// use ticket_watcher::domain::Telecode;
///
/// let bjp = Telecode::parse("BJP").unwrap();
/// assert_eq!(bjp.as_str(), "BJP");
///
/// // Lowercase is rejected
/// assert!(Telecode::parse("bjp").is_err());
///
/// // Wrong length is rejected
/// assert!(Telecode::parse("BJ").is_err());
/// assert!(Telecode::parse("BJPX").is_err());
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Telecode([u8; 3]);

impl Telecode {
    /// Parse a telecode from a string.
    ///
    /// The input must be exactly 3 uppercase ASCII letters (A-Z).
    pub fn parse(s: &str) -> Result<Self, InvalidTelecode> {
        let bytes = s.as_bytes();

        if bytes.len() != 3 {
            return Err(InvalidTelecode {
                reason: "must be exactly 3 characters",
            });
        }

        for &b in bytes {
            if !b.is_ascii_uppercase() {
                return Err(InvalidTelecode {
                    reason: "must be uppercase ASCII letters A-Z",
                });
            }
        }

        Ok(Telecode([bytes[0], bytes[1], bytes[2]]))
    }

    /// Returns the telecode as a string slice.
    pub fn as_str(&self) -> &str {
        // SAFETY: We only store valid ASCII uppercase letters
        std::str::from_utf8(&self.0).unwrap()
    }
}

impl fmt::Debug for Telecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Telecode({})", self.as_str())
    }
}

impl fmt::Display for Telecode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
