//! Run parameters: what to watch and how hard to poll.
//!
//! Parameters come from a TOML file supplied by the caller. The raw
//! file shape ([`RunParams`]) is validated up front into a typed
//! [`WatchPlan`]; every configuration problem is fatal before the first
//! poll, never silently defaulted mid-run. Credentials (session cookie,
//! robot token) come from the environment, not from this file.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone};
use rand::Rng;
use serde::Deserialize;
use tracing::warn;

use crate::domain::{
    DepartTime, FareClass, InvalidTelecode, InvalidTrainCode, Telecode, TimeError, TimeWindow,
    TrainCode,
};
use crate::selector::Policy;

/// Errors from loading or validating run parameters.
#[derive(Debug, thiserror::Error)]
pub enum ParamsError {
    #[error("failed to read parameters file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse parameters file: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("exactly one of train_code or window must be set")]
    NoStrategy,

    #[error("train_code and window are mutually exclusive")]
    BothStrategies,

    #[error("invalid target train code: {0}")]
    Target(#[source] InvalidTrainCode),

    #[error("invalid window {which} bound: {source}")]
    WindowBound {
        which: &'static str,
        #[source]
        source: TimeError,
    },

    #[error("invalid {which} station: {source}")]
    Station {
        which: &'static str,
        #[source]
        source: InvalidTelecode,
    },

    #[error("invalid travel date {value:?}: expected YYYY-MM-DD")]
    TravelDate { value: String },

    #[error("invalid booking_open {value:?}: expected YYYY-MM-DD HH:MM:SS local time")]
    BookingOpen { value: String },

    #[error("refresh delay range must be 0 <= min <= max, got {min}..{max} seconds")]
    DelayRange { min: f64, max: f64 },
}

/// Raw time window as written in the parameters file.
#[derive(Debug, Clone, Deserialize)]
pub struct RawWindow {
    pub start: String,
    pub end: String,
}

/// Raw refresh delay bounds in seconds.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RawDelay {
    #[serde(default = "default_min_delay")]
    pub min_secs: f64,
    #[serde(default = "default_max_delay")]
    pub max_secs: f64,
}

impl Default for RawDelay {
    fn default() -> Self {
        Self {
            min_secs: default_min_delay(),
            max_secs: default_max_delay(),
        }
    }
}

fn default_min_delay() -> f64 {
    2.0
}

fn default_max_delay() -> f64 {
    4.0
}

/// Run parameters as they appear in the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct RunParams {
    /// Origin station telecode.
    pub from_station: String,

    /// Destination station telecode.
    pub to_station: String,

    /// Travel date, YYYY-MM-DD.
    pub travel_date: String,

    #[serde(default)]
    pub fare_class: FareClass,

    /// Rider name, echoed in status reports.
    #[serde(default)]
    pub rider: Option<String>,

    /// Seat category, echoed in status reports.
    #[serde(default)]
    pub seat_category: Option<String>,

    /// Target train code; mutually exclusive with `window`.
    #[serde(default)]
    pub train_code: Option<String>,

    /// Departure time window; mutually exclusive with `train_code`.
    #[serde(default)]
    pub window: Option<RawWindow>,

    /// When booking opens, YYYY-MM-DD HH:MM:SS local time. If set and
    /// in the future the watcher suspends until then before polling.
    #[serde(default)]
    pub booking_open: Option<String>,

    /// Attempt budget; 0 means unbounded.
    #[serde(default)]
    pub max_attempts: u32,

    #[serde(default)]
    pub refresh_delay: RawDelay,
}

impl RunParams {
    /// Load raw parameters from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ParamsError> {
        let text = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&text)?)
    }

    /// Validate into a typed plan, surfacing every configuration error
    /// before a run starts.
    pub fn validate(&self) -> Result<WatchPlan, ParamsError> {
        let from = Telecode::parse(&self.from_station)
            .map_err(|source| ParamsError::Station { which: "from", source })?;
        let to = Telecode::parse(&self.to_station)
            .map_err(|source| ParamsError::Station { which: "to", source })?;

        let travel_date = NaiveDate::parse_from_str(&self.travel_date, "%Y-%m-%d")
            .map_err(|_| ParamsError::TravelDate {
                value: self.travel_date.clone(),
            })?;

        let strategy = match (&self.train_code, &self.window) {
            (Some(_), Some(_)) => return Err(ParamsError::BothStrategies),
            (None, None) => return Err(ParamsError::NoStrategy),
            (Some(code), None) => {
                Policy::ByTrainCode(TrainCode::parse(code).map_err(ParamsError::Target)?)
            }
            (None, Some(raw)) => {
                let start = DepartTime::parse_hhmm(&raw.start).map_err(|source| {
                    ParamsError::WindowBound {
                        which: "start",
                        source,
                    }
                })?;
                let end = DepartTime::parse_hhmm(&raw.end).map_err(|source| {
                    ParamsError::WindowBound {
                        which: "end",
                        source,
                    }
                })?;
                let window = TimeWindow::new(start, end);
                if window.is_inverted() {
                    // Accepted for compatibility with the tool this
                    // replaces: such a window simply never matches.
                    warn!(%window, "window start is after end; no departure can match");
                }
                Policy::ByWindow(window)
            }
        };

        let booking_open = match &self.booking_open {
            None => None,
            Some(raw) => Some(parse_booking_open(raw)?),
        };

        let refresh_delay =
            DelayRange::new(self.refresh_delay.min_secs, self.refresh_delay.max_secs)?;

        Ok(WatchPlan {
            from,
            to,
            travel_date,
            fare: self.fare_class,
            rider: self.rider.clone(),
            seat_category: self.seat_category.clone(),
            strategy,
            max_attempts: self.max_attempts,
            refresh_delay,
            booking_open,
        })
    }
}

fn parse_booking_open(raw: &str) -> Result<DateTime<Local>, ParamsError> {
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map_err(|_| {
        ParamsError::BookingOpen {
            value: raw.to_string(),
        }
    })?;
    Local
        .from_local_datetime(&naive)
        .single()
        .ok_or_else(|| ParamsError::BookingOpen {
            value: raw.to_string(),
        })
}

/// Bounds for the randomized delay between attempts.
///
/// Each wait is drawn uniformly from `[min, max]` so the polling
/// cadence has no fixed, detectable interval.
#[derive(Debug, Clone, Copy)]
pub struct DelayRange {
    min_secs: f64,
    max_secs: f64,
}

impl DelayRange {
    /// Create a range; requires `0 <= min <= max` and finite bounds.
    pub fn new(min_secs: f64, max_secs: f64) -> Result<Self, ParamsError> {
        let valid = min_secs.is_finite()
            && max_secs.is_finite()
            && min_secs >= 0.0
            && min_secs <= max_secs;
        if !valid {
            return Err(ParamsError::DelayRange {
                min: min_secs,
                max: max_secs,
            });
        }
        Ok(Self { min_secs, max_secs })
    }

    /// Draw one delay uniformly at random from the range.
    pub fn sample(&self) -> Duration {
        let secs = if self.max_secs > self.min_secs {
            rand::thread_rng().gen_range(self.min_secs..=self.max_secs)
        } else {
            self.min_secs
        };
        Duration::from_secs_f64(secs)
    }

    /// Lower bound in seconds.
    pub fn min_secs(&self) -> f64 {
        self.min_secs
    }

    /// Upper bound in seconds.
    pub fn max_secs(&self) -> f64 {
        self.max_secs
    }
}

/// A validated monitoring plan, immutable for the whole run.
#[derive(Debug, Clone)]
pub struct WatchPlan {
    pub from: Telecode,
    pub to: Telecode,
    pub travel_date: NaiveDate,
    pub fare: FareClass,
    pub rider: Option<String>,
    pub seat_category: Option<String>,
    pub strategy: Policy,
    /// Attempt budget; 0 means unbounded.
    pub max_attempts: u32,
    pub refresh_delay: DelayRange,
    pub booking_open: Option<DateTime<Local>>,
}
