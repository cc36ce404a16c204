pub mod summary;

pub use summary::{DailySummary, MetricSummary};

use std::fmt;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::store::Row;

/// Display format of the date cell, e.g. `01/03/2024`.
pub const DATE_FORMAT: &str = "%d/%m/%Y";
/// Display format of the time cell, e.g. `07:05:00`.
pub const TIME_FORMAT: &str = "%H:%M:%S";

/// Marker values written instead of timings when an endpoint could not be loaded.
pub const SENTINEL_BACKEND: &str = "Błąd";
pub const SENTINEL_FRONTEND: &str = "Brak";
pub const SENTINEL_TOTAL: &str = "połączenia";

// ─── Raw trial ───────────────────────────────────────────────────

/// One unreduced page load, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawTrial {
    /// Request sent → first byte received
    pub backend_secs: f64,
    /// First byte received → load complete
    pub frontend_secs: f64,
    /// Request sent → load complete
    pub total_secs: f64,
}

impl RawTrial {
    pub fn new(backend_secs: f64, frontend_secs: f64, total_secs: f64) -> Self {
        Self {
            backend_secs,
            frontend_secs,
            total_secs,
        }
    }

    /// Build a trial from the two marks measured relative to the moment
    /// the request was sent.
    pub fn from_marks(first_byte: Duration, load_complete: Duration) -> Self {
        let backend = first_byte.as_secs_f64();
        let total = load_complete.as_secs_f64();
        Self::new(backend, (total - backend).max(0.0), total)
    }

    /// Same trial with every field rounded to milliseconds.
    pub fn rounded(self) -> Self {
        Self::new(
            round_millis(self.backend_secs),
            round_millis(self.frontend_secs),
            round_millis(self.total_secs),
        )
    }
}

fn round_millis(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}

// ─── Reading ─────────────────────────────────────────────────────

/// Value of one timing cell: a measured duration or a failure marker.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Seconds(f64),
    Marker(String),
}

impl Reading {
    pub fn seconds(&self) -> Option<f64> {
        match self {
            Self::Seconds(s) => Some(*s),
            Self::Marker(_) => None,
        }
    }

    /// Parse a stored cell back; anything that is not a number is a marker.
    pub fn parse(cell: &str) -> Self {
        match cell.trim().parse::<f64>() {
            Ok(s) if s.is_finite() => Self::Seconds(s),
            _ => Self::Marker(cell.to_string()),
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Seconds(s) => write!(f, "{s}"),
            Self::Marker(m) => f.write_str(m),
        }
    }
}

// ─── Observation ─────────────────────────────────────────────────

/// One reduced measurement of one endpoint, as persisted in its history.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub endpoint: String,
    pub backend: Reading,
    pub frontend: Reading,
    pub total: Reading,
}

impl Observation {
    /// All three readings come from the one trial passed in.
    pub fn from_trial(endpoint: &str, taken_at: NaiveDateTime, trial: RawTrial) -> Self {
        Self {
            date: taken_at.date(),
            time: taken_at.time(),
            endpoint: endpoint.to_string(),
            backend: Reading::Seconds(trial.backend_secs),
            frontend: Reading::Seconds(trial.frontend_secs),
            total: Reading::Seconds(trial.total_secs),
        }
    }

    /// Outage marker recorded when the endpoint was unreachable or a probe failed.
    pub fn unreachable(endpoint: &str, failed_at: NaiveDateTime) -> Self {
        Self {
            date: failed_at.date(),
            time: failed_at.time(),
            endpoint: endpoint.to_string(),
            backend: Reading::Marker(SENTINEL_BACKEND.into()),
            frontend: Reading::Marker(SENTINEL_FRONTEND.into()),
            total: Reading::Marker(SENTINEL_TOTAL.into()),
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.total.seconds().is_none()
    }

    /// Cells in fixed column order: date, time, endpoint, backend, frontend, total.
    pub fn to_row(&self) -> Row {
        vec![
            self.date.format(DATE_FORMAT).to_string(),
            self.time.format(TIME_FORMAT).to_string(),
            self.endpoint.clone(),
            self.backend.to_string(),
            self.frontend.to_string(),
            self.total.to_string(),
        ]
    }
}

/// Parse a date cell written with [`DATE_FORMAT`].
pub fn parse_date(cell: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(cell.trim(), DATE_FORMAT)
}
