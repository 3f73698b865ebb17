use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::SourceError;

/// Search performance data lags behind real time by about two days.
pub const REPORTING_LAG_DAYS: i64 = 2;

/// Length of the default reporting window.
pub const WINDOW_DAYS: i64 = 7;

/// Inclusive date range over which metrics are aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, SourceError> {
        if end < start {
            return Err(SourceError::InvalidWindow {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self { start, end })
    }

    /// The 7-day window ending `REPORTING_LAG_DAYS` before `today`.
    pub fn reporting_default(today: NaiveDate) -> Self {
        let end = today - Duration::days(REPORTING_LAG_DAYS);
        Self {
            start: end - Duration::days(WINDOW_DAYS - 1),
            end,
        }
    }

    /// The window of equal length immediately before this one.
    pub fn previous(&self) -> Self {
        let len = self.days();
        let end = self.start - Duration::days(1);
        Self {
            start: end - Duration::days(len - 1),
            end,
        }
    }

    /// Number of days covered, both ends included.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    pub fn start_iso(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_iso(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }
}

impl std::fmt::Display for DateWindow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start_iso(), self.end_iso())
    }
}
