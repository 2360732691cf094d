//! Event start times as the calendar reported them.

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// When an event starts: a `dateTime` value, or a bare `date` for all-day
/// events.
///
/// The provider's string is kept untouched so the page shows exactly what
/// the calendar returned (`Z` suffixes, fractional seconds and all).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value")]
pub enum EventTime {
    Timed(String),
    AllDay(String),
}

impl EventTime {
    /// Picks the start from the `dateTime`/`date` pair used by calendar APIs.
    ///
    /// A non-empty `dateTime` wins over `date`. Returns `None` when both are
    /// missing or empty.
    pub fn parse(date_time: Option<&str>, date: Option<&str>) -> Option<Self> {
        fn present(value: Option<&str>) -> Option<&str> {
            value.map(str::trim).filter(|v| !v.is_empty())
        }

        if let Some(dt) = present(date_time) {
            return Some(Self::Timed(dt.to_string()));
        }
        present(date).map(|d| Self::AllDay(d.to_string()))
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, Self::AllDay(_))
    }

    /// The value as the provider sent it.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Timed(s) | Self::AllDay(s) => s,
        }
    }

    /// RFC 3339 for timed starts, `YYYY-MM-DD` for all-day ones.
    pub fn is_well_formed(&self) -> bool {
        match self {
            Self::Timed(s) => DateTime::parse_from_rfc3339(s).is_ok(),
            Self::AllDay(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        }
    }
}

impl fmt::Display for EventTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
