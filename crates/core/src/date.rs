//! Date boundaries for report range filters.
//!
//! Accepted inputs:
//! - `YYYY-MM-DD` (midnight UTC of that day)
//! - RFC 3339 timestamps (offset honoured)
//! - naive `YYYY-MM-DDTHH:MM[:SS]`, read as UTC

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use thiserror::Error;

const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid date '{value}': expected YYYY-MM-DD or an RFC 3339 timestamp")]
pub struct DateParseError {
    pub value: String,
}

/// Parse a range boundary into an instant.
pub fn parse_boundary(value: &str) -> Result<DateTime<Utc>, DateParseError> {
    let trimmed = value.trim();

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return Ok(start_of_day(date));
    }

    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(ts.with_timezone(&Utc));
    }

    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|naive| naive.and_utc())
        .ok_or_else(|| DateParseError {
            value: value.to_string(),
        })
}

pub fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Inclusive `[from, to]` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    /// Build a range; a missing `to` collapses the window onto `from`.
    pub fn new(from: DateTime<Utc>, to: Option<DateTime<Utc>>) -> Self {
        Self {
            from,
            to: to.unwrap_or(from),
        }
    }

    /// Parse both boundaries. `to` is only consulted alongside `from`.
    pub fn parse(from: &str, to: Option<&str>) -> Result<Self, DateParseError> {
        let from = parse_boundary(from)?;
        let to = to.map(parse_boundary).transpose()?;
        Ok(Self::new(from, to))
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.from && ts <= self.to
    }
}
