//! Time ranges and paging options for "top N" insights.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Look-back window of an insights query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeRange {
    #[serde(rename = "1_day")]
    OneDay,
    #[serde(rename = "7_day")]
    SevenDays,
    #[serde(rename = "28_day")]
    TwentyEightDays,
}

impl TimeRange {
    pub fn as_str(self) -> &'static str {
        match self {
            TimeRange::OneDay => "1_day",
            TimeRange::SevenDays => "7_day",
            TimeRange::TwentyEightDays => "28_day",
        }
    }

    fn hours(self) -> i64 {
        match self {
            TimeRange::OneDay => 24,
            TimeRange::SevenDays => 7 * 24,
            TimeRange::TwentyEightDays => 28 * 24,
        }
    }

    /// Start of the window in Unix milliseconds, counted back from `now`.
    pub fn start_unix_milli(self, now: DateTime<Utc>) -> i64 {
        (now - Duration::hours(self.hours())).timestamp_millis()
    }
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeRange {
    type Err = DomainError;

    fn from_str(s: &str) -> DomainResult<Self> {
        match s {
            "1_day" => Ok(TimeRange::OneDay),
            "7_day" => Ok(TimeRange::SevenDays),
            "28_day" => Ok(TimeRange::TwentyEightDays),
            other => Err(DomainError::validation(format!(
                "invalid time range: {other}"
            ))),
        }
    }
}

/// Resolved options of one insights page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsightsOptions {
    pub start_unix_milli: i64,
    /// Zero-based page index.
    pub page: usize,
    /// Page size; zero returns every candidate.
    pub per_page: usize,
}

impl InsightsOptions {
    /// Validates raw page arguments and resolves the window start.
    ///
    /// `per_page` above `max_per_page` is rejected, not clamped.
    pub fn new(
        time_range: &str,
        page: i32,
        per_page: i32,
        max_per_page: usize,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let range: TimeRange = time_range.parse()?;
        if page < 0 {
            return Err(DomainError::validation(format!(
                "page {page} must not be negative"
            )));
        }
        if per_page < 0 {
            return Err(DomainError::validation(format!(
                "per_page {per_page} must not be negative"
            )));
        }
        if per_page as usize > max_per_page {
            return Err(DomainError::validation(format!(
                "per_page {per_page} exceeds maximum of {max_per_page}"
            )));
        }
        Ok(Self {
            start_unix_milli: range.start_unix_milli(now),
            page: page as usize,
            per_page: per_page as usize,
        })
    }

    pub fn offset(&self) -> usize {
        self.page * self.per_page
    }

    /// Rows to request: one extra for look-ahead unless unbounded.
    pub fn fetch_limit(&self) -> usize {
        if self.per_page == 0 {
            0
        } else {
            self.per_page + 1
        }
    }
}
