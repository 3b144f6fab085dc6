//! Calendar date handling for archive requests.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single calendar day for which data is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestDate(NaiveDate);

impl RequestDate {
    pub fn new(date: NaiveDate) -> Self {
        Self(date)
    }

    /// Build from year/month/day, `None` for an impossible date.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, day).map(Self)
    }

    /// Parse an ISO `YYYY-MM-DD` string.
    pub fn parse(s: &str) -> Result<Self, DateParseError> {
        NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
            .map(Self)
            .map_err(|_| DateParseError::InvalidFormat(s.to_string()))
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    pub fn year(&self) -> i32 {
        self.0.year()
    }

    pub fn month(&self) -> u32 {
        self.0.month()
    }

    pub fn day(&self) -> u32 {
        self.0.day()
    }

    /// Year as sent to the archive (`"2020"`).
    pub fn year_str(&self) -> String {
        format!("{}", self.year())
    }

    /// Zero-padded month (`"06"`).
    pub fn month_str(&self) -> String {
        format!("{:02}", self.month())
    }

    /// Zero-padded day (`"05"`).
    pub fn day_str(&self) -> String {
        format!("{:02}", self.day())
    }

    /// `YYYY-MM-DD`
    pub fn iso(&self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    /// `YYYYMMDD`
    pub fn compact(&self) -> String {
        self.0.format("%Y%m%d").to_string()
    }
}

impl std::fmt::Display for RequestDate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.iso())
    }
}

impl From<NaiveDate> for RequestDate {
    fn from(date: NaiveDate) -> Self {
        Self(date)
    }
}

/// Errors from date parsing.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateParseError {
    #[error("Invalid date (expected YYYY-MM-DD): {0}")]
    InvalidFormat(String),
}
