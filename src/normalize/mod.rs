//! Normalizers turning raw broker text into canonical `ParsedExecution` records.
//!
//! Two input views of the same fills exist:
//! - `csv_export`: the account-activity CSV (accurate amounts, no times)
//! - `paste`: order history copied from the broker web UI (times, no amounts)
//!
//! Both are pure functions of their input text. Row-level problems are counted
//! in [`Normalized::rejected`]; only structural problems are errors.

use crate::domain::ParsedExecution;
use chrono::NaiveDate;
use thiserror::Error;

pub mod csv_export;
pub mod paste;

pub use csv_export::parse_csv_export;
pub use paste::parse_order_history;

/// Result of normalizing one input document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Normalized {
    pub executions: Vec<ParsedExecution>,
    /// Rows that looked like executions but could not be parsed.
    pub rejected: usize,
}

/// Structural failures: the document is not in the expected format at all.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormalizeError {
    #[error("could not find CSV header row starting with {0}")]
    MissingHeader(&'static str),
    #[error("CSV header is missing required column {0}")]
    MissingColumn(&'static str),
    #[error("csv parse error: {0}")]
    Csv(String),
    #[error("text does not look like tab-separated order history")]
    NotOrderHistory,
}

/// Parse a US-style `MM/DD/YY` (or `MM/DD/YYYY`) date.
pub(crate) fn parse_us_date(s: &str) -> Option<NaiveDate> {
    let mut parts = s.trim().split('/');
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let day: u32 = parts.next()?.trim().parse().ok()?;
    let year: i32 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    // Two-digit years are always 20YY; chrono's `%y` would read 69-99 as 19YY.
    let year = if year < 100 { 2000 + year } else { year };
    NaiveDate::from_ymd_opt(year, month, day)
}
