//! Database query modules
//!
//! One module per table, free async functions taking a pool reference.
//! Timestamps are stored as RFC 3339 TEXT, dates as `%Y-%m-%d` TEXT, and
//! amounts as canonical decimal TEXT.

pub mod audits;
pub mod checks;
pub mod distributions;
pub mod workflows;

use chrono::{DateTime, NaiveDate, Utc};
use profitshare_common::{Error, Result};
use rust_decimal::Decimal;
use std::str::FromStr;

pub(crate) fn parse_decimal(column: &str, raw: &str) -> Result<Decimal> {
    Decimal::from_str(raw)
        .map_err(|e| Error::Internal(format!("Failed to parse {} '{}': {}", column, raw, e)))
}

pub(crate) fn parse_timestamp(column: &str, raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("Failed to parse {} '{}': {}", column, raw, e)))
}

pub(crate) fn parse_date(column: &str, raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| Error::Internal(format!("Failed to parse {} '{}': {}", column, raw, e)))
}
