//! Text column helpers.
//!
//! Amounts, dates and timestamps are stored as TEXT. Reads are tolerant: a
//! malformed value is logged and replaced so one bad row never fails a whole
//! listing.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use rust_decimal::Decimal;
use std::str::FromStr;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

pub fn parse_decimal(value: &str, field_name: &str) -> Decimal {
    Decimal::from_str(value)
        .or_else(|_| Decimal::from_scientific(value))
        .unwrap_or_else(|e| {
            log::error!(
                "Failed to parse {} '{}': {}. Falling back to ZERO.",
                field_name,
                value,
                e
            );
            Decimal::ZERO
        })
}

pub fn parse_date(value: &str, field_name: &str) -> Option<NaiveDate> {
    match NaiveDate::parse_from_str(value, DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            log::error!("Failed to parse {} '{}': {}", field_name, value, e);
            None
        }
    }
}

pub fn parse_optional_date(value: Option<&str>, field_name: &str) -> Option<NaiveDate> {
    value.and_then(|v| parse_date(v, field_name))
}

pub fn parse_timestamp(value: &str, field_name: &str) -> Option<DateTime<Utc>> {
    match DateTime::parse_from_rfc3339(value) {
        Ok(ts) => Some(ts.with_timezone(&Utc)),
        Err(e) => {
            log::error!("Failed to parse {} '{}': {}", field_name, value, e);
            None
        }
    }
}

pub fn parse_optional_timestamp(value: Option<&str>, field_name: &str) -> Option<DateTime<Utc>> {
    value.and_then(|v| parse_timestamp(v, field_name))
}

/// Bookkeeping timestamps fall back to "now" when unreadable.
pub fn parse_timestamp_or_now(value: &str, field_name: &str) -> DateTime<Utc> {
    parse_timestamp(value, field_name).unwrap_or_else(Utc::now)
}

/// Small non-negative columns (days, months, hours) stored as INTEGER.
pub fn to_u32(value: i32) -> Option<u32> {
    u32::try_from(value).ok()
}
