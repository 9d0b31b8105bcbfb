//! Normalizer: provider-native dates and numbers → persisted shapes.
//!
//! Dates are rendered as `"Jan 15, 2024"`. Prices round to whole units,
//! index levels to one decimal, rates/yields stay two-decimal text.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Missing-data marker FRED puts in place of a value.
pub const MISSING_SENTINEL: &str = ".";

pub fn format_date(date: NaiveDate) -> String {
    date.format("%b %-d, %Y").to_string()
}

/// Parse a provider date/time string and drop the time-of-day.
/// Accepts `2024-01-15`, `2024-01-15 16:00:00` and RFC 3339.
pub fn parse_provider_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(dt.date());
    }
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Parse a numeric field that providers ship as a string.
pub fn parse_number(raw: &str) -> Option<f64> {
    let s = raw.trim();
    if s.is_empty() || s == MISSING_SENTINEL {
        return None;
    }
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn round_price(v: f64) -> i64 {
    v.round() as i64
}

pub fn round_index(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

/// Two-decimal text; `None` for the sentinel or anything unparsable.
pub fn format_rate(raw: &str) -> Option<String> {
    parse_number(raw).map(|v| format!("{v:.2}"))
}
