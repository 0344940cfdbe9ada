//! Calendar dates are plain `YYYY-MM-DD` strings, compared by string
//! equality. Instants are never compared — a reservation made for
//! "2024-06-01" means that calendar day at the venue, whatever timezone a
//! reader happens to be in.

use chrono::{DateTime, Local, NaiveDate};

const DATE_FMT: &str = "%Y-%m-%d";

/// Reduce any stored date value to its canonical `YYYY-MM-DD` form.
///
/// Older documents carry RFC 3339 timestamps; those normalize to the
/// calendar day of the timestamp's own recorded offset — never shifted
/// through UTC, which would move midnight bookings to the previous day.
/// Canonical strings pass through untouched, so this is idempotent.
pub fn normalize(raw: &str) -> String {
    match raw.split_once('T') {
        None => raw.to_string(),
        Some((day, _)) => match DateTime::parse_from_rfc3339(raw) {
            Ok(ts) => ts.date_naive().format(DATE_FMT).to_string(),
            // not a parseable instant — keep the calendar part as-is
            Err(_) => day.to_string(),
        },
    }
}

/// Strict `YYYY-MM-DD` check.
pub fn is_valid(s: &str) -> bool {
    NaiveDate::parse_from_str(s, DATE_FMT).is_ok()
}

pub fn parse(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, DATE_FMT).ok()
}

/// Today as a canonical date string, in the venue's local zone.
pub fn today() -> String {
    Local::now().date_naive().format(DATE_FMT).to_string()
}
