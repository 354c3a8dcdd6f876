//! Vendor date handling.
//!
//! The vendor favors `dd-mm-yyyy[ HH:MM:SS]`. That form is tried before any
//! generic parser, since generic parsing would swap day and month for
//! dates like `09-01-2026`. Naive times are taken as UTC.

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};

/// `dd-mm-yyyy HH:MM:SS`, used for `datefrom`/`dateto` query parameters.
pub const VENDOR_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

const DAY_FIRST_DATETIME: [&str; 4] = [
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
];
const DAY_FIRST_DATE: [&str; 2] = ["%d-%m-%Y", "%d/%m/%Y"];

const ISO_DATETIME: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

#[must_use]
pub fn format_vendor_datetime(ts: DateTime<Utc>) -> String {
    ts.format(VENDOR_FORMAT).to_string()
}

/// Parses any date shape the vendor has been seen to return.
///
/// Returns `None` for empty or unrecognized input.
#[must_use]
pub fn parse_vendor_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    parse_day_first(raw)
        .or_else(|| parse_dotnet_date(raw))
        .or_else(|| parse_generic(raw))
}

fn parse_day_first(raw: &str) -> Option<DateTime<Utc>> {
    DAY_FIRST_DATETIME
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            DAY_FIRST_DATE
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// `/Date(1767967440000)/`, optionally with a `+hhmm` suffix that is ignored
/// because the millisecond count is already UTC.
fn parse_dotnet_date(raw: &str) -> Option<DateTime<Utc>> {
    let inner = raw.strip_prefix("/Date(")?.strip_suffix(")/")?;
    let digits_end = inner
        .char_indices()
        .skip(1)
        .find(|(_, c)| *c == '+' || *c == '-')
        .map_or(inner.len(), |(i, _)| i);
    let millis: i64 = inner[..digits_end].parse().ok()?;
    Utc.timestamp_millis_opt(millis).single()
}

fn parse_generic(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    ISO_DATETIME
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .map(|naive| Utc.from_utc_datetime(&naive))
}
