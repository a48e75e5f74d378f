//! Recency cutoff
//!
//! The cutoff is the reference time minus a number of calendar months, using
//! chrono's [`DateTime::checked_sub_months`]. When the target month is
//! shorter, the day is clamped to that month's last day: March 31 minus one
//! month is February 28 (or 29 in a leap year). The time of day is kept.

use chrono::{DateTime, Months, NaiveDate, NaiveDateTime, Utc};

/// Naive layouts accepted besides RFC 3339 and RFC 2822, read as UTC
const NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"];

/// Compute the cutoff for a reference time in epoch milliseconds
///
/// Returns `None` if the reference time is out of chrono's range.
pub fn cutoff_from_millis(now_ms: i64, months: u32) -> Option<DateTime<Utc>> {
    let now = DateTime::<Utc>::from_timestamp_millis(now_ms)?;
    now.checked_sub_months(Months::new(months))
}

/// Parse a feed item's publish date
///
/// Accepts RFC 3339, RFC 2822, `YYYY-MM-DD HH:MM:SS`, `YYYY-MM-DDTHH:MM:SS`
/// and bare `YYYY-MM-DD` (midnight UTC).
pub fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Check whether a publish date falls at or after `cutoff`
///
/// Absent or unparseable dates are never eligible.
pub fn is_recent(published_at: Option<&str>, cutoff: DateTime<Utc>) -> bool {
    published_at
        .and_then(parse_published)
        .is_some_and(|published| published >= cutoff)
}
