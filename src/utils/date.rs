//! Timestamp parsing for heterogeneous source dates.
//!
//! Sources publish dates as RFC 2822 (RSS), RFC 3339 (Atom, JSON APIs) or
//! looser forms. Anything unparseable maps to `None`, never to the epoch.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

const NAIVE_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%b %d, %Y", "%B %d, %Y"];

/// Parse a raw timestamp into UTC. Naive values are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
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
    // RFC 2822 with a textual zone chrono doesn't know, e.g. "... +0000 (UTC)"
    if let Some((head, _)) = raw.split_once(" (") {
        if let Ok(dt) = DateTime::parse_from_rfc2822(head) {
            return Some(dt.with_timezone(&Utc));
        }
    }

    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(naive.and_utc());
        }
    }
    for fmt in NAIVE_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
        }
    }

    None
}

/// Format an optional instant for display in the given timezone.
pub fn format_local(ts: Option<DateTime<Utc>>, tz: Tz) -> String {
    match ts {
        Some(ts) => ts.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string(),
        None => "Unknown Date".to_string(),
    }
}
