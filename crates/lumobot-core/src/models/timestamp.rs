//! Ordering for `indexedAt` style timestamps.
//!
//! The network emits both `2024-01-02T00:00:00Z` and `2024-01-02T00:00:00.000Z`
//! for the same instant, which do not compare correctly as plain strings. Values
//! that parse as RFC 3339 are compared as instants; anything else falls back to
//! lexical order so a malformed value still sorts deterministically.

use std::cmp::Ordering;

use chrono::{DateTime, Utc};

fn parse(ts: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(ts)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub fn compare(a: &str, b: &str) -> Ordering {
    match (parse(a), parse(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        _ => a.cmp(b),
    }
}

/// True if `ts` parses as an RFC 3339 instant
pub fn is_valid(ts: &str) -> bool {
    parse(ts).is_some()
}

/// Strictly later. Ties are not "after".
pub fn is_after(candidate: &str, reference: &str) -> bool {
    compare(candidate, reference) == Ordering::Greater
}

/// True if `candidate` is past the cursor, or there is no cursor yet
pub fn is_after_cursor(candidate: &str, cursor: Option<&str>) -> bool {
    cursor.map_or(true, |c| is_after(candidate, c))
}

/// Current time in the `createdAt` format the network expects
pub fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
