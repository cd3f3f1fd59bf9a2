pub mod account;
pub mod interaction;
pub mod kpi;
pub mod note;
pub mod ticket;

use chrono::{NaiveDate, NaiveDateTime};

/// Parses the timestamp shapes found in account exports: RFC 3339, `YYYY-MM-DD HH:MM:SS`
/// (optionally with fractional seconds) and bare dates.
pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(parsed) = chrono::DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.naive_utc());
    }

    for format in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Lowercase, space-to-underscore form of a client name used to match note sources.
pub fn client_slug(client_name: &str) -> String {
    client_name.to_lowercase().replace(' ', "_")
}
