//! Conversions between PocketBase timestamps, UTC instants and Discord markup.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use crate::error::{Result, ShiftError};

/// Parse a PocketBase timestamp. Accepts `2024-01-01 10:00:00.000Z`,
/// `2024-01-01T10:00:00Z`, explicit offsets, and offset-less values (read as UTC).
pub fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ShiftError::timestamp(
            "PocketBase did not return a timestamp for this shift.",
        ));
    }

    let normalized = value.replacen(' ', "T", 1);
    if let Ok(parsed) = DateTime::parse_from_rfc3339(&normalized) {
        return Ok(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(Utc.from_utc_datetime(&naive));
    }

    Err(ShiftError::timestamp(
        "Received an unexpected timestamp format from PocketBase.",
    ))
}

/// Format an instant the way PocketBase stores dates: RFC 3339, milliseconds, `Z`.
pub fn format_pocketbase(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Absolute and relative Discord timestamp markup.
pub fn format_discord(dt: DateTime<Utc>) -> String {
    let ts = dt.timestamp();
    format!("<t:{}:F> (<t:{}:R>)", ts, ts)
}
