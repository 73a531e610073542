use chrono::{DateTime, NaiveDateTime, Utc};
use common::{DomainError, DomainResult, Location, RawEvent, TelemetryRecord};

/// Normalize one raw event into the canonical telemetry record.
///
/// Schema evolution policy is additive-only and presence-driven: a
/// `location` mapping or a `firmware_version` field marks the V2 shape,
/// everything else is V1. The version is always re-derived from structure;
/// a `schema_version` tag in the input is untrusted and ignored.
///
/// Fails with `DomainError::MalformedEvent` only when the event is
/// structurally unusable: `device_id` absent or not a string, or
/// `timestamp` absent or unparseable. Optional numeric fields that are
/// missing or carry a non-numeric value are absent (never zeroed), so
/// downstream completeness metrics stay accurate. Unrecognized fields are
/// ignored for forward compatibility.
pub fn normalize(raw: &RawEvent) -> DomainResult<TelemetryRecord> {
    let device_id = raw
        .get("device_id")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DomainError::MalformedEvent("missing device_id".to_string()))?
        .to_string();

    let timestamp = raw
        .get("timestamp")
        .and_then(|v| v.as_str())
        .ok_or_else(|| DomainError::MalformedEvent("missing timestamp".to_string()))?;
    let time = parse_timestamp(timestamp)?;

    // Presence of the location key or a V2 extension field marks version 2,
    // even when the coordinates themselves are unusable.
    let has_location = raw.contains_key("location");
    let firmware_version = raw
        .get("firmware_version")
        .and_then(|v| v.as_str())
        .map(str::to_string);
    let schema_version = if has_location || firmware_version.is_some() {
        2
    } else {
        1
    };

    let location = raw
        .get("location")
        .and_then(|v| v.as_object())
        .and_then(|obj| {
            let lat = obj.get("lat").and_then(|v| v.as_f64())?;
            let lon = obj.get("lon").and_then(|v| v.as_f64())?;
            Some(Location { lat, lon })
        });

    Ok(TelemetryRecord {
        device_id,
        time,
        temperature: numeric_field(raw, "temperature"),
        humidity: numeric_field(raw, "humidity"),
        pressure: numeric_field(raw, "pressure"),
        battery_level: numeric_field(raw, "battery_level"),
        location,
        firmware_version,
        schema_version,
        ingestion_time: Utc::now(),
    })
}

fn numeric_field(raw: &RawEvent, name: &str) -> Option<f64> {
    raw.get(name).and_then(|v| v.as_f64())
}

/// Parse an event timestamp into a UTC instant.
///
/// Accepts RFC 3339 (including a bare `Z` suffix) and naive ISO 8601
/// without an offset, which the sample generator emits; naive instants are
/// taken as UTC.
fn parse_timestamp(value: &str) -> DomainResult<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Ok(parsed.with_timezone(&Utc));
    }

    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .map_err(|e| DomainError::MalformedEvent(format!("unparseable timestamp: {e}")))
}
