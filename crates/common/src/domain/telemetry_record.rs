use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Untyped event mapping as received from the ingestion source.
///
/// No invariants hold here; the mapping may be missing required fields or
/// carry values of the wrong type. The event model is the only component
/// allowed to interpret it.
pub type RawEvent = serde_json::Map<String, serde_json::Value>;

/// Geographic position carried by version 2 events
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

/// The canonical normalized telemetry reading.
///
/// Exactly one of these exists per successfully normalized raw event,
/// independent of which raw shape (V1 or V2) produced it. Constructed by
/// the event model, consumed by the validator and the sinks, never mutated.
/// `schema_version` is always re-derived from the raw input's structure;
/// a version tag supplied by the source is never trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    pub device_id: String,
    pub time: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub battery_level: Option<f64>,
    pub location: Option<Location>,
    pub firmware_version: Option<String>,
    pub schema_version: i32,
    pub ingestion_time: DateTime<Utc>,
}

/// Outcome of validating a single record.
///
/// Validation never fails as an operation; every rule violation is a reason
/// string and the record is valid iff no rule produced one. The verdict is
/// consumed immediately by the stream processor for routing and is not
/// persisted itself.
#[derive(Debug, Clone)]
pub struct ValidationVerdict {
    pub record: TelemetryRecord,
    pub reasons: Vec<String>,
}

impl ValidationVerdict {
    pub fn is_valid(&self) -> bool {
        self.reasons.is_empty()
    }
}
