use chrono::{Duration, Utc};
use common::{TelemetryRecord, ValidationVerdict};

/// Field-level contract thresholds, passed in at construction time.
///
/// Defaults mirror the deployed sensor fleet's physical ranges. The
/// retention horizon is disabled by default: how far back replayed data is
/// allowed to reach is an operational decision, not a fixed constant.
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    pub temperature_min: f64,
    pub temperature_max: f64,
    pub humidity_min: f64,
    pub humidity_max: f64,
    pub pressure_min: f64,
    pub pressure_max: f64,
    pub battery_min: f64,
    pub battery_max: f64,
    /// How far into the future a timestamp may drift before rejection
    pub max_future_drift: Duration,
    /// Oldest acceptable timestamp, measured back from now; `None` disables
    /// the lower bound
    pub retention_horizon: Option<Duration>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            temperature_min: -50.0,
            temperature_max: 100.0,
            humidity_min: 0.0,
            humidity_max: 100.0,
            pressure_min: 800.0,
            pressure_max: 1200.0,
            battery_min: 0.0,
            battery_max: 100.0,
            max_future_drift: Duration::minutes(5),
            retention_horizon: None,
        }
    }
}

pub const REASON_MISSING_DEVICE_ID: &str = "missing_device_id";
pub const REASON_TIMESTAMP_OUT_OF_RANGE: &str = "timestamp_out_of_range";
pub const REASON_TEMPERATURE_OUT_OF_RANGE: &str = "temperature_out_of_range";
pub const REASON_HUMIDITY_OUT_OF_RANGE: &str = "humidity_out_of_range";
pub const REASON_PRESSURE_OUT_OF_RANGE: &str = "pressure_out_of_range";
pub const REASON_BATTERY_OUT_OF_RANGE: &str = "battery_out_of_range";
pub const REASON_LOCATION_OUT_OF_RANGE: &str = "location_out_of_range";

/// Applies field-presence and range rules to canonical records.
///
/// Validation is infallible: every outcome is a verdict, never an error.
/// All rules are evaluated without short-circuiting so the reason list is
/// complete, and absent optional fields never produce a reason.
#[derive(Debug, Clone)]
pub struct QualityValidator {
    config: ValidationConfig,
}

impl QualityValidator {
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    pub fn validate(&self, record: TelemetryRecord) -> ValidationVerdict {
        let mut reasons = Vec::new();

        if record.device_id.is_empty() {
            reasons.push(REASON_MISSING_DEVICE_ID.to_string());
        }

        let now = Utc::now();
        let too_far_ahead = record.time > now + self.config.max_future_drift;
        let too_old = self
            .config
            .retention_horizon
            .is_some_and(|horizon| record.time < now - horizon);
        if too_far_ahead || too_old {
            reasons.push(REASON_TIMESTAMP_OUT_OF_RANGE.to_string());
        }

        if out_of_range(
            record.temperature,
            self.config.temperature_min,
            self.config.temperature_max,
        ) {
            reasons.push(REASON_TEMPERATURE_OUT_OF_RANGE.to_string());
        }

        if out_of_range(
            record.humidity,
            self.config.humidity_min,
            self.config.humidity_max,
        ) {
            reasons.push(REASON_HUMIDITY_OUT_OF_RANGE.to_string());
        }

        if out_of_range(
            record.pressure,
            self.config.pressure_min,
            self.config.pressure_max,
        ) {
            reasons.push(REASON_PRESSURE_OUT_OF_RANGE.to_string());
        }

        if out_of_range(
            record.battery_level,
            self.config.battery_min,
            self.config.battery_max,
        ) {
            reasons.push(REASON_BATTERY_OUT_OF_RANGE.to_string());
        }

        if let Some(location) = record.location {
            let lat_ok = (-90.0..=90.0).contains(&location.lat);
            let lon_ok = (-180.0..=180.0).contains(&location.lon);
            if !lat_ok || !lon_ok {
                reasons.push(REASON_LOCATION_OUT_OF_RANGE.to_string());
            }
        }

        ValidationVerdict { record, reasons }
    }
}

fn out_of_range(value: Option<f64>, min: f64, max: f64) -> bool {
    value.is_some_and(|v| v < min || v > max)
}
