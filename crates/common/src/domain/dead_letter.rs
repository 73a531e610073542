use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::RawEvent;

/// One event that failed normalization or validation, retained for manual
/// inspection or replay. Owned by the dead-letter log once appended; never
/// updated or deleted by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeadLetterEntry {
    pub raw_event: RawEvent,
    pub reasons: Vec<String>,
    pub occurred_at: DateTime<Utc>,
}

impl DeadLetterEntry {
    /// Tag a failed raw event with its reasons and the ingestion instant
    pub fn new(raw_event: RawEvent, reasons: Vec<String>) -> Self {
        Self {
            raw_event,
            reasons,
            occurred_at: Utc::now(),
        }
    }
}
