use serde::Serialize;

/// A failure from one storage sink while persisting a batch.
///
/// Captured and surfaced, never interpreted: retry and alerting decisions
/// belong to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkError {
    pub sink: String,
    pub message: String,
}

/// Summary of one processed batch, immutable after creation.
///
/// `rejected` counts records that normalized but failed validation;
/// `malformed` counts raw events that never reached the validator.
/// `accepted + rejected + malformed == attempted` always holds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchResult {
    pub attempted: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub malformed: usize,
    pub sink_errors: Vec<SinkError>,
}

/// Monotonically increasing running totals across batches.
///
/// The only state the stream processor carries between batches; no batch
/// depends on another's outcome.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineTotals {
    pub batches: u64,
    pub attempted: u64,
    pub accepted: u64,
    pub rejected: u64,
    pub malformed: u64,
    pub sink_errors: u64,
}

impl PipelineTotals {
    pub fn observe(&mut self, result: &BatchResult) {
        self.batches += 1;
        self.attempted += result.attempted as u64;
        self.accepted += result.accepted as u64;
        self.rejected += result.rejected as u64;
        self.malformed += result.malformed as u64;
        self.sink_errors += result.sink_errors.len() as u64;
    }
}
