use std::sync::Arc;

use common::{
    AnalyticalSink, BatchResult, DeadLetterEntry, DeadLetterSink, OperationalSink, PipelineTotals,
    RawEvent, SinkError, TelemetryRecord,
};
use tracing::{debug, info, instrument, warn};

use crate::domain::{normalize, QualityValidator};

pub const REASON_MALFORMED: &str = "malformed";

pub const OPERATIONAL_SINK_NAME: &str = "operational";
pub const ANALYTICAL_SINK_NAME: &str = "analytical";

/// The stream-processing engine.
///
/// Consumes batches of raw events, normalizes and validates them, routes
/// valid/invalid records, and coordinates the dual-write with
/// partial-failure isolation. Stateless across batches except for the
/// monotone running totals; batches are processed strictly sequentially.
pub struct StreamProcessor {
    validator: QualityValidator,
    operational: Arc<dyn OperationalSink>,
    analytical: Arc<dyn AnalyticalSink>,
    dead_letter: Arc<dyn DeadLetterSink>,
    totals: PipelineTotals,
}

impl StreamProcessor {
    pub fn new(
        validator: QualityValidator,
        operational: Arc<dyn OperationalSink>,
        analytical: Arc<dyn AnalyticalSink>,
        dead_letter: Arc<dyn DeadLetterSink>,
    ) -> Self {
        Self {
            validator,
            operational,
            analytical,
            dead_letter,
            totals: PipelineTotals::default(),
        }
    }

    /// Process one batch of raw events end to end.
    ///
    /// Data-quality conditions never fail this call: malformed events and
    /// validation rejections are routed to the dead-letter log, and sink
    /// failures are recorded in the returned summary. The two store writes
    /// are deliberately independent (at-least-one-of-two-stores durability);
    /// a failure in one neither rolls back nor blocks the other. Duplicate
    /// suppression on re-processing is the operational sink's upsert key.
    #[instrument(skip(self, raw_events), fields(batch_size = raw_events.len()))]
    pub async fn process_batch(&mut self, raw_events: Vec<RawEvent>) -> BatchResult {
        let attempted = raw_events.len();
        let mut accepted: Vec<TelemetryRecord> = Vec::with_capacity(attempted);
        let mut dead_lettered: Vec<DeadLetterEntry> = Vec::new();
        let mut rejected = 0usize;
        let mut malformed = 0usize;

        for raw in raw_events {
            match normalize(&raw) {
                Ok(record) => {
                    let verdict = self.validator.validate(record);
                    if verdict.is_valid() {
                        accepted.push(verdict.record);
                    } else {
                        debug!(
                            device_id = %verdict.record.device_id,
                            reasons = ?verdict.reasons,
                            "record failed validation"
                        );
                        dead_lettered.push(DeadLetterEntry::new(raw, verdict.reasons));
                        rejected += 1;
                    }
                }
                Err(e) => {
                    debug!(error = %e, "event failed normalization");
                    dead_lettered.push(DeadLetterEntry::new(
                        raw,
                        vec![REASON_MALFORMED.to_string()],
                    ));
                    malformed += 1;
                }
            }
        }

        let mut sink_errors = Vec::new();
        if !accepted.is_empty() {
            match self.operational.write_batch(&accepted).await {
                Ok(write) => debug!(inserted = write.inserted, "operational store write complete"),
                Err(e) => sink_errors.push(SinkError {
                    sink: OPERATIONAL_SINK_NAME.to_string(),
                    message: e.to_string(),
                }),
            }

            match self.analytical.write_batch(&accepted).await {
                Ok(write) => debug!(written = write.written, "analytical store write complete"),
                Err(e) => sink_errors.push(SinkError {
                    sink: ANALYTICAL_SINK_NAME.to_string(),
                    message: e.to_string(),
                }),
            }
        }

        if !dead_lettered.is_empty() {
            // Best-effort: a dead-letter failure is logged, never retried
            if let Err(e) = self.dead_letter.append(&dead_lettered).await {
                warn!(error = %e, entries = dead_lettered.len(), "dead-letter append failed");
            }
        }

        let result = BatchResult {
            attempted,
            accepted: accepted.len(),
            rejected,
            malformed,
            sink_errors,
        };
        self.totals.observe(&result);

        info!(
            attempted = result.attempted,
            accepted = result.accepted,
            rejected = result.rejected,
            malformed = result.malformed,
            sink_errors = result.sink_errors.len(),
            "batch processed"
        );

        result
    }

    /// Running totals across all batches processed so far
    pub fn totals(&self) -> PipelineTotals {
        self.totals
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ValidationConfig, REASON_MISSING_DEVICE_ID, REASON_TEMPERATURE_OUT_OF_RANGE,
    };
    use common::{
        AnalyticalWrite, DomainError, MockAnalyticalSink, MockDeadLetterSink, MockOperationalSink,
        OperationalWrite,
    };
    use serde_json::json;

    fn raw(value: serde_json::Value) -> RawEvent {
        value.as_object().unwrap().clone()
    }

    fn valid_v1(device_id: &str) -> RawEvent {
        raw(json!({
            "timestamp": "2024-06-01T12:00:00Z",
            "device_id": device_id,
            "temperature": 22.5,
            "humidity": 55.0,
            "pressure": 1005.0,
            "battery_level": 90.0
        }))
    }

    fn processor(
        operational: MockOperationalSink,
        analytical: MockAnalyticalSink,
        dead_letter: MockDeadLetterSink,
    ) -> StreamProcessor {
        StreamProcessor::new(
            QualityValidator::new(ValidationConfig::default()),
            Arc::new(operational),
            Arc::new(analytical),
            Arc::new(dead_letter),
        )
    }

    fn sinks_never_called() -> (MockOperationalSink, MockAnalyticalSink) {
        let mut operational = MockOperationalSink::new();
        operational.expect_write_batch().times(0);
        let mut analytical = MockAnalyticalSink::new();
        analytical.expect_write_batch().times(0);
        (operational, analytical)
    }

    #[tokio::test]
    async fn test_all_valid_batch_writes_both_sinks_once() {
        // Scenario A: 3 valid V1 events
        let mut operational = MockOperationalSink::new();
        operational
            .expect_write_batch()
            .withf(|records: &[TelemetryRecord]| records.len() == 3)
            .times(1)
            .returning(|records| Ok(OperationalWrite {
                inserted: records.len() as u64,
            }));

        let mut analytical = MockAnalyticalSink::new();
        analytical
            .expect_write_batch()
            .withf(|records: &[TelemetryRecord]| records.len() == 3)
            .times(1)
            .returning(|records| Ok(AnalyticalWrite {
                written: records.len() as u64,
            }));

        let mut dead_letter = MockDeadLetterSink::new();
        dead_letter.expect_append().times(0);

        let mut processor = processor(operational, analytical, dead_letter);
        let batch = vec![valid_v1("a"), valid_v1("b"), valid_v1("c")];

        let result = processor.process_batch(batch).await;

        assert_eq!(result.attempted, 3);
        assert_eq!(result.accepted, 3);
        assert_eq!(result.rejected, 0);
        assert_eq!(result.malformed, 0);
        assert!(result.sink_errors.is_empty());
    }

    #[tokio::test]
    async fn test_missing_device_id_routed_to_dead_letter() {
        // Scenario B: one of five events has an empty device_id
        let mut operational = MockOperationalSink::new();
        operational
            .expect_write_batch()
            .withf(|records: &[TelemetryRecord]| records.len() == 4)
            .times(1)
            .returning(|records| Ok(OperationalWrite {
                inserted: records.len() as u64,
            }));

        let mut analytical = MockAnalyticalSink::new();
        analytical
            .expect_write_batch()
            .times(1)
            .returning(|records| Ok(AnalyticalWrite {
                written: records.len() as u64,
            }));

        let mut dead_letter = MockDeadLetterSink::new();
        dead_letter
            .expect_append()
            .withf(|entries: &[DeadLetterEntry]| {
                entries.len() == 1 && entries[0].reasons == vec![REASON_MISSING_DEVICE_ID]
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut processor = processor(operational, analytical, dead_letter);
        let batch = vec![
            valid_v1("a"),
            valid_v1("b"),
            valid_v1(""),
            valid_v1("c"),
            valid_v1("d"),
        ];

        let result = processor.process_batch(batch).await;

        assert_eq!(result.attempted, 5);
        assert_eq!(result.accepted, 4);
        assert_eq!(result.rejected, 1);
        assert_eq!(result.malformed, 0);
    }

    #[tokio::test]
    async fn test_out_of_range_temperature_rejected_with_reason() {
        // Scenario C
        let mut operational = MockOperationalSink::new();
        operational
            .expect_write_batch()
            .times(1)
            .returning(|records| Ok(OperationalWrite {
                inserted: records.len() as u64,
            }));
        let mut analytical = MockAnalyticalSink::new();
        analytical
            .expect_write_batch()
            .times(1)
            .returning(|records| Ok(AnalyticalWrite {
                written: records.len() as u64,
            }));

        let mut dead_letter = MockDeadLetterSink::new();
        dead_letter
            .expect_append()
            .withf(|entries: &[DeadLetterEntry]| {
                entries.len() == 1 && entries[0].reasons == vec![REASON_TEMPERATURE_OUT_OF_RANGE]
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut hot = valid_v1("hot");
        hot.insert("temperature".to_string(), json!(250.0));

        let mut processor = processor(operational, analytical, dead_letter);
        let result = processor.process_batch(vec![valid_v1("ok"), hot]).await;

        assert_eq!(result.accepted, 1);
        assert_eq!(result.rejected, 1);
    }

    #[tokio::test]
    async fn test_operational_failure_does_not_block_analytical() {
        // Scenario D: the dual-write is independent, not atomic
        let mut operational = MockOperationalSink::new();
        operational
            .expect_write_batch()
            .times(1)
            .returning(|_| Err(DomainError::RepositoryError(anyhow::anyhow!(
                "connection refused"
            ))));

        let mut analytical = MockAnalyticalSink::new();
        analytical
            .expect_write_batch()
            .times(1)
            .returning(|records| Ok(AnalyticalWrite {
                written: records.len() as u64,
            }));

        let mut dead_letter = MockDeadLetterSink::new();
        dead_letter.expect_append().times(0);

        let mut processor = processor(operational, analytical, dead_letter);
        let result = processor.process_batch(vec![valid_v1("a")]).await;

        assert_eq!(result.accepted, 1);
        assert_eq!(result.sink_errors.len(), 1);
        assert_eq!(result.sink_errors[0].sink, OPERATIONAL_SINK_NAME);
        assert!(result.sink_errors[0].message.contains("connection refused"));
    }

    #[tokio::test]
    async fn test_v2_event_with_location_accepted() {
        // Scenario E
        let mut operational = MockOperationalSink::new();
        operational
            .expect_write_batch()
            .withf(|records: &[TelemetryRecord]| {
                records.len() == 1 && records[0].schema_version == 2
            })
            .times(1)
            .returning(|records| Ok(OperationalWrite {
                inserted: records.len() as u64,
            }));
        let mut analytical = MockAnalyticalSink::new();
        analytical
            .expect_write_batch()
            .times(1)
            .returning(|records| Ok(AnalyticalWrite {
                written: records.len() as u64,
            }));
        let mut dead_letter = MockDeadLetterSink::new();
        dead_letter.expect_append().times(0);

        let mut event = valid_v1("geo");
        event.insert("location".to_string(), json!({"lat": 40.7, "lon": -74.0}));

        let mut processor = processor(operational, analytical, dead_letter);
        let result = processor.process_batch(vec![event]).await;

        assert_eq!(result.accepted, 1);
        assert_eq!(result.rejected, 0);
    }

    #[tokio::test]
    async fn test_malformed_event_counted_separately() {
        let (operational, analytical) = sinks_never_called();
        let mut dead_letter = MockDeadLetterSink::new();
        dead_letter
            .expect_append()
            .withf(|entries: &[DeadLetterEntry]| {
                entries.len() == 1 && entries[0].reasons == vec![REASON_MALFORMED]
            })
            .times(1)
            .returning(|_| Ok(()));

        let mut processor = processor(operational, analytical, dead_letter);
        let result = processor
            .process_batch(vec![raw(json!({"timestamp": "not-a-time", "device_id": "x"}))])
            .await;

        assert_eq!(result.attempted, 1);
        assert_eq!(result.accepted, 0);
        assert_eq!(result.rejected, 0);
        assert_eq!(result.malformed, 1);
    }

    #[tokio::test]
    async fn test_accounting_invariant_holds() {
        let mut operational = MockOperationalSink::new();
        operational
            .expect_write_batch()
            .times(1)
            .returning(|records| Ok(OperationalWrite {
                inserted: records.len() as u64,
            }));
        let mut analytical = MockAnalyticalSink::new();
        analytical
            .expect_write_batch()
            .times(1)
            .returning(|records| Ok(AnalyticalWrite {
                written: records.len() as u64,
            }));
        let mut dead_letter = MockDeadLetterSink::new();
        dead_letter.expect_append().times(1).returning(|_| Ok(()));

        let mut hot = valid_v1("hot");
        hot.insert("temperature".to_string(), json!(400.0));
        let batch = vec![
            valid_v1("a"),
            hot,
            raw(json!({"device_id": "no-timestamp"})),
            valid_v1("b"),
        ];

        let mut processor = processor(operational, analytical, dead_letter);
        let result = processor.process_batch(batch).await;

        assert_eq!(
            result.accepted + result.rejected + result.malformed,
            result.attempted
        );
        assert_eq!(result.attempted, 4);
    }

    #[tokio::test]
    async fn test_accepted_records_preserve_input_order() {
        let mut operational = MockOperationalSink::new();
        operational
            .expect_write_batch()
            .withf(|records: &[TelemetryRecord]| {
                let ids: Vec<&str> = records.iter().map(|r| r.device_id.as_str()).collect();
                ids == ["first", "second", "third"]
            })
            .times(1)
            .returning(|records| Ok(OperationalWrite {
                inserted: records.len() as u64,
            }));
        let mut analytical = MockAnalyticalSink::new();
        analytical
            .expect_write_batch()
            .times(1)
            .returning(|records| Ok(AnalyticalWrite {
                written: records.len() as u64,
            }));
        let mut dead_letter = MockDeadLetterSink::new();
        dead_letter.expect_append().times(1).returning(|_| Ok(()));

        let batch = vec![
            valid_v1("first"),
            valid_v1(""),
            valid_v1("second"),
            valid_v1("third"),
        ];

        let mut processor = processor(operational, analytical, dead_letter);
        processor.process_batch(batch).await;
    }

    #[tokio::test]
    async fn test_reprocessing_identical_batch_yields_identical_partition() {
        let mut operational = MockOperationalSink::new();
        operational
            .expect_write_batch()
            .times(2)
            .returning(|records| Ok(OperationalWrite {
                inserted: records.len() as u64,
            }));
        let mut analytical = MockAnalyticalSink::new();
        analytical
            .expect_write_batch()
            .times(2)
            .returning(|records| Ok(AnalyticalWrite {
                written: records.len() as u64,
            }));
        let mut dead_letter = MockDeadLetterSink::new();
        dead_letter.expect_append().times(2).returning(|_| Ok(()));

        let batch = vec![valid_v1("a"), valid_v1(""), valid_v1("b")];

        let mut processor = processor(operational, analytical, dead_letter);
        let first = processor.process_batch(batch.clone()).await;
        let second = processor.process_batch(batch).await;

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_empty_batch_touches_no_sink() {
        let (operational, analytical) = sinks_never_called();
        let mut dead_letter = MockDeadLetterSink::new();
        dead_letter.expect_append().times(0);

        let mut processor = processor(operational, analytical, dead_letter);
        let result = processor.process_batch(Vec::new()).await;

        assert_eq!(result.attempted, 0);
        assert!(result.sink_errors.is_empty());
    }

    #[tokio::test]
    async fn test_dead_letter_failure_does_not_fail_batch() {
        let (operational, analytical) = sinks_never_called();
        let mut dead_letter = MockDeadLetterSink::new();
        dead_letter.expect_append().times(1).returning(|_| {
            Err(DomainError::RepositoryError(anyhow::anyhow!("disk full")))
        });

        let mut processor = processor(operational, analytical, dead_letter);
        let result = processor.process_batch(vec![valid_v1("")]).await;

        assert_eq!(result.rejected, 1);
        assert!(result.sink_errors.is_empty());
    }

    #[tokio::test]
    async fn test_totals_accumulate_across_batches() {
        let mut operational = MockOperationalSink::new();
        operational
            .expect_write_batch()
            .times(2)
            .returning(|records| Ok(OperationalWrite {
                inserted: records.len() as u64,
            }));
        let mut analytical = MockAnalyticalSink::new();
        analytical
            .expect_write_batch()
            .times(2)
            .returning(|records| Ok(AnalyticalWrite {
                written: records.len() as u64,
            }));
        let mut dead_letter = MockDeadLetterSink::new();
        dead_letter.expect_append().times(0);

        let mut processor = processor(operational, analytical, dead_letter);
        processor.process_batch(vec![valid_v1("a")]).await;
        processor.process_batch(vec![valid_v1("b"), valid_v1("c")]).await;

        let totals = processor.totals();
        assert_eq!(totals.batches, 2);
        assert_eq!(totals.attempted, 3);
        assert_eq!(totals.accepted, 3);
    }
}
