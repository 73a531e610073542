use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use common::{AnalyticalSink, AnalyticalWrite, DomainError, DomainResult, TelemetryRecord};
use tracing::{debug, instrument};

use crate::lake::partition_key;

/// Analytical store implementation: date-partitioned JSON-lines files.
///
/// Append-only; every batch produces a fresh file per touched partition, so
/// concurrent writers never contend on a file. Partition layout is
/// `<base>/year=YYYY/month=MM/day=DD/telemetry_<instant>.jsonl`, keyed by
/// the record's own timestamp, not the ingestion instant.
#[derive(Clone)]
pub struct PartitionedLakeSink {
    base_path: PathBuf,
}

impl PartitionedLakeSink {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }
}

#[async_trait]
impl AnalyticalSink for PartitionedLakeSink {
    #[instrument(skip(self, records), fields(record_count = records.len()))]
    async fn write_batch(&self, records: &[TelemetryRecord]) -> DomainResult<AnalyticalWrite> {
        if records.is_empty() {
            debug!("no records to write, skipping");
            return Ok(AnalyticalWrite { written: 0 });
        }

        let mut partitions: BTreeMap<NaiveDate, Vec<&TelemetryRecord>> = BTreeMap::new();
        for record in records {
            partitions
                .entry(record.time.date_naive())
                .or_default()
                .push(record);
        }

        let file_stamp = Utc::now().format("%Y%m%d_%H%M%S_%6f").to_string();
        let mut written = 0u64;

        for (date, group) in partitions {
            let dir = self.base_path.join(partition_key(date));
            tokio::fs::create_dir_all(&dir)
                .await
                .map_err(|e| DomainError::RepositoryError(e.into()))?;

            let mut buf = String::new();
            for record in &group {
                let line = serde_json::to_string(record)
                    .map_err(|e| DomainError::RepositoryError(e.into()))?;
                buf.push_str(&line);
                buf.push('\n');
            }

            let file = dir.join(format!("telemetry_{file_stamp}.jsonl"));
            tokio::fs::write(&file, buf)
                .await
                .map_err(|e| DomainError::RepositoryError(e.into()))?;

            debug!(
                partition = %partition_key(date),
                records = group.len(),
                "wrote lake partition file"
            );
            written += group.len() as u64;
        }

        Ok(AnalyticalWrite { written })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};

    fn record(device_id: &str, time: &str) -> TelemetryRecord {
        TelemetryRecord {
            device_id: device_id.to_string(),
            time: time.parse::<DateTime<Utc>>().unwrap(),
            temperature: Some(21.0),
            humidity: Some(50.0),
            pressure: None,
            battery_level: Some(75.0),
            location: None,
            firmware_version: None,
            schema_version: 1,
            ingestion_time: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_batch_spanning_two_dates_writes_two_partitions() {
        let dir = tempfile::tempdir().unwrap();
        let sink = PartitionedLakeSink::new(dir.path());

        let records = vec![
            record("a", "2024-06-01T23:59:00Z"),
            record("b", "2024-06-02T00:01:00Z"),
            record("c", "2024-06-01T12:00:00Z"),
        ];

        let write = sink.write_batch(&records).await.unwrap();

        assert_eq!(write.written, 3);
        assert!(dir.path().join("year=2024/month=06/day=01").is_dir());
        assert!(dir.path().join("year=2024/month=06/day=02").is_dir());
    }

    #[tokio::test]
    async fn test_records_round_trip_through_partition_file() {
        let dir = tempfile::tempdir().unwrap();
        let sink = PartitionedLakeSink::new(dir.path());

        let records = vec![
            record("a", "2024-06-01T10:00:00Z"),
            record("b", "2024-06-01T11:00:00Z"),
        ];
        sink.write_batch(&records).await.unwrap();

        let partition = dir.path().join("year=2024/month=06/day=01");
        let files: Vec<_> = std::fs::read_dir(&partition)
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(files.len(), 1);

        let contents = std::fs::read_to_string(&files[0]).unwrap();
        let parsed: Vec<TelemetryRecord> = contents
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(parsed, records);
    }

    #[tokio::test]
    async fn test_successive_batches_append_new_files() {
        let dir = tempfile::tempdir().unwrap();
        let sink = PartitionedLakeSink::new(dir.path());

        sink.write_batch(&[record("a", "2024-06-01T10:00:00Z")])
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        sink.write_batch(&[record("b", "2024-06-01T10:05:00Z")])
            .await
            .unwrap();

        let partition = dir.path().join("year=2024/month=06/day=01");
        let files = std::fs::read_dir(&partition).unwrap().count();
        assert_eq!(files, 2);
    }

    #[tokio::test]
    async fn test_empty_batch_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let sink = PartitionedLakeSink::new(dir.path());

        let write = sink.write_batch(&[]).await.unwrap();

        assert_eq!(write.written, 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
