use async_trait::async_trait;

use crate::domain::result::DomainResult;
use crate::domain::{DeadLetterEntry, TelemetryRecord};

/// Write outcome reported by the operational store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationalWrite {
    pub inserted: u64,
}

/// Write outcome reported by the analytical store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalyticalWrite {
    pub written: u64,
}

/// Operational store port: keyed upsert by `(device_id, time)`.
///
/// Implementations own their durability and retry policy; each call must be
/// independently safe to invoke. Duplicate suppression on re-processing is
/// the sink's responsibility (upsert by natural key), not the processor's.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait OperationalSink: Send + Sync {
    /// Persist a batch of accepted records
    ///
    /// # Returns
    /// The number of rows written, DomainError on failure
    async fn write_batch(&self, records: &[TelemetryRecord]) -> DomainResult<OperationalWrite>;
}

/// Analytical store port: append-only, partitioned by the record's date
/// with partition key format `year=YYYY/month=MM/day=DD`.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait AnalyticalSink: Send + Sync {
    /// Append a batch of accepted records to their date partitions
    ///
    /// # Returns
    /// The number of records written, DomainError on failure
    async fn write_batch(&self, records: &[TelemetryRecord]) -> DomainResult<AnalyticalWrite>;
}

/// Dead-letter log port: append-only, best-effort.
///
/// Failures here are logged by the caller and never retried.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait DeadLetterSink: Send + Sync {
    /// Append entries for events that failed normalization or validation
    async fn append(&self, entries: &[DeadLetterEntry]) -> DomainResult<()>;
}
