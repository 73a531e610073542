use chrono::{DateTime, Utc};
use common::{BatchResult, PipelineTotals};
use serde::Serialize;

/// Overall health verdict for the processed stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum QualityStatus {
    Pass,
    Warning,
    Fail,
}

/// Aggregated data-quality report over all observed batch summaries
#[derive(Debug, Clone, Serialize)]
pub struct QualityReport {
    pub generated_at: DateTime<Utc>,
    pub status: QualityStatus,
    pub message: String,
    pub totals: PipelineTotals,
    pub acceptance_rate: f64,
    pub error_rate: f64,
}

/// Tracks data-quality metrics from accumulated batch summaries.
///
/// Error rate counts both validation rejections and malformed events.
/// Thresholds: above 10% the stream fails, above 5% it warns.
#[derive(Debug, Clone, Default)]
pub struct QualityMonitor {
    totals: PipelineTotals,
}

impl QualityMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, result: &BatchResult) {
        self.totals.observe(result);
    }

    pub fn report(&self) -> QualityReport {
        let attempted = self.totals.attempted;
        let failed = self.totals.rejected + self.totals.malformed;
        let error_rate = if attempted > 0 {
            failed as f64 / attempted as f64
        } else {
            0.0
        };
        let acceptance_rate = if attempted > 0 {
            self.totals.accepted as f64 / attempted as f64
        } else {
            0.0
        };

        let (status, message) = if error_rate > 0.10 {
            (
                QualityStatus::Fail,
                format!("High error rate: {:.2}%", error_rate * 100.0),
            )
        } else if error_rate > 0.05 {
            (
                QualityStatus::Warning,
                format!("Elevated error rate: {:.2}%", error_rate * 100.0),
            )
        } else {
            (
                QualityStatus::Pass,
                format!(
                    "Stream validation passed with {:.2}% error rate",
                    error_rate * 100.0
                ),
            )
        };

        QualityReport {
            generated_at: Utc::now(),
            status,
            message,
            totals: self.totals,
            acceptance_rate,
            error_rate,
        }
    }
}
