use std::path::PathBuf;

use async_trait::async_trait;
use common::{DeadLetterEntry, DeadLetterSink, DomainError, DomainResult};
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument};

/// Append-only JSON-lines dead-letter log.
///
/// Holds every event that failed normalization or validation, tagged with
/// its reasons, for manual inspection or replay. Entries are never updated
/// or deleted by the pipeline.
#[derive(Clone)]
pub struct JsonlDeadLetterLog {
    path: PathBuf,
}

impl JsonlDeadLetterLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read back all dead-lettered entries, oldest first
    pub async fn read_entries(&self) -> DomainResult<Vec<DeadLetterEntry>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents
                .lines()
                .filter(|line| !line.trim().is_empty())
                .map(|line| {
                    serde_json::from_str(line).map_err(|e| DomainError::RepositoryError(e.into()))
                })
                .collect(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(DomainError::RepositoryError(e.into())),
        }
    }
}

#[async_trait]
impl DeadLetterSink for JsonlDeadLetterLog {
    #[instrument(skip(self, entries), fields(entry_count = entries.len()))]
    async fn append(&self, entries: &[DeadLetterEntry]) -> DomainResult<()> {
        if entries.is_empty() {
            return Ok(());
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| DomainError::RepositoryError(e.into()))?;
        }

        let mut buf = String::new();
        for entry in entries {
            let line = serde_json::to_string(entry)
                .map_err(|e| DomainError::RepositoryError(e.into()))?;
            buf.push_str(&line);
            buf.push('\n');
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;
        file.write_all(buf.as_bytes())
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!(entries = entries.len(), "appended dead-letter entries");

        Ok(())
    }
}
