use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServiceConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    // PostgreSQL configuration (operational store)
    #[serde(default = "default_postgres_host")]
    pub postgres_host: String,

    #[serde(default = "default_postgres_port")]
    pub postgres_port: u16,

    #[serde(default = "default_postgres_database")]
    pub postgres_database: String,

    #[serde(default = "default_postgres_username")]
    pub postgres_username: String,

    #[serde(default = "default_postgres_password")]
    pub postgres_password: String,

    #[serde(default = "default_postgres_pool_size")]
    pub postgres_pool_size: usize,

    /// Base directory of the partitioned analytical store
    #[serde(default = "default_lake_path")]
    pub lake_path: String,

    /// Dead-letter log file
    #[serde(default = "default_dead_letter_path")]
    pub dead_letter_path: String,

    /// Sample events file; generated on startup when missing
    #[serde(default = "default_sample_events_path")]
    pub sample_events_path: String,

    /// Number of sample events to generate
    #[serde(default = "default_sample_event_count")]
    pub sample_event_count: usize,

    /// Events per processed batch
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Upper bound on batches processed per run
    #[serde(default = "default_max_batches")]
    pub max_batches: usize,

    /// How far into the future an event timestamp may drift, in seconds
    #[serde(default = "default_max_future_drift_secs")]
    pub max_future_drift_secs: i64,

    /// Oldest acceptable event age in days; unset disables the lower bound
    #[serde(default)]
    pub retention_horizon_days: Option<i64>,
}

fn default_log_level() -> String {
    "info".to_string()
}

// PostgreSQL defaults
fn default_postgres_host() -> String {
    "localhost".to_string()
}

fn default_postgres_port() -> u16 {
    5432
}

fn default_postgres_database() -> String {
    "siphon".to_string()
}

fn default_postgres_username() -> String {
    "siphon".to_string()
}

fn default_postgres_password() -> String {
    "siphon".to_string()
}

fn default_postgres_pool_size() -> usize {
    10
}

// Pipeline defaults
fn default_lake_path() -> String {
    "data/lake".to_string()
}

fn default_dead_letter_path() -> String {
    "data/dead_letter_queue.jsonl".to_string()
}

fn default_sample_events_path() -> String {
    "data/sample_events.jsonl".to_string()
}

fn default_sample_event_count() -> usize {
    5000
}

fn default_batch_size() -> usize {
    100
}

fn default_max_batches() -> usize {
    10
}

fn default_max_future_drift_secs() -> i64 {
    300
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("SIPHON"))
            .build()?
            .try_deserialize()
    }
}
