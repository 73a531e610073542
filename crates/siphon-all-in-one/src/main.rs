mod config;
mod simulator;

use std::path::Path;
use std::sync::Arc;

use anyhow::Result;
use chrono::Duration;
use common::{init_telemetry, PostgresClient, PostgresConfig, TelemetryConfig};
use ingest_worker::{
    JsonlDeadLetterLog, PartitionedLakeSink, PostgresTelemetrySink, QualityMonitor,
    QualityValidator, StreamProcessor, ValidationConfig,
};
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let config = match config::ServiceConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = init_telemetry(&TelemetryConfig {
        service_name: "siphon-all-in-one".to_string(),
        log_level: config.log_level.clone(),
    }) {
        eprintln!("Failed to initialize telemetry: {}", e);
        std::process::exit(1);
    }

    info!("Starting siphon-all-in-one service");

    if let Err(e) = run_pipeline(config).await {
        error!(error = %e, "pipeline run failed");
        std::process::exit(1);
    }
}

async fn run_pipeline(config: config::ServiceConfig) -> Result<()> {
    let postgres_config = PostgresConfig {
        host: config.postgres_host.clone(),
        port: config.postgres_port,
        database: config.postgres_database.clone(),
        username: config.postgres_username.clone(),
        password: config.postgres_password.clone(),
        max_pool_size: config.postgres_pool_size,
    };
    let postgres_client = PostgresClient::new(&postgres_config)?;
    postgres_client.ping().await?;
    info!("connected to operational store");

    let operational = Arc::new(PostgresTelemetrySink::new(postgres_client));
    let analytical = Arc::new(PartitionedLakeSink::new(&config.lake_path));
    let dead_letter = Arc::new(JsonlDeadLetterLog::new(&config.dead_letter_path));

    let validator = QualityValidator::new(ValidationConfig {
        max_future_drift: Duration::seconds(config.max_future_drift_secs),
        retention_horizon: config.retention_horizon_days.map(Duration::days),
        ..ValidationConfig::default()
    });

    let mut processor = StreamProcessor::new(validator, operational, analytical, dead_letter);
    let mut monitor = QualityMonitor::new();

    if !Path::new(&config.sample_events_path).exists() {
        simulator::generate_sample_file(&config.sample_events_path, config.sample_event_count)
            .await?;
    }

    let batches = simulator::read_batches(&config.sample_events_path, config.batch_size).await?;
    info!(
        batches = batches.len(),
        batch_size = config.batch_size,
        "consuming sample event stream"
    );

    for (index, batch) in batches.into_iter().take(config.max_batches).enumerate() {
        let result = processor.process_batch(batch).await;

        if result.sink_errors.is_empty() {
            info!(
                batch = index,
                attempted = result.attempted,
                accepted = result.accepted,
                rejected = result.rejected,
                malformed = result.malformed,
                "batch complete"
            );
        } else {
            warn!(
                batch = index,
                attempted = result.attempted,
                accepted = result.accepted,
                rejected = result.rejected,
                malformed = result.malformed,
                sink_errors = ?result.sink_errors,
                "batch complete with sink errors"
            );
        }

        monitor.observe(&result);
    }

    let report = monitor.report();
    info!(report = %serde_json::to_string(&report)?, "stream quality report");

    info!("Service stopped gracefully");
    Ok(())
}
