use async_trait::async_trait;
use common::{
    DomainError, DomainResult, OperationalSink, OperationalWrite, PostgresClient, TelemetryRecord,
};
use tracing::{debug, instrument};

const UPSERT_TELEMETRY: &str = "INSERT INTO telemetry (
        device_id, time, temperature, humidity, pressure, battery_level,
        location_lat, location_lon, firmware_version, schema_version, ingestion_time
    ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
    ON CONFLICT (device_id, time) DO UPDATE SET
        temperature = EXCLUDED.temperature,
        humidity = EXCLUDED.humidity,
        pressure = EXCLUDED.pressure,
        battery_level = EXCLUDED.battery_level,
        location_lat = EXCLUDED.location_lat,
        location_lon = EXCLUDED.location_lon,
        firmware_version = EXCLUDED.firmware_version,
        schema_version = EXCLUDED.schema_version,
        ingestion_time = EXCLUDED.ingestion_time";

/// PostgreSQL implementation of the operational sink.
///
/// Upserts by the natural key `(device_id, time)`, which makes repeated
/// writes of the same batch safe: re-processing overwrites rather than
/// duplicates.
#[derive(Clone)]
pub struct PostgresTelemetrySink {
    client: PostgresClient,
}

impl PostgresTelemetrySink {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl OperationalSink for PostgresTelemetrySink {
    #[instrument(skip(self, records), fields(record_count = records.len()))]
    async fn write_batch(&self, records: &[TelemetryRecord]) -> DomainResult<OperationalWrite> {
        if records.is_empty() {
            debug!("no records to store, skipping");
            return Ok(OperationalWrite { inserted: 0 });
        }

        let mut conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let tx = conn
            .transaction()
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        let stmt = tx
            .prepare(UPSERT_TELEMETRY)
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        let mut inserted = 0u64;
        for record in records {
            let location_lat = record.location.map(|l| l.lat);
            let location_lon = record.location.map(|l| l.lon);

            inserted += tx
                .execute(
                    &stmt,
                    &[
                        &record.device_id,
                        &record.time,
                        &record.temperature,
                        &record.humidity,
                        &record.pressure,
                        &record.battery_level,
                        &location_lat,
                        &location_lon,
                        &record.firmware_version,
                        &record.schema_version,
                        &record.ingestion_time,
                    ],
                )
                .await
                .map_err(|e| DomainError::RepositoryError(e.into()))?;
        }

        tx.commit()
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!(rows_inserted = inserted, "stored telemetry batch");

        Ok(OperationalWrite { inserted })
    }
}
