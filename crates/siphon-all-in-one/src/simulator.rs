use std::path::Path;

use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use common::RawEvent;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::{json, Map, Value};
use tracing::{info, warn};

const SAMPLE_DEVICES: [&str; 5] = [
    "device_001",
    "device_002",
    "device_003",
    "device_004",
    "device_005",
];

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn round6(value: f64) -> f64 {
    (value * 1_000_000.0).round() / 1_000_000.0
}

/// Generate a sample telemetry event in the original (V1) shape
pub fn sample_event_v1<R: Rng>(rng: &mut R) -> RawEvent {
    let device_id = SAMPLE_DEVICES
        .choose(rng)
        .copied()
        .unwrap_or(SAMPLE_DEVICES[0]);

    let mut event = Map::new();
    event.insert(
        "timestamp".to_string(),
        Value::String(Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)),
    );
    event.insert("device_id".to_string(), Value::String(device_id.to_string()));
    event.insert("temperature".to_string(), json!(round2(rng.gen_range(15.0..35.0))));
    event.insert("humidity".to_string(), json!(round2(rng.gen_range(30.0..80.0))));
    event.insert("pressure".to_string(), json!(round2(rng.gen_range(980.0..1020.0))));
    event.insert(
        "battery_level".to_string(),
        json!(round2(rng.gen_range(10.0..100.0))),
    );
    event
}

/// Generate a sample event in the extended (V2) shape: V1 plus location
pub fn sample_event_v2<R: Rng>(rng: &mut R) -> RawEvent {
    let mut event = sample_event_v1(rng);
    event.insert(
        "location".to_string(),
        json!({
            "lat": round6(rng.gen_range(40.0..41.0)),
            "lon": round6(rng.gen_range(-74.5..-73.5)),
        }),
    );
    event
}

/// Write `count` random sample events to a JSON-lines file, 70% V1 / 30% V2
pub async fn generate_sample_file(path: impl AsRef<Path>, count: usize) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let mut buf = String::new();
    {
        let mut rng = rand::thread_rng();
        for _ in 0..count {
            let event = if rng.gen_bool(0.7) {
                sample_event_v1(&mut rng)
            } else {
                sample_event_v2(&mut rng)
            };
            buf.push_str(&serde_json::to_string(&event)?);
            buf.push('\n');
        }
    }
    tokio::fs::write(path, buf).await?;

    info!(count, path = %path.display(), "generated sample events");
    Ok(())
}

/// Read a JSON-lines event file into ordered batches of at most `batch_size`.
///
/// Lines that do not parse as a JSON object cannot form a raw event mapping
/// and are skipped with a warning.
pub async fn read_batches(
    path: impl AsRef<Path>,
    batch_size: usize,
) -> Result<Vec<Vec<RawEvent>>> {
    let contents = tokio::fs::read_to_string(path.as_ref()).await?;

    let mut batches: Vec<Vec<RawEvent>> = Vec::new();
    let mut batch: Vec<RawEvent> = Vec::with_capacity(batch_size);

    for line in contents.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(event)) => {
                batch.push(event);
                if batch.len() >= batch_size {
                    batches.push(std::mem::replace(&mut batch, Vec::with_capacity(batch_size)));
                }
            }
            Ok(_) | Err(_) => {
                warn!(line, "skipping line that is not a JSON object");
            }
        }
    }

    if !batch.is_empty() {
        batches.push(batch);
    }

    Ok(batches)
}
