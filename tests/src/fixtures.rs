//! Test fixtures and event generators.

use harvester_core::RawLogEvent;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A raw event with a unique id.
pub fn event(stream: &str, timestamp: i64, message: &str) -> RawLogEvent {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    RawLogEvent {
        log_stream_name: stream.to_string(),
        timestamp,
        message: message.to_string(),
        ingestion_time: timestamp + 250,
        event_id: format!("{}-{}", timestamp, id),
    }
}

/// One plain-text event per timestamp, on a single stream.
pub fn events_at(timestamps: &[i64]) -> Vec<RawLogEvent> {
    timestamps
        .iter()
        .map(|&ts| event("app-stream", ts, &format!("line at {}", ts)))
        .collect()
}

/// A JSON message carrying an array of `n` objects.
pub fn json_batch_message(n: usize) -> String {
    let items: Vec<serde_json::Value> = (0..n)
        .map(|i| serde_json::json!({ "seq": i, "level": "info" }))
        .collect();
    serde_json::Value::Array(items).to_string()
}

/// Group names as owned strings.
pub fn groups(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
