//! Raw log events as returned by the remote service and the records
//! emitted downstream.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Read offset of a group: milliseconds since epoch, 0 meaning "from the beginning".
pub type Offset = i64;

/// A single event as returned by a paginated fetch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLogEvent {
    /// Stream the event was written to
    #[serde(default)]
    pub log_stream_name: String,
    /// Event time (ms since epoch)
    pub timestamp: i64,
    /// Raw message payload
    #[serde(default)]
    pub message: String,
    /// Time the remote service ingested the event (ms since epoch)
    #[serde(default)]
    pub ingestion_time: i64,
    /// Remote-assigned event identifier
    #[serde(default)]
    pub event_id: String,
}

/// A decoded record annotated with its source, ready for the downstream sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmittedRecord {
    /// Decoded fields
    pub payload: Map<String, Value>,
    pub timestamp: DateTime<Utc>,
    pub ingestion_time: DateTime<Utc>,
    pub log_group: String,
    pub log_stream: String,
    pub event_id: String,
}

impl EmittedRecord {
    /// Builds a record from one raw event and one decoded payload.
    pub fn from_raw(event: &RawLogEvent, group: &str, payload: Map<String, Value>) -> Self {
        Self {
            payload,
            timestamp: millis_to_datetime(event.timestamp),
            ingestion_time: millis_to_datetime(event.ingestion_time),
            log_group: group.to_string(),
            log_stream: event.log_stream_name.clone(),
            event_id: event.event_id.clone(),
        }
    }

    /// Renders the record as a flat JSON document.
    ///
    /// Payload fields come first; `@timestamp` and the `log_source` object
    /// overwrite payload fields of the same name.
    pub fn to_json(&self) -> Value {
        let mut doc = self.payload.clone();
        doc.insert(
            "@timestamp".to_string(),
            Value::String(self.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        doc.insert(
            "log_source".to_string(),
            serde_json::json!({
                "ingestion_time": self.ingestion_time.to_rfc3339_opts(SecondsFormat::Millis, true),
                "log_group": self.log_group,
                "log_stream": self.log_stream,
                "event_id": self.event_id,
            }),
        );
        Value::Object(doc)
    }
}

/// Converts epoch milliseconds to a UTC timestamp, clamping unrepresentable values to the epoch.
pub fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
