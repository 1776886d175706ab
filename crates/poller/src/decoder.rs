//! Message decoders.

use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::debug;

use crate::config::CodecKind;

/// Tag added to payloads whose message could not be parsed.
pub const JSON_PARSE_FAILURE_TAG: &str = "_jsonparsefailure";

/// Turns one raw message into zero or more payloads.
pub trait Decoder: Send + Sync {
    fn decode(&self, message: &str) -> Vec<Map<String, Value>>;
}

/// Keeps the message verbatim.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainDecoder;

impl Decoder for PlainDecoder {
    fn decode(&self, message: &str) -> Vec<Map<String, Value>> {
        vec![message_payload(message)]
    }
}

/// Parses the message as JSON.
///
/// An object becomes one payload and an array one payload per element
/// (non-object elements are wrapped in `message`). Anything else is kept
/// verbatim and tagged.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonDecoder;

impl Decoder for JsonDecoder {
    fn decode(&self, message: &str) -> Vec<Map<String, Value>> {
        match serde_json::from_str::<Value>(message) {
            Ok(Value::Object(map)) => vec![map],
            Ok(Value::Array(items)) => items
                .into_iter()
                .map(|item| match item {
                    Value::Object(map) => map,
                    other => {
                        let mut map = Map::new();
                        map.insert("message".to_string(), other);
                        map
                    }
                })
                .collect(),
            Ok(_) => vec![parse_failure(message)],
            Err(e) => {
                debug!(error = %e, "Message is not valid JSON");
                vec![parse_failure(message)]
            }
        }
    }
}

/// Decoder for the configured codec.
pub fn decoder_for(kind: CodecKind) -> Arc<dyn Decoder> {
    match kind {
        CodecKind::Plain => Arc::new(PlainDecoder),
        CodecKind::Json => Arc::new(JsonDecoder),
    }
}

fn message_payload(message: &str) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("message".to_string(), Value::String(message.to_string()));
    map
}

fn parse_failure(message: &str) -> Map<String, Value> {
    let mut map = message_payload(message);
    map.insert(
        "tags".to_string(),
        Value::Array(vec![Value::String(JSON_PARSE_FAILURE_TAG.to_string())]),
    );
    map
}
