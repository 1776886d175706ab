//! Poll loop configuration.

use harvester_core::{ConfigErrorCode, Error, Result, StartPosition};
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::offsets::{resolve_location, LocationEnv};

/// Payload decoder applied to every event message.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// Message kept verbatim in a `message` field
    #[default]
    Plain,
    /// Message parsed as a JSON object (or array of objects)
    Json,
}

/// What the loop does with remote failures other than rate limiting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemoteErrorPolicy {
    /// Stop the loop and surface the error
    #[default]
    Abort,
    /// Log, abandon the rest of the cycle and try again after the interval
    Skip,
}

/// Poll loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollerConfig {
    /// Group names, or prefixes when `log_group_prefix` is set
    #[serde(default)]
    pub log_groups: Vec<String>,
    /// Treat `log_groups` as prefixes to expand through the remote listing
    #[serde(default)]
    pub log_group_prefix: bool,
    /// Seconds to wait between cycles
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// `beginning`, `end`, or seconds before now, for groups without a stored offset
    #[serde(
        default = "default_start_position",
        deserialize_with = "string_or_integer"
    )]
    pub start_position: String,
    /// Re-read window in seconds; when set, offsets slide instead of following event timestamps
    #[serde(default)]
    pub lookback_duration_secs: Option<u64>,
    /// Explicit offset file path
    #[serde(default)]
    pub sincedb_path: Option<PathBuf>,
    /// Data directory used to derive the offset file path
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default)]
    pub codec: CodecKind,
    #[serde(default)]
    pub remote_error_policy: RemoteErrorPolicy,
}

fn default_interval_secs() -> u64 {
    60
}

fn default_start_position() -> String {
    "beginning".to_string()
}

/// Accepts `start_position = 3600` as well as `start_position = "3600"`.
fn string_or_integer<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Int(i64),
        Str(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Int(n) => n.to_string(),
        Raw::Str(s) => s,
    })
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            log_groups: Vec::new(),
            log_group_prefix: false,
            interval_secs: default_interval_secs(),
            start_position: default_start_position(),
            lookback_duration_secs: None,
            sincedb_path: None,
            data_dir: None,
            codec: CodecKind::default(),
            remote_error_policy: RemoteErrorPolicy::default(),
        }
    }
}

impl PollerConfig {
    /// Checks the settings that must hold before polling starts.
    pub fn validate(&self) -> Result<StartPosition> {
        if self.log_groups.iter().all(|g| g.trim().is_empty()) {
            return Err(Error::config(
                ConfigErrorCode::NoLogGroups,
                "at least one log group must be configured",
            ));
        }
        self.start_position.parse()
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    /// Resolves where the offset table lives.
    pub fn offset_location(&self, env: &LocationEnv) -> Result<PathBuf> {
        resolve_location(
            self.sincedb_path.as_deref(),
            self.data_dir.as_deref(),
            env,
            &self.log_groups,
        )
    }
}
