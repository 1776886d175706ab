//! Remote log service configuration.

use harvester_core::{ConfigErrorCode, Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Connection settings for the remote log service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Service endpoint (a signing proxy or local emulator)
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    /// Request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// Maximum events per fetched page; the service default when unset
    #[serde(default)]
    pub page_limit: Option<u32>,
}

fn default_endpoint() -> String {
    "http://localhost:4566".to_string()
}

fn default_request_timeout_ms() -> u64 {
    30000
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            request_timeout_ms: default_request_timeout_ms(),
            page_limit: None,
        }
    }
}

impl SourceConfig {
    /// Parses and checks the endpoint.
    pub fn endpoint_url(&self) -> Result<Url> {
        let url = Url::parse(&self.endpoint).map_err(|e| {
            Error::config(
                ConfigErrorCode::InvalidEndpoint,
                format!("endpoint '{}' is not a valid URL: {}", self.endpoint, e),
            )
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => Err(Error::config(
                ConfigErrorCode::InvalidEndpoint,
                format!("endpoint scheme '{}' is not supported", other),
            )),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}
