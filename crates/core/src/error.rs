//! Unified error types for the harvester.
//!
//! Error codes:
//! - CONF_001-004: Configuration errors (fatal, raised before polling starts)
//! - RATE_001: Remote rate limiting (recoverable, absorbed per cycle)

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Configuration error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorCode {
    /// CONF_001: Start position is not `beginning`, `end` or an integer
    InvalidStartPosition,
    /// CONF_002: No location could be resolved for the offset file
    NoOffsetLocation,
    /// CONF_003: No log groups configured
    NoLogGroups,
    /// CONF_004: Remote endpoint is not a valid URL
    InvalidEndpoint,
}

impl ConfigErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidStartPosition => "CONF_001",
            Self::NoOffsetLocation => "CONF_002",
            Self::NoLogGroups => "CONF_003",
            Self::InvalidEndpoint => "CONF_004",
        }
    }
}

/// Unified error type for the harvester.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with code.
    #[error("[{code}] {message}")]
    Config { code: &'static str, message: String },

    /// The remote service throttled the request.
    #[error("[RATE_001] {operation} rate limited: {message}")]
    RateLimited {
        operation: &'static str,
        message: String,
    },

    /// The remote service rejected the request.
    #[error("remote error during {operation}: {kind}: {message}")]
    Remote {
        operation: &'static str,
        kind: String,
        message: String,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("downstream sink closed")]
    SinkClosed,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a configuration error.
    pub fn config(code: ConfigErrorCode, msg: impl Into<String>) -> Self {
        Self::Config {
            code: code.code(),
            message: msg.into(),
        }
    }

    pub fn rate_limited(operation: &'static str, msg: impl Into<String>) -> Self {
        Self::RateLimited {
            operation,
            message: msg.into(),
        }
    }

    pub fn remote(operation: &'static str, kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Remote {
            operation,
            kind: kind.into(),
            message: msg.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this is a throttling signal from the remote service.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }

    /// Whether this error came from talking to the remote service.
    pub fn is_remote(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Remote { .. } | Self::Transport(_)
        )
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Config { code, .. } => Some(*code),
            Self::RateLimited { .. } => Some("RATE_001"),
            _ => None,
        }
    }
}
