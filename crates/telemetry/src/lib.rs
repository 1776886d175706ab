//! Internal telemetry for the log harvester.
//!
//! Structured logging setup plus an in-process metrics registry that the
//! binary periodically logs.

pub mod metrics;
pub mod tracing_setup;

pub use metrics::*;
pub use tracing_setup::*;
