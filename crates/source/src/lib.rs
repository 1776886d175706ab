//! Remote log service client for the log harvester.

pub mod client;
pub mod config;
pub mod http;

pub use client::*;
pub use config::*;
pub use http::HttpLogSource;
