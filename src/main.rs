//! Log Harvester
//!
//! Polls remote log groups and emits their events downstream:
//! - Log group discovery by name or prefix
//! - Durable per-group read offsets with restart recovery
//! - Fair scheduling across groups and rate-limit tolerance
//! - Records written as JSON lines on stdout

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use harvester_core::EmittedRecord;
use log_source::{HttpLogSource, SourceConfig};
use poller::{
    decoder_for, ChannelSink, EventEmitter, LocationEnv, OffsetStore, PollLoop, PollerConfig,
};
use telemetry::{init_tracing_from_env, metrics};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default)]
    poller: PollerConfig,

    #[serde(default)]
    source: SourceConfig,

    /// Records buffered between the poll loop and the stdout writer
    #[serde(default = "default_channel_capacity")]
    channel_capacity: usize,

    /// Seconds between metrics snapshots in the log
    #[serde(default = "default_metrics_interval_secs")]
    metrics_interval_secs: u64,
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_metrics_interval_secs() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poller: PollerConfig::default(),
            source: SourceConfig::default(),
            channel_capacity: default_channel_capacity(),
            metrics_interval_secs: default_metrics_interval_secs(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    init_tracing_from_env();

    info!("Starting Log Harvester v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = load_config()?;

    config
        .poller
        .validate()
        .context("Invalid poller configuration")?;

    info!(
        log_groups = ?config.poller.log_groups,
        prefix_mode = config.poller.log_group_prefix,
        endpoint = %config.source.endpoint,
        "Loaded configuration"
    );

    // Resolve where offsets live
    let sincedb_path = config
        .poller
        .offset_location(&LocationEnv::from_process())
        .context("Failed to resolve offset file location")?;
    let store = OffsetStore::new(sincedb_path);

    // Remote log service client
    let source = Arc::new(
        HttpLogSource::new(&config.source).context("Failed to create log source client")?,
    );

    // Downstream: bounded channel drained to stdout
    let (sink, records) = ChannelSink::channel(config.channel_capacity);
    let writer = spawn_stdout_writer(records);

    let emitter = EventEmitter::new(decoder_for(config.poller.codec), Arc::new(sink));
    let mut poll_loop = PollLoop::new(config.poller.clone(), source, emitter, store)
        .context("Failed to create poll loop")?;

    let cancel = CancellationToken::new();
    let metrics_logger = spawn_metrics_logger(
        Duration::from_secs(config.metrics_interval_secs.max(1)),
        cancel.clone(),
    );

    let shutdown = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.cancel();
    });

    let result = poll_loop.run(&cancel).await;

    // Cleanup
    info!("Shutting down...");

    // Dropping the loop closes the channel so the writer can drain and exit
    drop(poll_loop);
    if let Err(e) = writer.await {
        error!("Record writer task failed: {}", e);
    }

    cancel.cancel();
    metrics_logger.await.ok();
    metrics().snapshot().log();

    result.context("Poll loop failed")?;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    load_config_from(std::env::vars().collect())
}

/// Load configuration with an explicit set of environment variables.
///
/// Nested keys use `HARVESTER_<SECTION>__<KEY>`, e.g.
/// `HARVESTER_POLLER__INTERVAL_SECS=30`.
fn load_config_from(vars: config::Map<String, String>) -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .prefix("HARVESTER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(Some(vars.clone())),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Flat overrides for the settings people set most often
    if let Some(groups) = vars.get("HARVESTER_LOG_GROUPS") {
        config.poller.log_groups = groups
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    if let Some(endpoint) = vars.get("HARVESTER_ENDPOINT") {
        config.source.endpoint = endpoint.clone();
    }
    if let Some(path) = vars.get("HARVESTER_SINCEDB_PATH") {
        config.poller.sincedb_path = Some(path.into());
    }
    if let Some(position) = vars.get("HARVESTER_START_POSITION") {
        config.poller.start_position = position.clone();
    }

    Ok(config)
}

/// Writes each record as one JSON line on stdout until the channel closes.
fn spawn_stdout_writer(mut records: mpsc::Receiver<EmittedRecord>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut out = BufWriter::new(tokio::io::stdout());

        while let Some(record) = records.recv().await {
            let mut line = record.to_json().to_string();
            line.push('\n');
            if let Err(e) = out.write_all(line.as_bytes()).await {
                error!("Failed to write record to stdout: {}", e);
                return;
            }
            // flush when the loop has nothing else queued
            if records.is_empty() {
                if let Err(e) = out.flush().await {
                    error!("Failed to flush stdout: {}", e);
                    return;
                }
            }
        }

        out.flush().await.ok();
    })
}

/// Logs a metrics snapshot on every tick until cancelled.
fn spawn_metrics_logger(period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => metrics().snapshot().log(),
            }
        }
    })
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
