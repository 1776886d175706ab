//! Internal metrics collection.
//!
//! Process-wide counters for the poll loop. Per-cycle numbers are carried by
//! the poller's cycle context; these only accumulate for diagnostics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 10ms, 50ms, 100ms, 250ms, 500ms, 1s, 2.5s, 5s, 10s, 30s, 60s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [10, 50, 100, 250, 500, 1000, 2500, 5000, 10000, 30000, 60000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the harvester.
#[derive(Debug, Default)]
pub struct Metrics {
    // Poll loop
    pub cycles_completed: Counter,
    pub cycles_rate_limited: Counter,
    pub groups_polled: Counter,

    // Remote service
    pub pages_fetched: Counter,
    pub remote_errors: Counter,

    // Emission
    pub events_processed: Counter,
    pub records_emitted: Counter,

    // Offset store
    pub offset_writes: Counter,
    pub offset_write_errors: Counter,

    // Latency histograms
    pub cycle_latency_ms: Histogram,
    pub fetch_latency_ms: Histogram,

    // Gauges
    pub groups_tracked: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            cycles_completed: self.cycles_completed.get(),
            cycles_rate_limited: self.cycles_rate_limited.get(),
            groups_polled: self.groups_polled.get(),
            pages_fetched: self.pages_fetched.get(),
            remote_errors: self.remote_errors.get(),
            events_processed: self.events_processed.get(),
            records_emitted: self.records_emitted.get(),
            offset_writes: self.offset_writes.get(),
            offset_write_errors: self.offset_write_errors.get(),
            cycle_latency_mean_ms: self.cycle_latency_ms.mean(),
            fetch_latency_mean_ms: self.fetch_latency_ms.mean(),
            groups_tracked: self.groups_tracked.get(),
        }
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub cycles_completed: u64,
    pub cycles_rate_limited: u64,
    pub groups_polled: u64,
    pub pages_fetched: u64,
    pub remote_errors: u64,
    pub events_processed: u64,
    pub records_emitted: u64,
    pub offset_writes: u64,
    pub offset_write_errors: u64,
    pub cycle_latency_mean_ms: f64,
    pub fetch_latency_mean_ms: f64,
    pub groups_tracked: u64,
}

impl MetricsSnapshot {
    /// Logs the snapshot as a single structured event.
    pub fn log(&self) {
        tracing::info!(
            cycles_completed = self.cycles_completed,
            cycles_rate_limited = self.cycles_rate_limited,
            groups_polled = self.groups_polled,
            pages_fetched = self.pages_fetched,
            remote_errors = self.remote_errors,
            events_processed = self.events_processed,
            records_emitted = self.records_emitted,
            offset_writes = self.offset_writes,
            offset_write_errors = self.offset_write_errors,
            cycle_latency_mean_ms = self.cycle_latency_mean_ms,
            fetch_latency_mean_ms = self.fetch_latency_mean_ms,
            groups_tracked = self.groups_tracked,
            "Harvester metrics"
        );
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
