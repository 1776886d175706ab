//! Per-cycle bookkeeping.

use harvester_core::Offset;

/// Counters for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    pub events_processed: u64,
    pub records_emitted: u64,
    pub pages_fetched: u64,
    pub groups_polled: u64,
    /// Groups left unpolled because the cycle ended early
    pub groups_skipped: u64,
}

/// State threaded through one cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleContext {
    /// Cycle start (ms since epoch); anchors the lookback window
    pub start_ms: Offset,
    pub stats: CycleStats,
}

impl CycleContext {
    pub fn new(start_ms: Offset) -> Self {
        Self {
            start_ms,
            stats: CycleStats::default(),
        }
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Every scheduled group was drained
    Completed,
    /// A rate limit cut the cycle short
    RateLimited,
    /// A remote error cut the cycle short under the skip policy
    Skipped(String),
}

/// Result of one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub outcome: CycleOutcome,
    pub stats: CycleStats,
    /// Groups in the order they were scheduled
    pub scheduled: Vec<String>,
}

impl CycleReport {
    pub fn is_complete(&self) -> bool {
        self.outcome == CycleOutcome::Completed
    }
}
