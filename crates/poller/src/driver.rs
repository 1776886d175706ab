//! The poll loop.
//!
//! Resolve, schedule, drain each group, sleep, repeat. Rate limits end a
//! cycle early and are retried after the normal interval; other remote
//! failures follow the configured [`RemoteErrorPolicy`].

use harvester_core::{Clock, Error, Result, StartPosition, SystemClock};
use log_source::LogSource;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Instant;
use telemetry::metrics;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{PollerConfig, RemoteErrorPolicy};
use crate::cycle::{CycleContext, CycleOutcome, CycleReport};
use crate::emitter::EventEmitter;
use crate::group::GroupPoller;
use crate::offsets::{OffsetStore, OffsetTable};
use crate::resolver::GroupResolver;
use crate::scheduler::{order, PriorityList};

/// Lifecycle of a [`PollLoop`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Initializing,
    Cycling,
    Stopped,
}

/// Offset-tracked polling over a set of log groups.
pub struct PollLoop {
    config: PollerConfig,
    start_position: StartPosition,
    resolver: GroupResolver,
    poller: GroupPoller,
    clock: Arc<dyn Clock>,
    offsets: OffsetTable,
    priority: PriorityList,
    state: PollState,
}

impl PollLoop {
    /// Creates a loop; fails on invalid configuration.
    pub fn new(
        config: PollerConfig,
        source: Arc<dyn LogSource>,
        emitter: EventEmitter,
        store: OffsetStore,
    ) -> Result<Self> {
        let start_position = config.validate()?;
        let resolver = GroupResolver::new(config.log_groups.clone(), config.log_group_prefix);
        let poller = GroupPoller::new(source, emitter, store, config.lookback_duration_secs);

        Ok(Self {
            config,
            start_position,
            resolver,
            poller,
            clock: Arc::new(SystemClock),
            offsets: OffsetTable::new(),
            priority: PriorityList::new(),
            state: PollState::Initializing,
        })
    }

    /// Replaces the wall clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn offsets(&self) -> &OffsetTable {
        &self.offsets
    }

    pub fn priority(&self) -> &PriorityList {
        &self.priority
    }

    pub fn config(&self) -> &PollerConfig {
        &self.config
    }

    /// Loads persisted offsets and seeds defaults for the initial group set.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.state != PollState::Initializing {
            return Err(Error::internal("poll loop is already initialized"));
        }

        self.offsets = self.poller.store().load();
        info!(
            sincedb_path = %self.poller.store().path().display(),
            groups = self.offsets.len(),
            start_position = %self.start_position,
            "Poll loop initializing"
        );

        let source = Arc::clone(self.poller.source());
        match self.resolver.resolve(source.as_ref()).await {
            Ok(groups) => {
                let now = self.clock.now_millis();
                self.assign_defaults(&groups, now);
            }
            Err(e) if e.is_rate_limited() => {
                warn!(error = %e, "Rate limited while resolving log groups, deferring to first cycle");
            }
            Err(e) if e.is_remote() && self.config.remote_error_policy == RemoteErrorPolicy::Skip => {
                metrics().remote_errors.inc();
                warn!(error = %e, "Failed to resolve log groups, deferring to first cycle");
            }
            Err(e) => {
                if e.is_remote() {
                    metrics().remote_errors.inc();
                }
                error!(error = %e, "Failed to resolve log groups");
                self.state = PollState::Stopped;
                return Err(e);
            }
        }

        metrics().groups_tracked.set(self.offsets.len() as u64);
        self.state = PollState::Cycling;
        Ok(())
    }

    /// Gives every group without an offset its start-position default.
    ///
    /// Returns how many groups were added.
    pub fn assign_defaults(&mut self, groups: &BTreeSet<String>, now_ms: i64) -> usize {
        let offset = self.start_position.default_offset(now_ms);
        let mut added = 0;

        for group in groups {
            if !self.offsets.contains_key(group) {
                debug!(group = %group, offset = offset, "Tracking new log group");
                self.offsets.insert(group.clone(), offset);
                added += 1;
            }
        }

        added
    }

    /// Runs one full cycle.
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        if self.state != PollState::Cycling {
            return Err(Error::internal(format!(
                "cannot run a cycle in state {:?}",
                self.state
            )));
        }

        let cycle_timer = Instant::now();
        let mut ctx = CycleContext::new(self.clock.now_millis());

        let source = Arc::clone(self.poller.source());
        let groups = match self.resolver.resolve(source.as_ref()).await {
            Ok(groups) => groups,
            Err(e) => return self.interrupted(e, ctx, Vec::new(), cycle_timer),
        };

        self.assign_defaults(&groups, ctx.start_ms);
        metrics().groups_tracked.set(self.offsets.len() as u64);

        let scheduled = order(groups, &self.priority);

        let mut failure = None;
        for (idx, group) in scheduled.iter().enumerate() {
            let polled = self
                .poller
                .poll(group, &mut self.offsets, &mut self.priority, &mut ctx)
                .await;

            if let Err(e) = polled {
                failure = Some((idx, e));
                break;
            }
        }

        if let Some((idx, e)) = failure {
            ctx.stats.groups_skipped = (scheduled.len() - idx) as u64;
            return self.interrupted(e, ctx, scheduled, cycle_timer);
        }

        metrics().cycles_completed.inc();
        metrics()
            .cycle_latency_ms
            .observe(cycle_timer.elapsed().as_millis() as u64);

        info!(
            groups = ctx.stats.groups_polled,
            pages = ctx.stats.pages_fetched,
            events = ctx.stats.events_processed,
            records = ctx.stats.records_emitted,
            "Cycle complete"
        );

        Ok(CycleReport {
            outcome: CycleOutcome::Completed,
            stats: ctx.stats,
            scheduled,
        })
    }

    /// Decides whether a failed cycle ends the loop.
    fn interrupted(
        &mut self,
        e: Error,
        ctx: CycleContext,
        scheduled: Vec<String>,
        cycle_timer: Instant,
    ) -> Result<CycleReport> {
        metrics()
            .cycle_latency_ms
            .observe(cycle_timer.elapsed().as_millis() as u64);

        let outcome = if e.is_rate_limited() {
            metrics().cycles_rate_limited.inc();
            warn!(
                error = %e,
                groups_skipped = ctx.stats.groups_skipped,
                "Rate limited, ending cycle early"
            );
            CycleOutcome::RateLimited
        } else if e.is_remote() {
            metrics().remote_errors.inc();
            match self.config.remote_error_policy {
                RemoteErrorPolicy::Skip => {
                    warn!(
                        error = %e,
                        groups_skipped = ctx.stats.groups_skipped,
                        "Remote error, skipping rest of cycle"
                    );
                    CycleOutcome::Skipped(e.to_string())
                }
                RemoteErrorPolicy::Abort => {
                    error!(error = %e, "Remote error, stopping poll loop");
                    self.state = PollState::Stopped;
                    return Err(e);
                }
            }
        } else {
            error!(error = %e, "Poll loop failed");
            self.state = PollState::Stopped;
            return Err(e);
        };

        Ok(CycleReport {
            outcome,
            stats: ctx.stats,
            scheduled,
        })
    }

    /// Cycles until cancelled or a fatal error.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<()> {
        if self.state == PollState::Initializing {
            self.initialize().await?;
        }

        info!(
            interval_secs = self.config.interval_secs,
            lookback_secs = ?self.config.lookback_duration_secs,
            "Poll loop running"
        );

        while !cancel.is_cancelled() {
            self.run_cycle().await?;

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.config.interval()) => {}
            }
        }

        self.state = PollState::Stopped;
        info!("Poll loop stopped");
        Ok(())
    }
}
