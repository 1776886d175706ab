//! Draining one group.
//!
//! Without lookback the offset follows the newest emitted event (`ts + 1`)
//! and is persisted after every page, so a restart resumes mid-group. Events
//! sharing the last emitted millisecond that only become visible after the
//! fetch are skipped in this mode; lookback mode re-reads a sliding window
//! instead and persists once the group is drained.

use harvester_core::{Offset, Result};
use log_source::{FilterLogEventsRequest, LogSource};
use std::sync::Arc;
use std::time::Instant;
use telemetry::metrics;
use tracing::debug;

use crate::cycle::CycleContext;
use crate::emitter::EventEmitter;
use crate::offsets::{OffsetStore, OffsetTable};
use crate::scheduler::PriorityList;

/// Offset a lookback-mode group is left at after a cycle.
pub fn lookback_offset(cycle_start_ms: Offset, lookback_secs: u64) -> Offset {
    let window_ms = i64::try_from(lookback_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
    cycle_start_ms.saturating_sub(window_ms)
}

/// Fetches, emits and checkpoints one group at a time.
pub struct GroupPoller {
    source: Arc<dyn LogSource>,
    emitter: EventEmitter,
    store: OffsetStore,
    lookback_secs: Option<u64>,
}

impl GroupPoller {
    pub fn new(
        source: Arc<dyn LogSource>,
        emitter: EventEmitter,
        store: OffsetStore,
        lookback_secs: Option<u64>,
    ) -> Self {
        Self {
            source,
            emitter,
            store,
            lookback_secs,
        }
    }

    pub fn store(&self) -> &OffsetStore {
        &self.store
    }

    pub fn source(&self) -> &Arc<dyn LogSource> {
        &self.source
    }

    /// Drains a group from its stored offset.
    ///
    /// Any error leaves the group where it is in the priority list; offsets
    /// advanced by earlier pages stay in the table.
    pub async fn poll(
        &self,
        group: &str,
        offsets: &mut OffsetTable,
        priority: &mut PriorityList,
        ctx: &mut CycleContext,
    ) -> Result<()> {
        let mut next_token: Option<String> = None;
        let mut pages = 0u64;

        loop {
            let start_time = *offsets.entry(group.to_string()).or_insert(0);
            let request = FilterLogEventsRequest {
                log_group_name: group.to_string(),
                start_time,
                next_token: next_token.take(),
                interleaved: true,
            };

            let fetch_start = Instant::now();
            let page = self.source.filter_log_events(request).await?;
            metrics()
                .fetch_latency_ms
                .observe(fetch_start.elapsed().as_millis() as u64);
            metrics().pages_fetched.inc();
            ctx.stats.pages_fetched += 1;
            pages += 1;

            debug!(
                group = %group,
                start_time = start_time,
                events = page.events.len(),
                has_next = page.next_token.is_some(),
                "Fetched page"
            );

            for event in &page.events {
                self.emitter.emit(event, group, &mut ctx.stats).await?;

                if self.lookback_secs.is_none() {
                    let offset = offsets.entry(group.to_string()).or_insert(0);
                    *offset = (*offset).max(event.timestamp.saturating_add(1));
                }
            }

            if self.lookback_secs.is_none() {
                self.store.save(offsets);
            }

            match page.next_token {
                Some(token) => next_token = Some(token),
                None => break,
            }
        }

        if let Some(secs) = self.lookback_secs {
            let offset = lookback_offset(ctx.start_ms, secs);
            offsets.insert(group.to_string(), offset);
            self.store.save(offsets);
        }

        priority.mark_serviced(group);
        ctx.stats.groups_polled += 1;
        metrics().groups_polled.inc();

        debug!(
            group = %group,
            pages = pages,
            offset = offsets.get(group).copied().unwrap_or_default(),
            "Group drained"
        );

        Ok(())
    }
}
