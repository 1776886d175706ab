//! The two remote operations the poll loop depends on.

use async_trait::async_trait;
use harvester_core::{Offset, RawLogEvent, Result};

/// One page of log group names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogGroupPage {
    pub log_group_names: Vec<String>,
    /// Present when more groups match the prefix
    pub next_token: Option<String>,
}

/// Parameters of a paginated event fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterLogEventsRequest {
    pub log_group_name: String,
    /// Only events at or after this time (ms since epoch)
    pub start_time: Offset,
    pub next_token: Option<String>,
    /// Merge events from all streams ordered by timestamp
    pub interleaved: bool,
}

/// One page of events.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPage {
    pub events: Vec<RawLogEvent>,
    /// Present when more events are available for this request
    pub next_token: Option<String>,
}

/// Remote log service.
///
/// Throttling must surface as [`harvester_core::Error::RateLimited`] so the
/// poll loop can absorb it; every other failure is propagated as is.
#[async_trait]
pub trait LogSource: Send + Sync {
    /// Lists groups whose name starts with `prefix`.
    async fn describe_log_groups(
        &self,
        prefix: &str,
        next_token: Option<String>,
    ) -> Result<LogGroupPage>;

    /// Fetches one page of events for a group.
    async fn filter_log_events(&self, request: FilterLogEventsRequest) -> Result<EventPage>;
}
