//! Mock implementations for testing.

use async_trait::async_trait;
use harvester_core::{EmittedRecord, Error, RawLogEvent, Result};
use log_source::{EventPage, FilterLogEventsRequest, LogGroupPage, LogSource};
use parking_lot::Mutex;
use poller::RecordSink;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

#[derive(Default)]
struct SourceState {
    /// Listing pages per prefix
    listings: HashMap<String, Vec<Vec<String>>>,
    /// Errors returned by the next listing calls, in order
    describe_failures: VecDeque<Error>,
    /// Scripted fetch responses per group, consumed in order
    responses: HashMap<String, VecDeque<Result<EventPage>>>,
    describes: Vec<(String, Option<String>)>,
    fetches: Vec<FilterLogEventsRequest>,
}

/// Scripted remote log service.
///
/// Implements the same `LogSource` trait as `HttpLogSource`. Fetches for a
/// group return the scripted responses in order and an empty last page once
/// the script runs out. Listing tokens are the index of the next page.
#[derive(Clone, Default)]
pub struct MockLogSource {
    state: Arc<Mutex<SourceState>>,
}

impl MockLogSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the listing pages returned for a prefix.
    pub fn set_listing(&self, prefix: &str, pages: &[&[&str]]) {
        let pages = pages
            .iter()
            .map(|page| page.iter().map(|s| s.to_string()).collect())
            .collect();
        self.state.lock().listings.insert(prefix.to_string(), pages);
    }

    /// Makes the next listing call fail.
    pub fn fail_next_describe(&self, error: Error) {
        self.state.lock().describe_failures.push_back(error);
    }

    /// Queues one page of events for a group.
    pub fn push_page(&self, group: &str, events: Vec<RawLogEvent>, next_token: Option<&str>) {
        self.push_response(
            group,
            Ok(EventPage {
                events,
                next_token: next_token.map(String::from),
            }),
        );
    }

    /// Queues a failed fetch for a group.
    pub fn push_error(&self, group: &str, error: Error) {
        self.push_response(group, Err(error));
    }

    /// Queues a throttled fetch for a group.
    pub fn push_rate_limit(&self, group: &str) {
        self.push_error(group, Error::rate_limited("FilterLogEvents", "Rate exceeded"));
    }

    fn push_response(&self, group: &str, response: Result<EventPage>) {
        self.state
            .lock()
            .responses
            .entry(group.to_string())
            .or_default()
            .push_back(response);
    }

    /// Every fetch request received so far.
    pub fn fetches(&self) -> Vec<FilterLogEventsRequest> {
        self.state.lock().fetches.clone()
    }

    /// Fetch requests received for one group.
    pub fn fetches_for(&self, group: &str) -> Vec<FilterLogEventsRequest> {
        self.fetches()
            .into_iter()
            .filter(|r| r.log_group_name == group)
            .collect()
    }

    /// Every listing call received so far, as `(prefix, token)`.
    pub fn describe_calls(&self) -> Vec<(String, Option<String>)> {
        self.state.lock().describes.clone()
    }
}

#[async_trait]
impl LogSource for MockLogSource {
    async fn describe_log_groups(
        &self,
        prefix: &str,
        next_token: Option<String>,
    ) -> Result<LogGroupPage> {
        let mut state = self.state.lock();
        state
            .describes
            .push((prefix.to_string(), next_token.clone()));

        if let Some(error) = state.describe_failures.pop_front() {
            return Err(error);
        }

        let index = match next_token {
            Some(token) => token
                .parse::<usize>()
                .map_err(|_| Error::remote("DescribeLogGroups", "InvalidParameterException", "bad token"))?,
            None => 0,
        };

        let pages = state.listings.get(prefix).cloned().unwrap_or_default();
        let names = pages.get(index).cloned().unwrap_or_default();
        let next_token = (index + 1 < pages.len()).then(|| (index + 1).to_string());

        Ok(LogGroupPage {
            log_group_names: names,
            next_token,
        })
    }

    async fn filter_log_events(&self, request: FilterLogEventsRequest) -> Result<EventPage> {
        let mut state = self.state.lock();
        let group = request.log_group_name.clone();
        state.fetches.push(request);

        state
            .responses
            .get_mut(&group)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Ok(EventPage::default()))
    }
}

/// Sink that keeps every record in memory.
#[derive(Clone, Default)]
pub struct CapturingSink {
    records: Arc<Mutex<Vec<EmittedRecord>>>,
    closed: Arc<Mutex<bool>>,
}

impl CapturingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all captured records.
    pub fn records(&self) -> Vec<EmittedRecord> {
        self.records.lock().clone()
    }

    pub fn record_count(&self) -> usize {
        self.records.lock().len()
    }

    /// Event ids of captured records, in delivery order.
    pub fn event_ids(&self) -> Vec<String> {
        self.records.lock().iter().map(|r| r.event_id.clone()).collect()
    }

    pub fn clear(&self) {
        self.records.lock().clear();
    }

    /// Simulate a downstream consumer that went away.
    pub fn close(&self) {
        *self.closed.lock() = true;
    }
}

#[async_trait]
impl RecordSink for CapturingSink {
    async fn send(&self, record: EmittedRecord) -> Result<()> {
        if *self.closed.lock() {
            return Err(Error::SinkClosed);
        }
        self.records.lock().push(record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[tokio::test]
    async fn test_mock_source_replays_script() {
        let mock = MockLogSource::new();
        mock.push_page("/a", fixtures::events_at(&[1, 2]), Some("t1"));
        mock.push_rate_limit("/a");

        let request = |token: Option<&str>| FilterLogEventsRequest {
            log_group_name: "/a".to_string(),
            start_time: 0,
            next_token: token.map(String::from),
            interleaved: true,
        };

        let first = mock.filter_log_events(request(None)).await.unwrap();
        assert_eq!(first.events.len(), 2);
        assert_eq!(first.next_token.as_deref(), Some("t1"));

        let second = mock.filter_log_events(request(Some("t1"))).await;
        assert!(second.unwrap_err().is_rate_limited());

        let third = mock.filter_log_events(request(None)).await.unwrap();
        assert!(third.events.is_empty());
        assert_eq!(mock.fetches_for("/a").len(), 3);
    }

    #[tokio::test]
    async fn test_mock_source_listing_pages() {
        let mock = MockLogSource::new();
        mock.set_listing("/app/", &[&["/app/a"], &["/app/b"]]);

        let first = mock.describe_log_groups("/app/", None).await.unwrap();
        assert_eq!(first.next_token.as_deref(), Some("1"));
        let second = mock.describe_log_groups("/app/", first.next_token).await.unwrap();
        assert_eq!(second.log_group_names, vec!["/app/b".to_string()]);
        assert!(second.next_token.is_none());
    }

    #[tokio::test]
    async fn test_capturing_sink_close() {
        let sink = CapturingSink::new();
        let record = EmittedRecord::from_raw(&fixtures::event("s", 1, "m"), "/a", Default::default());

        sink.send(record.clone()).await.unwrap();
        sink.close();

        assert!(matches!(sink.send(record).await, Err(Error::SinkClosed)));
        assert_eq!(sink.record_count(), 1);
    }
}
