//! Downstream record sinks.

use async_trait::async_trait;
use harvester_core::{EmittedRecord, Error, Result};
use tokio::sync::mpsc;

/// Receives emitted records.
///
/// Back-pressure is the sink's business: `send` may wait as long as it needs.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn send(&self, record: EmittedRecord) -> Result<()>;
}

/// Sink over a bounded channel.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<EmittedRecord>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<EmittedRecord>) -> Self {
        Self { tx }
    }

    /// Creates a sink and the receiving end of its channel.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<EmittedRecord>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl RecordSink for ChannelSink {
    async fn send(&self, record: EmittedRecord) -> Result<()> {
        self.tx.send(record).await.map_err(|_| Error::SinkClosed)
    }
}
