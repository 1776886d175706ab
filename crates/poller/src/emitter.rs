//! Raw event to downstream records.

use harvester_core::{EmittedRecord, RawLogEvent, Result};
use std::sync::Arc;
use telemetry::metrics;

use crate::cycle::CycleStats;
use crate::decoder::Decoder;
use crate::sink::RecordSink;

/// Decodes raw events and hands the resulting records to the sink.
#[derive(Clone)]
pub struct EventEmitter {
    decoder: Arc<dyn Decoder>,
    sink: Arc<dyn RecordSink>,
}

impl EventEmitter {
    pub fn new(decoder: Arc<dyn Decoder>, sink: Arc<dyn RecordSink>) -> Self {
        Self { decoder, sink }
    }

    /// One record per decoded payload, in decoder order.
    pub fn build_records(&self, event: &RawLogEvent, group: &str) -> Vec<EmittedRecord> {
        self.decoder
            .decode(&event.message)
            .into_iter()
            .map(|payload| EmittedRecord::from_raw(event, group, payload))
            .collect()
    }

    /// Emits every record of one event; returns how many were sent.
    pub async fn emit(
        &self,
        event: &RawLogEvent,
        group: &str,
        stats: &mut CycleStats,
    ) -> Result<usize> {
        let records = self.build_records(event, group);
        let count = records.len();

        for record in records {
            self.sink.send(record).await?;
            stats.records_emitted += 1;
            metrics().records_emitted.inc();
        }

        stats.events_processed += 1;
        metrics().events_processed.inc();

        Ok(count)
    }
}
