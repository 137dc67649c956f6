use std::collections::VecDeque;

use canopy_types::{ChainId, SystemEvent};
use tracing::{debug, warn};

use crate::error::Result;
use crate::ledger::AuditLedger;
use crate::record::AuditRecord;
use crate::sink::AuditSink;

/// Turns kernel events into chained audit records.
///
/// Every `DECISION_EXPLAINED` payload is appended to the ledger, which is
/// the authoritative record. All events are also mirrored to a `debug`
/// tracing line; that side channel is informational only.
#[derive(Debug)]
pub struct AuditCollector {
    ledger: AuditLedger,
    outbox: VecDeque<AuditRecord>,
    observed: u64,
}

impl AuditCollector {
    /// Collector over a fresh ledger for `chain_id`.
    pub fn new(chain_id: impl Into<ChainId>) -> Self {
        Self::with_ledger(AuditLedger::new(chain_id))
    }

    /// Collector that continues an existing ledger.
    pub fn with_ledger(ledger: AuditLedger) -> Self {
        Self {
            ledger,
            outbox: VecDeque::new(),
            observed: 0,
        }
    }

    /// Observe one event. Returns the record it produced, if any.
    pub fn observe(&mut self, event: &SystemEvent) -> Result<Option<AuditRecord>> {
        self.observed += 1;
        debug!(
            kind = event.kind(),
            correlation_id = %event.correlation_id,
            timestamp = event.timestamp,
            "Audit side channel"
        );

        let Some(explanation) = event.explanation() else {
            return Ok(None);
        };
        let record = self.ledger.record(explanation, event.timestamp)?.clone();
        self.outbox.push_back(record.clone());
        Ok(Some(record))
    }

    /// Observe events in order; stops at the first integrity error.
    pub fn observe_all<'a, I>(&mut self, events: I) -> Result<usize>
    where
        I: IntoIterator<Item = &'a SystemEvent>,
    {
        let mut recorded = 0;
        for event in events {
            if self.observe(event)?.is_some() {
                recorded += 1;
            }
        }
        Ok(recorded)
    }

    /// Ship queued records to `sink` in seq order. Records the sink rejects
    /// stay queued for the next flush.
    pub async fn flush(&mut self, sink: &dyn AuditSink) -> Result<usize> {
        let mut shipped = 0;
        while let Some(record) = self.outbox.front() {
            if let Err(err) = sink.write(record).await {
                warn!(
                    seq = record.seq,
                    pending = self.outbox.len(),
                    error = %err,
                    "Audit sink write failed; records kept for retry"
                );
                return Err(err);
            }
            self.outbox.pop_front();
            shipped += 1;
        }
        sink.flush().await?;
        Ok(shipped)
    }

    /// Records sealed but not yet shipped.
    pub fn pending(&self) -> usize {
        self.outbox.len()
    }

    /// Events seen, recorded or not.
    pub fn observed(&self) -> u64 {
        self.observed
    }

    /// The authoritative ledger.
    pub fn ledger(&self) -> &AuditLedger {
        &self.ledger
    }

    /// The ledger, mutably, for rotation.
    pub fn ledger_mut(&mut self) -> &mut AuditLedger {
        &mut self.ledger
    }
}
