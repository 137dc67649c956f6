//! Kernel event bus.
//!
//! Events land in an outbox that the application context drains after each
//! intent, and are broadcast to any live receivers.

use std::collections::BTreeMap;

use canopy_types::SystemEvent;
use tokio::sync::broadcast;
use tracing::debug;

use crate::config::DEFAULT_EVENT_CHANNEL_CAPACITY;

pub struct EventBus {
    outbox: Vec<SystemEvent>,
    sender: broadcast::Sender<SystemEvent>,
    published: u64,
    counts: BTreeMap<&'static str, u64>,
}

impl EventBus {
    /// Bus with the default broadcast capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_EVENT_CHANNEL_CAPACITY)
    }

    /// Bus whose broadcast channel buffers `capacity` events per receiver.
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            outbox: Vec::new(),
            sender,
            published: 0,
            counts: BTreeMap::new(),
        }
    }

    /// Queue `event` in the outbox and broadcast it to live receivers.
    pub fn publish(&mut self, event: SystemEvent) {
        debug!(
            correlation_id = %event.correlation_id,
            event = event.kind(),
            "Event published"
        );
        self.published += 1;
        *self.counts.entry(event.kind()).or_insert(0) += 1;
        self.outbox.push(event.clone());
        // No receivers is fine.
        let _ = self.sender.send(event);
    }

    /// New broadcast receiver; sees events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<SystemEvent> {
        self.sender.subscribe()
    }

    /// Drain the outbox in publication order.
    pub fn take_events(&mut self) -> Vec<SystemEvent> {
        std::mem::take(&mut self.outbox)
    }

    /// Events not yet drained.
    pub fn pending(&self) -> &[SystemEvent] {
        &self.outbox
    }

    /// Total events published since creation.
    pub fn published(&self) -> u64 {
        self.published
    }

    /// Events published of one kind, e.g. `"WINDOW_CREATED"`.
    pub fn count_of(&self, kind: &str) -> u64 {
        self.counts.get(kind).copied().unwrap_or(0)
    }

    /// Live broadcast receivers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canopy_types::{CorrelationId, EventPayload};

    fn locked(cid: &str) -> SystemEvent {
        SystemEvent::new(CorrelationId::from(cid), 1, EventPayload::SystemLocked)
    }

    #[test]
    fn outbox_drains_in_order() {
        let mut bus = EventBus::new();
        bus.publish(locked("c-1"));
        bus.publish(locked("c-2"));

        let drained = bus.take_events();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].correlation_id.as_str(), "c-1");
        assert!(bus.take_events().is_empty());
        assert_eq!(bus.published(), 2);
        assert_eq!(bus.count_of("SYSTEM_LOCKED"), 2);
    }

    #[tokio::test]
    async fn subscribers_receive_broadcasts() {
        let mut bus = EventBus::new();
        let mut rx = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        bus.publish(locked("c-9"));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.correlation_id.as_str(), "c-9");
    }
}
