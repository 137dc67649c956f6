use std::sync::Arc;

use canopy_types::{Clock, CorrelationId, EventPayload, SystemEvent, SystemState};

use crate::events::EventBus;
use crate::reducer::Action;
use crate::store::StateStore;

/// The mutable pieces the kernel and window manager share: the store, the
/// event bus and the clock.
pub struct KernelContext {
    store: StateStore,
    events: EventBus,
    clock: Arc<dyn Clock>,
}

impl KernelContext {
    /// Bundle a store, an event bus and a clock.
    pub fn new(store: StateStore, events: EventBus, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            events,
            clock,
        }
    }

    /// Current state snapshot.
    pub fn snapshot(&self) -> Arc<SystemState> {
        self.store.snapshot()
    }

    /// Apply an action through the store. Returns whether state changed.
    pub fn dispatch(&mut self, action: Action) -> bool {
        self.store.dispatch(action)
    }

    /// Publish an event stamped with the current time.
    pub fn publish(&mut self, correlation_id: &CorrelationId, payload: EventPayload) {
        let event = SystemEvent::new(correlation_id.clone(), self.clock.now_ms(), payload);
        self.events.publish(event);
    }

    /// Current time from the injected clock.
    pub fn now_ms(&self) -> i64 {
        self.clock.now_ms()
    }

    /// The state store.
    pub fn store(&self) -> &StateStore {
        &self.store
    }

    /// The state store, mutably, for subscription management.
    pub fn store_mut(&mut self) -> &mut StateStore {
        &mut self.store
    }

    /// The event bus.
    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The event bus, mutably, for draining.
    pub fn events_mut(&mut self) -> &mut EventBus {
        &mut self.events
    }
}
