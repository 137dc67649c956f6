use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use canopy_types::SystemState;
use tracing::trace;

use crate::reducer::{reduce, Action};

/// Callback invoked with the new snapshot after every changing dispatch.
pub type StateListener = Box<dyn Fn(&SystemState) + Send + Sync>;

/// Handle returned by [`StateStore::subscribe`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Sole owner of the system state and its only mutation point.
///
/// Readers get `Arc` snapshots; there is no way to obtain `&mut SystemState`.
pub struct StateStore {
    state: Arc<SystemState>,
    listeners: BTreeMap<SubscriptionId, StateListener>,
    next_subscription: u64,
    dispatches: u64,
}

impl StateStore {
    /// Create a store holding `initial`.
    pub fn new(initial: SystemState) -> Self {
        Self {
            state: Arc::new(initial),
            listeners: BTreeMap::new(),
            next_subscription: 0,
            dispatches: 0,
        }
    }

    /// Current state as a shared, immutable snapshot.
    pub fn snapshot(&self) -> Arc<SystemState> {
        Arc::clone(&self.state)
    }

    /// Run the reducer. Returns whether the state changed; listeners are
    /// notified once per change and never on a no-op.
    pub fn dispatch(&mut self, action: Action) -> bool {
        self.dispatches += 1;
        let next = reduce(&self.state, &action);
        if Arc::ptr_eq(&next, &self.state) {
            trace!(action = action.name(), "Dispatch left state unchanged");
            return false;
        }

        self.state = next;
        trace!(
            action = action.name(),
            listeners = self.listeners.len(),
            "State changed"
        );
        for listener in self.listeners.values() {
            listener(&self.state);
        }
        true
    }

    /// Register a listener called after every changing dispatch.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: Fn(&SystemState) + Send + Sync + 'static,
    {
        self.next_subscription += 1;
        let id = SubscriptionId(self.next_subscription);
        self.listeners.insert(id, Box::new(listener));
        id
    }

    /// Returns false if the subscription was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    /// Registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Total dispatches, including no-ops.
    pub fn dispatch_count(&self) -> u64 {
        self.dispatches
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(SystemState::default())
    }
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("state", &self.state)
            .field("listeners", &self.listeners.len())
            .field("dispatches", &self.dispatches)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reducer::NewWindow;
    use canopy_types::{
        Bounds, CapabilityId, CognitiveMode, CorrelationId, Position, Size, SpaceId, WindowId,
    };
    use proptest::prelude::*;
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn listeners_fire_once_per_change_only() {
        let mut store = StateStore::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        store.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert!(store.dispatch(Action::SetCognitiveMode(CognitiveMode::Focused)));
        assert!(!store.dispatch(Action::SetCognitiveMode(CognitiveMode::Focused)));
        assert!(!store.dispatch(Action::Noop));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.dispatch_count(), 3);
    }

    #[test]
    fn unsubscribed_listener_is_not_called() {
        let mut store = StateStore::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);
        let id = store.subscribe(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert!(store.unsubscribe(id));
        assert!(!store.unsubscribe(id));
        store.dispatch(Action::SetCognitiveMode(CognitiveMode::Alert));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn snapshots_are_immutable_values() {
        let mut store = StateStore::default();
        let before = store.snapshot();
        store.dispatch(Action::SetCognitiveMode(CognitiveMode::Multitask));
        assert_eq!(before.cognitive_mode, CognitiveMode::Calm);
        assert_eq!(store.snapshot().cognitive_mode, CognitiveMode::Multitask);
    }

    fn window_id() -> impl Strategy<Value = WindowId> {
        (1u64..6).prop_map(WindowId::from_sequence)
    }

    fn space_id() -> impl Strategy<Value = SpaceId> {
        prop::sample::select(vec!["default", "ops", "lab"]).prop_map(SpaceId::from)
    }

    fn action() -> impl Strategy<Value = Action> {
        prop_oneof![
            (prop::sample::select(vec!["core.finder", "core.settings"]), space_id()).prop_map(
                |(cap, space)| Action::CreateWindow(NewWindow {
                    capability_id: CapabilityId::from(cap),
                    space_id: space,
                    context_id: None,
                    title: cap.to_string(),
                    bounds: Bounds::new(Position::new(0, 0), Size::new(400, 300)),
                    min_size: Size::new(100, 100),
                    opened_by: CorrelationId::from("c-prop"),
                })
            ),
            window_id().prop_map(|window_id| Action::FocusWindow { window_id }),
            window_id().prop_map(|window_id| Action::CloseWindow { window_id }),
            window_id().prop_map(|window_id| Action::MinimizeWindow { window_id }),
            window_id().prop_map(|window_id| Action::RestoreWindow { window_id }),
            window_id().prop_map(|window_id| Action::HideWindow { window_id }),
            (window_id(), space_id())
                .prop_map(|(window_id, space_id)| Action::MoveWindowToSpace { window_id, space_id }),
            space_id().prop_map(|space_id| Action::SwitchSpace { space_id }),
            Just(Action::ClearFocus),
            Just(Action::Noop),
        ]
    }

    proptest! {
        #[test]
        fn replaying_actions_is_deterministic(actions in prop::collection::vec(action(), 0..40)) {
            let mut first = StateStore::default();
            let mut second = StateStore::default();
            for a in &actions {
                first.dispatch(a.clone());
            }
            for a in &actions {
                second.dispatch(a.clone());
            }
            prop_assert_eq!(&*first.snapshot(), &*second.snapshot());
        }

        #[test]
        fn z_order_and_focus_stay_consistent(actions in prop::collection::vec(action(), 0..40)) {
            let mut store = StateStore::default();
            for a in actions {
                store.dispatch(a);
                let state = store.snapshot();

                let zs: Vec<u32> = state
                    .window_order
                    .iter()
                    .map(|id| state.windows[id].z_index)
                    .collect();
                prop_assert!(zs.windows(2).all(|pair| pair[0] < pair[1]));
                prop_assert_eq!(state.window_order.len(), state.windows.len());
                let unique: BTreeSet<_> = state.window_order.iter().collect();
                prop_assert_eq!(unique.len(), state.windows.len());

                if let Some(focused) = state.focused_window() {
                    prop_assert!(focused.is_active());
                    prop_assert_eq!(&focused.space_id, &state.active_space_id);
                }

                let total: u32 = state.active_capabilities.values().sum();
                prop_assert_eq!(total as usize, state.windows.len());
            }
        }
    }
}
