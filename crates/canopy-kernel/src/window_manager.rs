//! Window lifecycle against manifests and space scoping.
//!
//! Contract violations (unknown window, cross-space restore, a
//! `multi_by_context` open without a context) return `None`, `false` or `0`
//! and leave state untouched. Every space-scoped query reads only the active
//! space.

use std::collections::BTreeSet;
use std::sync::Arc;

use canopy_capability::CapabilityGraph;
use canopy_types::{
    CapabilityId, ContextId, CorrelationId, EventPayload, Position, Size, SpaceId, SystemState,
    WindowId, WindowMode, WindowState,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::context::KernelContext;
use crate::layout::LayoutConfig;
use crate::reducer::{Action, NewWindow};

/// A dock-visible capability and whether it runs in the active space.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockEntry {
    pub capability_id: CapabilityId,
    pub title: String,
    pub window_mode: WindowMode,
    pub running: bool,
    pub window_count: usize,
}

pub struct WindowManager {
    capabilities: Arc<CapabilityGraph>,
    layout: LayoutConfig,
}

impl WindowManager {
    /// Window manager over a validated capability graph.
    pub fn new(capabilities: Arc<CapabilityGraph>, layout: LayoutConfig) -> Self {
        Self {
            capabilities,
            layout,
        }
    }

    /// Placement settings used for new and maximized windows.
    pub fn layout(&self) -> &LayoutConfig {
        &self.layout
    }

    /// Open a capability according to its window mode. Returns the window
    /// that is now showing it, or `None` when no window applies.
    pub fn open_window(
        &self,
        ctx: &mut KernelContext,
        correlation_id: &CorrelationId,
        capability_id: &CapabilityId,
        context_id: Option<&ContextId>,
        space_id: Option<&SpaceId>,
    ) -> Option<WindowId> {
        let Some(manifest) = self.capabilities.get(capability_id) else {
            debug!(capability_id = %capability_id, "Open ignored: unknown capability");
            return None;
        };
        let state = ctx.snapshot();
        let target = space_id
            .cloned()
            .unwrap_or_else(|| state.active_space_id.clone());

        let existing = match manifest.window_mode {
            WindowMode::BackgroundOnly => {
                debug!(capability_id = %capability_id, "Background capability has no window");
                return None;
            }
            WindowMode::Single => state
                .find_window(capability_id, &target, None)
                .map(|w| w.id.clone()),
            WindowMode::MultiByContext => {
                let Some(context) = context_id else {
                    debug!(
                        capability_id = %capability_id,
                        "Open rejected: multi_by_context capability needs a context id"
                    );
                    return None;
                };
                state
                    .find_window(capability_id, &target, Some(context))
                    .map(|w| w.id.clone())
            }
            WindowMode::Multi => None,
        };

        if let Some(window_id) = existing {
            self.focus_window(ctx, correlation_id, &window_id);
            return Some(window_id);
        }

        let existing_in_space = state.windows_in_space(&target).count();
        let bounds =
            self.layout
                .initial_bounds(existing_in_space, manifest.default_size, manifest.min_size);
        let context_id = match manifest.window_mode {
            WindowMode::MultiByContext => context_id.cloned(),
            _ => None,
        };
        ctx.dispatch(Action::CreateWindow(NewWindow {
            capability_id: capability_id.clone(),
            space_id: target.clone(),
            context_id,
            title: manifest.title.clone(),
            bounds,
            min_size: manifest.min_size,
            opened_by: correlation_id.clone(),
        }));

        let window_id = WindowId::from_sequence(ctx.snapshot().window_seq);
        info!(
            correlation_id = %correlation_id,
            window_id = %window_id,
            capability_id = %capability_id,
            space_id = %target,
            "Window created"
        );
        ctx.publish(
            correlation_id,
            EventPayload::WindowCreated {
                window_id: window_id.clone(),
                capability_id: capability_id.clone(),
                space_id: target,
            },
        );
        Some(window_id)
    }

    /// Focus an active window of the active space.
    pub fn focus_window(
        &self,
        ctx: &mut KernelContext,
        correlation_id: &CorrelationId,
        window_id: &WindowId,
    ) -> bool {
        let state = ctx.snapshot();
        let focusable = state
            .window(window_id)
            .is_some_and(|w| w.is_active() && w.in_space(&state.active_space_id));
        if !focusable {
            return false;
        }
        if ctx.dispatch(Action::FocusWindow {
            window_id: window_id.clone(),
        }) {
            ctx.publish(
                correlation_id,
                EventPayload::WindowFocused {
                    window_id: window_id.clone(),
                },
            );
        }
        true
    }

    /// Close a window in any space. Returns false if it does not exist.
    pub fn close_window(
        &self,
        ctx: &mut KernelContext,
        correlation_id: &CorrelationId,
        window_id: &WindowId,
    ) -> bool {
        let Some(capability_id) = ctx
            .snapshot()
            .window(window_id)
            .map(|w| w.capability_id.clone())
        else {
            return false;
        };
        ctx.dispatch(Action::CloseWindow {
            window_id: window_id.clone(),
        });
        info!(correlation_id = %correlation_id, window_id = %window_id, "Window closed");
        ctx.publish(
            correlation_id,
            EventPayload::WindowClosed {
                window_id: window_id.clone(),
                capability_id,
            },
        );
        true
    }

    /// Minimize an active window; focus passes to the next window in its space.
    pub fn minimize_window(
        &self,
        ctx: &mut KernelContext,
        correlation_id: &CorrelationId,
        window_id: &WindowId,
    ) -> bool {
        self.transition(
            ctx,
            correlation_id,
            Action::MinimizeWindow {
                window_id: window_id.clone(),
            },
            EventPayload::WindowMinimized {
                window_id: window_id.clone(),
            },
        )
    }

    /// Hide a window. Hidden windows are not restored by restore operations.
    pub fn hide_window(
        &self,
        ctx: &mut KernelContext,
        correlation_id: &CorrelationId,
        window_id: &WindowId,
    ) -> bool {
        self.transition(
            ctx,
            correlation_id,
            Action::HideWindow {
                window_id: window_id.clone(),
            },
            EventPayload::WindowHidden {
                window_id: window_id.clone(),
            },
        )
    }

    /// Restore a minimized window of the active space and focus it.
    ///
    /// Fails closed for missing windows, windows in another space and windows
    /// that are not minimized.
    pub fn restore_window_by_id(
        &self,
        ctx: &mut KernelContext,
        correlation_id: &CorrelationId,
        window_id: &WindowId,
    ) -> bool {
        let state = ctx.snapshot();
        let Some(window) = state.window(window_id) else {
            return false;
        };
        if !window.in_space(&state.active_space_id) || window.state != WindowState::Minimized {
            debug!(
                window_id = %window_id,
                space_id = %window.space_id,
                active_space = %state.active_space_id,
                state = ?window.state,
                "Restore refused"
            );
            return false;
        }
        self.transition(
            ctx,
            correlation_id,
            Action::RestoreWindow {
                window_id: window_id.clone(),
            },
            EventPayload::WindowRestored {
                window_id: window_id.clone(),
            },
        )
    }

    /// Restore every minimized window of the active space, bottom to top.
    pub fn restore_all_in_active_space(
        &self,
        ctx: &mut KernelContext,
        correlation_id: &CorrelationId,
    ) -> usize {
        let state = ctx.snapshot();
        let minimized: Vec<WindowId> = state
            .windows_in_space(&state.active_space_id)
            .filter(|w| w.state == WindowState::Minimized)
            .map(|w| w.id.clone())
            .collect();
        minimized
            .iter()
            .filter(|id| self.restore_window_by_id(ctx, correlation_id, id))
            .count()
    }

    /// Minimize every active window of the active space.
    pub fn minimize_all_in_active_space(
        &self,
        ctx: &mut KernelContext,
        correlation_id: &CorrelationId,
    ) -> usize {
        let state = ctx.snapshot();
        let active: Vec<WindowId> = state
            .active_windows_in_active_space()
            .iter()
            .map(|w| w.id.clone())
            .collect();
        active
            .iter()
            .filter(|id| self.minimize_window(ctx, correlation_id, id))
            .count()
    }

    /// Close every window of the active space. Returns the number closed.
    pub fn close_all_in_active_space(
        &self,
        ctx: &mut KernelContext,
        correlation_id: &CorrelationId,
    ) -> usize {
        let state = ctx.snapshot();
        let ids: Vec<WindowId> = state
            .windows_in_space(&state.active_space_id)
            .map(|w| w.id.clone())
            .collect();
        ids.iter()
            .filter(|id| self.close_window(ctx, correlation_id, id))
            .count()
    }

    /// Minimize the active space's windows and drop focus. Other spaces are
    /// left alone.
    pub fn escape_to_calm(&self, ctx: &mut KernelContext, correlation_id: &CorrelationId) -> usize {
        let minimized = self.minimize_all_in_active_space(ctx, correlation_id);
        self.clear_focus(ctx, correlation_id);
        minimized
    }

    /// Drop focus without changing any window.
    pub fn clear_focus(&self, ctx: &mut KernelContext, correlation_id: &CorrelationId) -> bool {
        if ctx.dispatch(Action::ClearFocus) {
            ctx.publish(correlation_id, EventPayload::FocusCleared);
            return true;
        }
        false
    }

    /// Fill the workspace, remembering the current bounds.
    pub fn maximize_window(
        &self,
        ctx: &mut KernelContext,
        correlation_id: &CorrelationId,
        window_id: &WindowId,
    ) -> bool {
        self.transition(
            ctx,
            correlation_id,
            Action::MaximizeWindow {
                window_id: window_id.clone(),
                bounds: self.layout.maximized_bounds(),
            },
            EventPayload::WindowMaximized {
                window_id: window_id.clone(),
            },
        )
    }

    /// Return a maximized window to its remembered bounds.
    pub fn unmaximize_window(
        &self,
        ctx: &mut KernelContext,
        correlation_id: &CorrelationId,
        window_id: &WindowId,
    ) -> bool {
        self.transition(
            ctx,
            correlation_id,
            Action::UnmaximizeWindow {
                window_id: window_id.clone(),
            },
            EventPayload::WindowUnmaximized {
                window_id: window_id.clone(),
            },
        )
    }

    /// Move a window to `position`.
    pub fn move_window(
        &self,
        ctx: &mut KernelContext,
        correlation_id: &CorrelationId,
        window_id: &WindowId,
        position: Position,
    ) -> bool {
        self.transition(
            ctx,
            correlation_id,
            Action::MoveWindow {
                window_id: window_id.clone(),
                position,
            },
            EventPayload::WindowMoved {
                window_id: window_id.clone(),
                position,
            },
        )
    }

    /// Resize, clamped to the window's minimum size.
    pub fn resize_window(
        &self,
        ctx: &mut KernelContext,
        correlation_id: &CorrelationId,
        window_id: &WindowId,
        size: Size,
    ) -> bool {
        let Some(min_size) = ctx.snapshot().window(window_id).map(|w| w.min_size) else {
            return false;
        };
        let size = size.clamp_min(min_size);
        self.transition(
            ctx,
            correlation_id,
            Action::ResizeWindow {
                window_id: window_id.clone(),
                size,
            },
            EventPayload::WindowResized {
                window_id: window_id.clone(),
                size,
            },
        )
    }

    /// The only way a window changes space.
    pub fn move_window_to_space(
        &self,
        ctx: &mut KernelContext,
        correlation_id: &CorrelationId,
        window_id: &WindowId,
        space_id: &SpaceId,
    ) -> bool {
        let Some(from) = ctx.snapshot().window(window_id).map(|w| w.space_id.clone()) else {
            return false;
        };
        self.transition(
            ctx,
            correlation_id,
            Action::MoveWindowToSpace {
                window_id: window_id.clone(),
                space_id: space_id.clone(),
            },
            EventPayload::WindowMovedToSpace {
                window_id: window_id.clone(),
                from,
                to: space_id.clone(),
            },
        )
    }

    /// Make `space_id` the active space and focus its topmost active window.
    pub fn switch_space(
        &self,
        ctx: &mut KernelContext,
        correlation_id: &CorrelationId,
        space_id: &SpaceId,
    ) -> bool {
        let from = ctx.snapshot().active_space_id.clone();
        let switched = self.transition(
            ctx,
            correlation_id,
            Action::SwitchSpace {
                space_id: space_id.clone(),
            },
            EventPayload::SpaceSwitched {
                from: from.clone(),
                to: space_id.clone(),
            },
        );
        if switched {
            info!(correlation_id = %correlation_id, from = %from, to = %space_id, "Space switched");
        }
        switched
    }

    /// Focus the next active window by z-order, wrapping.
    pub fn focus_next(
        &self,
        ctx: &mut KernelContext,
        correlation_id: &CorrelationId,
    ) -> Option<WindowId> {
        self.cycle(ctx, correlation_id, 1)
    }

    /// Focus the previous active window by z-order, wrapping.
    pub fn focus_previous(
        &self,
        ctx: &mut KernelContext,
        correlation_id: &CorrelationId,
    ) -> Option<WindowId> {
        self.cycle(ctx, correlation_id, -1)
    }

    /// Focus the `index`-th active window of the active space, counting from
    /// the bottom of the stack.
    pub fn focus_by_index(
        &self,
        ctx: &mut KernelContext,
        correlation_id: &CorrelationId,
        index: usize,
    ) -> Option<WindowId> {
        let window_id = Self::focusable_windows(&ctx.snapshot()).get(index).cloned()?;
        self.focus_window(ctx, correlation_id, &window_id)
            .then_some(window_id)
    }

    fn cycle(
        &self,
        ctx: &mut KernelContext,
        correlation_id: &CorrelationId,
        step: isize,
    ) -> Option<WindowId> {
        let state = ctx.snapshot();
        let windows = Self::focusable_windows(&state);
        if windows.is_empty() {
            return None;
        }
        let len = windows.len() as isize;
        let current = state
            .focused_window_id
            .as_ref()
            .and_then(|focused| windows.iter().position(|id| id == focused));
        let index = match current {
            Some(i) => (i as isize + step).rem_euclid(len),
            None if step >= 0 => 0,
            None => len - 1,
        };
        let window_id = windows[index as usize].clone();
        self.focus_window(ctx, correlation_id, &window_id)
            .then_some(window_id)
    }

    fn transition(
        &self,
        ctx: &mut KernelContext,
        correlation_id: &CorrelationId,
        action: Action,
        event: EventPayload,
    ) -> bool {
        if !ctx.dispatch(action) {
            return false;
        }
        ctx.publish(correlation_id, event);
        true
    }

    /// Active windows of the active space, bottom to top.
    pub fn focusable_windows(state: &SystemState) -> Vec<WindowId> {
        state
            .active_windows_in_active_space()
            .into_iter()
            .map(|w| w.id.clone())
            .collect()
    }

    /// Capabilities with at least one window in the active space.
    pub fn running_capability_ids(state: &SystemState) -> Vec<CapabilityId> {
        state
            .windows_in_space(&state.active_space_id)
            .map(|w| w.capability_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Dock listing, with running state scoped to the active space.
    pub fn discoverable_capabilities(&self, state: &SystemState) -> Vec<DockEntry> {
        self.capabilities
            .dock_capabilities()
            .into_iter()
            .map(|manifest| {
                let window_count = state
                    .windows_in_space(&state.active_space_id)
                    .filter(|w| w.capability_id == manifest.id)
                    .count();
                DockEntry {
                    capability_id: manifest.id.clone(),
                    title: manifest.title.clone(),
                    window_mode: manifest.window_mode,
                    running: window_count > 0,
                    window_count,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventBus;
    use crate::store::StateStore;
    use canopy_types::ManualClock;

    struct Fixture {
        ctx: KernelContext,
        wm: WindowManager,
        cid: CorrelationId,
    }

    impl Fixture {
        fn new() -> Self {
            let graph = Arc::new(CapabilityGraph::with_defaults().unwrap());
            Self {
                ctx: KernelContext::new(
                    StateStore::default(),
                    EventBus::new(),
                    Arc::new(ManualClock::new(1_000)),
                ),
                wm: WindowManager::new(graph, LayoutConfig::default()),
                cid: CorrelationId::from("c-test"),
            }
        }

        fn open(&mut self, cap: &str) -> Option<WindowId> {
            self.wm
                .open_window(&mut self.ctx, &self.cid, &CapabilityId::from(cap), None, None)
        }

        fn switch(&mut self, space: &str) -> bool {
            self.wm
                .switch_space(&mut self.ctx, &self.cid, &SpaceId::from(space))
        }
    }

    #[test]
    fn single_mode_reuses_window_within_a_space() {
        let mut f = Fixture::new();
        let first = f.open("core.settings").unwrap();
        let second = f.open("core.settings").unwrap();
        assert_eq!(first, second);
        assert_eq!(f.ctx.snapshot().windows.len(), 1);
    }

    #[test]
    fn single_mode_opens_one_window_per_space() {
        let mut f = Fixture::new();
        let first = f.open("core.settings").unwrap();
        f.switch("ops");
        let second = f.open("core.settings").unwrap();
        assert_ne!(first, second);
        assert_eq!(f.ctx.snapshot().windows.len(), 2);
    }

    #[test]
    fn multi_mode_always_creates() {
        let mut f = Fixture::new();
        let a = f.open("core.finder").unwrap();
        let b = f.open("core.finder").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn multi_by_context_needs_a_context() {
        let mut f = Fixture::new();
        let cap = CapabilityId::from("user.profile");
        assert!(f.wm.open_window(&mut f.ctx, &f.cid, &cap, None, None).is_none());
        assert!(f.ctx.snapshot().windows.is_empty());

        let alice = ContextId::from("alice");
        let bob = ContextId::from("bob");
        let a1 = f.wm.open_window(&mut f.ctx, &f.cid, &cap, Some(&alice), None);
        let a2 = f.wm.open_window(&mut f.ctx, &f.cid, &cap, Some(&alice), None);
        let b1 = f.wm.open_window(&mut f.ctx, &f.cid, &cap, Some(&bob), None);
        assert_eq!(a1, a2);
        assert_ne!(a1, b1);
        assert_eq!(f.ctx.snapshot().windows.len(), 2);
    }

    #[test]
    fn background_capabilities_never_get_windows() {
        let mut f = Fixture::new();
        assert!(f.open("system.sync").is_none());
        assert!(f.ctx.events().pending().is_empty());
    }

    #[test]
    fn explicit_space_places_window_without_stealing_focus() {
        let mut f = Fixture::new();
        let home = f.open("core.finder").unwrap();
        let ops = SpaceId::from("ops");
        let placed = f
            .wm
            .open_window(&mut f.ctx, &f.cid, &CapabilityId::from("core.finder"), None, Some(&ops))
            .unwrap();
        let state = f.ctx.snapshot();
        assert_eq!(state.window(&placed).unwrap().space_id, ops);
        assert_eq!(state.focused_window_id, Some(home));
    }

    #[test]
    fn new_windows_cascade() {
        let mut f = Fixture::new();
        let a = f.open("core.finder").unwrap();
        let b = f.open("core.finder").unwrap();
        let state = f.ctx.snapshot();
        let pa = state.window(&a).unwrap().bounds.position;
        let pb = state.window(&b).unwrap().bounds.position;
        assert_eq!(pb.x - pa.x, LayoutConfig::default().cascade_step);
    }

    #[test]
    fn running_ids_are_scoped_to_active_space() {
        let mut f = Fixture::new();
        f.open("core.settings");
        f.switch("ops");
        f.open("core.finder");
        assert_eq!(
            WindowManager::running_capability_ids(&f.ctx.snapshot()),
            vec![CapabilityId::from("core.finder")]
        );

        let dock = f.wm.discoverable_capabilities(&f.ctx.snapshot());
        let settings = dock
            .iter()
            .find(|e| e.capability_id.as_str() == "core.settings")
            .unwrap();
        assert!(!settings.running);
    }

    #[test]
    fn cross_space_restore_fails_closed() {
        let mut f = Fixture::new();
        let id = f.open("core.settings").unwrap();
        assert!(f.wm.minimize_window(&mut f.ctx, &f.cid, &id));
        f.switch("ops");

        let before = f.ctx.snapshot();
        assert!(!f.wm.restore_window_by_id(&mut f.ctx, &f.cid, &id));
        assert!(Arc::ptr_eq(&before, &f.ctx.snapshot()));
    }

    #[test]
    fn restoring_an_active_window_fails_closed() {
        let mut f = Fixture::new();
        let id = f.open("core.settings").unwrap();
        assert!(!f.wm.restore_window_by_id(&mut f.ctx, &f.cid, &id));
        assert!(!f
            .wm
            .restore_window_by_id(&mut f.ctx, &f.cid, &WindowId::from("win-99")));
    }

    #[test]
    fn restoring_a_hidden_window_fails_closed() {
        let mut f = Fixture::new();
        let id = f.open("core.finder").unwrap();
        assert!(f.wm.hide_window(&mut f.ctx, &f.cid, &id));

        let before = f.ctx.snapshot();
        assert!(!f.wm.restore_window_by_id(&mut f.ctx, &f.cid, &id));
        assert!(Arc::ptr_eq(&before, &f.ctx.snapshot()));
        assert_eq!(before.window(&id).unwrap().state, WindowState::Hidden);
        assert_eq!(f.wm.restore_all_in_active_space(&mut f.ctx, &f.cid), 0);
    }

    #[test]
    fn restore_all_counts_restored_windows() {
        let mut f = Fixture::new();
        f.open("core.finder");
        f.open("core.finder");
        assert_eq!(f.wm.minimize_all_in_active_space(&mut f.ctx, &f.cid), 2);
        assert!(f.ctx.snapshot().focused_window_id.is_none());
        assert_eq!(f.wm.restore_all_in_active_space(&mut f.ctx, &f.cid), 2);
        assert_eq!(f.wm.restore_all_in_active_space(&mut f.ctx, &f.cid), 0);
    }

    #[test]
    fn escape_to_calm_leaves_other_spaces_alone() {
        let mut f = Fixture::new();
        let home = f.open("core.finder").unwrap();
        f.switch("ops");
        let ops = f.open("core.finder").unwrap();

        assert_eq!(f.wm.escape_to_calm(&mut f.ctx, &f.cid), 1);
        let state = f.ctx.snapshot();
        assert_eq!(state.window(&ops).unwrap().state, WindowState::Minimized);
        assert_eq!(state.window(&home).unwrap().state, WindowState::Active);
        assert!(state.focused_window_id.is_none());
    }

    #[test]
    fn focus_cycling_wraps_over_active_space_windows() {
        let mut f = Fixture::new();
        let a = f.open("core.finder").unwrap();
        let b = f.open("core.finder").unwrap();
        let c = f.open("core.finder").unwrap();
        f.switch("ops");
        f.open("core.finder");
        f.switch("default");

        // Stack bottom to top: a, b, c with c focused.
        assert_eq!(f.wm.focus_next(&mut f.ctx, &f.cid), Some(a.clone()));
        // Stack: b, c, a.
        assert_eq!(f.wm.focus_previous(&mut f.ctx, &f.cid), Some(c.clone()));
        // Stack: b, a, c.
        assert_eq!(f.wm.focus_by_index(&mut f.ctx, &f.cid, 0), Some(b));
        assert_eq!(f.wm.focus_by_index(&mut f.ctx, &f.cid, 3), None);
    }

    #[test]
    fn focus_refuses_windows_in_other_spaces() {
        let mut f = Fixture::new();
        let id = f.open("core.finder").unwrap();
        f.switch("ops");
        assert!(!f.wm.focus_window(&mut f.ctx, &f.cid, &id));
    }

    #[test]
    fn moving_to_space_changes_ownership() {
        let mut f = Fixture::new();
        let id = f.open("core.finder").unwrap();
        let ops = SpaceId::from("ops");
        assert!(f.wm.move_window_to_space(&mut f.ctx, &f.cid, &id, &ops));
        assert!(!f.wm.move_window_to_space(&mut f.ctx, &f.cid, &id, &ops));
        let state = f.ctx.snapshot();
        assert_eq!(state.window(&id).unwrap().space_id, ops);
        assert!(state.focused_window_id.is_none());
    }

    #[test]
    fn maximize_and_resize() {
        let mut f = Fixture::new();
        let id = f.open("core.settings").unwrap();
        assert!(f.wm.maximize_window(&mut f.ctx, &f.cid, &id));
        assert!(!f.wm.maximize_window(&mut f.ctx, &f.cid, &id));
        assert!(f.wm.unmaximize_window(&mut f.ctx, &f.cid, &id));

        assert!(f.wm.resize_window(&mut f.ctx, &f.cid, &id, Size::new(1, 1)));
        let size = f.ctx.snapshot().window(&id).unwrap().bounds.size;
        assert_eq!(size, Size::new(480, 360));
    }

    #[test]
    fn close_reports_capability_in_event() {
        let mut f = Fixture::new();
        let id = f.open("core.settings").unwrap();
        f.ctx.events_mut().take_events();
        assert!(f.wm.close_window(&mut f.ctx, &f.cid, &id));
        let events = f.ctx.events_mut().take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind(), "WINDOW_CLOSED");
        assert!(!f.wm.close_window(&mut f.ctx, &f.cid, &id));
    }
}
