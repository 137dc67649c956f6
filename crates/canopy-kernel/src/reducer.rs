//! The pure reducer.
//!
//! `reduce` is total over [`Action`] and never panics. An action that would
//! not change anything returns the input `Arc` itself, which is how the
//! store tells a no-op from a change.

use std::sync::Arc;

use canopy_types::{
    Bounds, CapabilityId, CognitiveMode, ContextFrame, ContextId, CorrelationId, Position,
    SecurityContext, Size, SpaceId, StepUpChallenge, SystemState, Window, WindowId, WindowState,
};

/// Everything needed to mint a window. The reducer assigns id and z-index.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewWindow {
    pub capability_id: CapabilityId,
    pub space_id: SpaceId,
    pub context_id: Option<ContextId>,
    pub title: String,
    pub bounds: Bounds,
    pub min_size: Size,
    pub opened_by: CorrelationId,
}

/// A state transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Action {
    CreateWindow(NewWindow),
    FocusWindow { window_id: WindowId },
    ClearFocus,
    CloseWindow { window_id: WindowId },
    MinimizeWindow { window_id: WindowId },
    HideWindow { window_id: WindowId },
    RestoreWindow { window_id: WindowId },
    MaximizeWindow { window_id: WindowId, bounds: Bounds },
    UnmaximizeWindow { window_id: WindowId },
    MoveWindow { window_id: WindowId, position: Position },
    ResizeWindow { window_id: WindowId, size: Size },
    MoveWindowToSpace { window_id: WindowId, space_id: SpaceId },
    SwitchSpace { space_id: SpaceId },
    SetCognitiveMode(CognitiveMode),
    /// Install an authenticated session and reset the mode to calm.
    StartSession(SecurityContext),
    SetPendingStepUp(Option<StepUpChallenge>),
    /// Clear the pending challenge and mark step-up active until `expires_at`.
    ArmStepUp { expires_at: i64 },
    PushContext(ContextFrame),
    PopContext,
    Reset(Box<SystemState>),
    Noop,
}

impl Action {
    /// Short action name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Action::CreateWindow(_) => "create_window",
            Action::FocusWindow { .. } => "focus_window",
            Action::ClearFocus => "clear_focus",
            Action::CloseWindow { .. } => "close_window",
            Action::MinimizeWindow { .. } => "minimize_window",
            Action::HideWindow { .. } => "hide_window",
            Action::RestoreWindow { .. } => "restore_window",
            Action::MaximizeWindow { .. } => "maximize_window",
            Action::UnmaximizeWindow { .. } => "unmaximize_window",
            Action::MoveWindow { .. } => "move_window",
            Action::ResizeWindow { .. } => "resize_window",
            Action::MoveWindowToSpace { .. } => "move_window_to_space",
            Action::SwitchSpace { .. } => "switch_space",
            Action::SetCognitiveMode(_) => "set_cognitive_mode",
            Action::StartSession(_) => "start_session",
            Action::SetPendingStepUp(_) => "set_pending_step_up",
            Action::ArmStepUp { .. } => "arm_step_up",
            Action::PushContext(_) => "push_context",
            Action::PopContext => "pop_context",
            Action::Reset(_) => "reset",
            Action::Noop => "noop",
        }
    }
}

/// Apply `action` to `state`. Returns the input `Arc` when nothing changes.
pub fn reduce(state: &Arc<SystemState>, action: &Action) -> Arc<SystemState> {
    match apply(state, action) {
        Some(next) => Arc::new(next),
        None => Arc::clone(state),
    }
}

/// `None` means "unchanged".
fn apply(state: &SystemState, action: &Action) -> Option<SystemState> {
    match action {
        Action::CreateWindow(new) => {
            let mut next = state.clone();
            let seq = next.window_seq + 1;
            let id = WindowId::from_sequence(seq);
            let window = Window {
                id: id.clone(),
                capability_id: new.capability_id.clone(),
                space_id: new.space_id.clone(),
                state: WindowState::Active,
                z_index: next.max_z_index() + 1,
                context_id: new.context_id.clone(),
                title: new.title.clone(),
                bounds: Bounds::new(new.bounds.position, new.bounds.size.clamp_min(new.min_size)),
                min_size: new.min_size,
                restore_bounds: None,
                opened_by: new.opened_by.clone(),
            };
            next.windows.insert(id.clone(), window);
            next.window_order.push(id.clone());
            *next
                .active_capabilities
                .entry(new.capability_id.clone())
                .or_insert(0) += 1;
            if new.space_id == next.active_space_id {
                next.focused_window_id = Some(id);
            }
            next.window_seq = seq;
            Some(next)
        }

        Action::FocusWindow { window_id } => {
            let window = state.window(window_id)?;
            if !window.is_active() || !window.in_space(&state.active_space_id) {
                return None;
            }
            let already_top = window.z_index == state.max_z_index();
            if state.focused_window_id.as_ref() == Some(window_id) && already_top {
                return None;
            }
            let mut next = state.clone();
            bring_to_front(&mut next, window_id);
            next.focused_window_id = Some(window_id.clone());
            Some(next)
        }

        Action::ClearFocus => {
            state.focused_window_id.as_ref()?;
            let mut next = state.clone();
            next.focused_window_id = None;
            Some(next)
        }

        Action::CloseWindow { window_id } => {
            let window = state.window(window_id)?;
            let space = window.space_id.clone();
            let capability = window.capability_id.clone();
            let mut next = state.clone();
            next.windows.remove(window_id);
            next.window_order.retain(|id| id != window_id);
            if let Some(count) = next.active_capabilities.get_mut(&capability) {
                *count = count.saturating_sub(1);
                if *count == 0 {
                    next.active_capabilities.remove(&capability);
                }
            }
            if next.focused_window_id.as_ref() == Some(window_id) {
                refocus(&mut next, &space);
            }
            Some(next)
        }

        Action::MinimizeWindow { window_id } => {
            let window = state.window(window_id)?;
            if !window.is_active() {
                return None;
            }
            Some(set_inactive(state, window_id, WindowState::Minimized))
        }

        Action::HideWindow { window_id } => {
            let window = state.window(window_id)?;
            if window.state == WindowState::Hidden {
                return None;
            }
            Some(set_inactive(state, window_id, WindowState::Hidden))
        }

        Action::RestoreWindow { window_id } => {
            let window = state.window(window_id)?;
            if window.is_active() {
                return None;
            }
            let in_active_space = window.in_space(&state.active_space_id);
            let mut next = state.clone();
            if let Some(w) = next.windows.get_mut(window_id) {
                w.state = WindowState::Active;
            }
            bring_to_front(&mut next, window_id);
            if in_active_space {
                next.focused_window_id = Some(window_id.clone());
            }
            Some(next)
        }

        Action::MaximizeWindow { window_id, bounds } => {
            let window = state.window(window_id)?;
            if window.is_maximized() {
                return None;
            }
            let mut next = state.clone();
            if let Some(w) = next.windows.get_mut(window_id) {
                w.restore_bounds = Some(w.bounds);
                w.bounds = *bounds;
            }
            Some(next)
        }

        Action::UnmaximizeWindow { window_id } => {
            let restore = state.window(window_id)?.restore_bounds?;
            let mut next = state.clone();
            if let Some(w) = next.windows.get_mut(window_id) {
                w.bounds = restore;
                w.restore_bounds = None;
            }
            Some(next)
        }

        Action::MoveWindow {
            window_id,
            position,
        } => {
            let window = state.window(window_id)?;
            if window.bounds.position == *position {
                return None;
            }
            let mut next = state.clone();
            if let Some(w) = next.windows.get_mut(window_id) {
                w.bounds.position = *position;
            }
            Some(next)
        }

        Action::ResizeWindow { window_id, size } => {
            let window = state.window(window_id)?;
            let size = size.clamp_min(window.min_size);
            if window.bounds.size == size {
                return None;
            }
            let mut next = state.clone();
            if let Some(w) = next.windows.get_mut(window_id) {
                w.bounds.size = size;
            }
            Some(next)
        }

        Action::MoveWindowToSpace {
            window_id,
            space_id,
        } => {
            let window = state.window(window_id)?;
            if window.in_space(space_id) {
                return None;
            }
            let mut next = state.clone();
            if let Some(w) = next.windows.get_mut(window_id) {
                w.space_id = space_id.clone();
            }
            if next.focused_window_id.as_ref() == Some(window_id) {
                let active = next.active_space_id.clone();
                refocus(&mut next, &active);
            }
            Some(next)
        }

        Action::SwitchSpace { space_id } => {
            if &state.active_space_id == space_id {
                return None;
            }
            let mut next = state.clone();
            next.active_space_id = space_id.clone();
            refocus(&mut next, space_id);
            Some(next)
        }

        Action::SetCognitiveMode(mode) => {
            if state.cognitive_mode == *mode {
                return None;
            }
            let mut next = state.clone();
            next.cognitive_mode = *mode;
            Some(next)
        }

        Action::StartSession(security) => {
            if &state.security == security
                && state.cognitive_mode == CognitiveMode::Calm
                && state.pending_step_up.is_none()
            {
                return None;
            }
            let mut next = state.clone();
            next.security = security.clone();
            next.cognitive_mode = CognitiveMode::Calm;
            next.pending_step_up = None;
            Some(next)
        }

        Action::SetPendingStepUp(pending) => {
            if &state.pending_step_up == pending {
                return None;
            }
            let mut next = state.clone();
            next.pending_step_up = pending.clone();
            Some(next)
        }

        Action::ArmStepUp { expires_at } => {
            let mut next = state.clone();
            next.pending_step_up = None;
            next.security.step_up_active = true;
            next.security.step_up_expires_at = Some(*expires_at);
            if next == *state {
                return None;
            }
            Some(next)
        }

        Action::PushContext(frame) => {
            let mut next = state.clone();
            next.context_stack.push(frame.clone());
            let limit = next.context_stack_limit.max(1);
            if next.context_stack.len() > limit {
                let excess = next.context_stack.len() - limit;
                next.context_stack.drain(..excess);
            }
            Some(next)
        }

        Action::PopContext => {
            if state.context_stack.is_empty() {
                return None;
            }
            let mut next = state.clone();
            next.context_stack.pop();
            Some(next)
        }

        Action::Reset(initial) => {
            if **initial == *state {
                return None;
            }
            Some((**initial).clone())
        }

        Action::Noop => None,
    }
}

/// Give `window_id` the highest z-index and move it to the end of the order.
fn bring_to_front(state: &mut SystemState, window_id: &WindowId) {
    let z = state.max_z_index() + 1;
    if let Some(w) = state.windows.get_mut(window_id) {
        w.z_index = z;
    }
    state.window_order.retain(|id| id != window_id);
    state.window_order.push(window_id.clone());
}

/// Focus the topmost active window of `space`, if `space` is active.
fn refocus(state: &mut SystemState, space: &SpaceId) {
    state.focused_window_id = if &state.active_space_id == space {
        state
            .top_active_window_in_space(space, None)
            .map(|w| w.id.clone())
    } else {
        None
    };
}

fn set_inactive(state: &SystemState, window_id: &WindowId, lifecycle: WindowState) -> SystemState {
    let mut next = state.clone();
    let mut space = None;
    if let Some(w) = next.windows.get_mut(window_id) {
        w.state = lifecycle;
        space = Some(w.space_id.clone());
    }
    if next.focused_window_id.as_ref() == Some(window_id) {
        if let Some(space) = space {
            refocus(&mut next, &space);
        }
    }
    next
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_window(cap: &str, space: &str) -> Action {
        Action::CreateWindow(NewWindow {
            capability_id: CapabilityId::from(cap),
            space_id: SpaceId::from(space),
            context_id: None,
            title: cap.to_string(),
            bounds: Bounds::new(Position::new(10, 10), Size::new(400, 300)),
            min_size: Size::new(200, 150),
            opened_by: CorrelationId::from("c-test"),
        })
    }

    fn run(actions: &[Action]) -> Arc<SystemState> {
        actions
            .iter()
            .fold(Arc::new(SystemState::default()), |state, action| reduce(&state, action))
    }

    #[test]
    fn noop_returns_same_arc() {
        let state = Arc::new(SystemState::default());
        assert!(Arc::ptr_eq(&state, &reduce(&state, &Action::Noop)));
        assert!(Arc::ptr_eq(
            &state,
            &reduce(
                &state,
                &Action::CloseWindow {
                    window_id: WindowId::from("win-404")
                }
            )
        ));
    }

    #[test]
    fn create_assigns_sequential_ids_and_increasing_z() {
        let state = run(&[new_window("a", "default"), new_window("b", "default")]);
        let w1 = state.window(&WindowId::from("win-1")).unwrap();
        let w2 = state.window(&WindowId::from("win-2")).unwrap();
        assert!(w2.z_index > w1.z_index);
        assert_eq!(state.focused_window_id, Some(w2.id.clone()));
        assert_eq!(state.window_order, vec![w1.id.clone(), w2.id.clone()]);
    }

    #[test]
    fn creating_in_another_space_does_not_steal_focus() {
        let state = run(&[new_window("a", "default"), new_window("b", "ops")]);
        assert_eq!(state.focused_window_id, Some(WindowId::from("win-1")));
    }

    #[test]
    fn focus_raises_window_above_all_others() {
        let state = run(&[
            new_window("a", "default"),
            new_window("b", "default"),
            Action::FocusWindow {
                window_id: WindowId::from("win-1"),
            },
        ]);
        let w1 = state.window(&WindowId::from("win-1")).unwrap();
        assert_eq!(w1.z_index, state.max_z_index());
        assert_eq!(state.window_order.last(), Some(&w1.id));
    }

    #[test]
    fn closing_focused_window_focuses_next_highest_in_space() {
        let state = run(&[
            new_window("a", "default"),
            new_window("b", "default"),
            new_window("c", "default"),
            Action::CloseWindow {
                window_id: WindowId::from("win-3"),
            },
        ]);
        assert_eq!(state.focused_window_id, Some(WindowId::from("win-2")));
        assert_eq!(state.active_capabilities.get(&CapabilityId::from("c")), None);
    }

    #[test]
    fn minimizing_last_window_clears_focus() {
        let state = run(&[
            new_window("a", "default"),
            Action::MinimizeWindow {
                window_id: WindowId::from("win-1"),
            },
        ]);
        assert!(state.focused_window_id.is_none());
        assert_eq!(
            state.window(&WindowId::from("win-1")).unwrap().state,
            WindowState::Minimized
        );
    }

    #[test]
    fn resize_is_clamped_to_min_size() {
        let state = run(&[
            new_window("a", "default"),
            Action::ResizeWindow {
                window_id: WindowId::from("win-1"),
                size: Size::new(10, 10),
            },
        ]);
        assert_eq!(
            state.window(&WindowId::from("win-1")).unwrap().bounds.size,
            Size::new(200, 150)
        );
    }

    #[test]
    fn maximize_round_trips_bounds() {
        let full = Bounds::new(Position::new(0, 0), Size::new(1440, 900));
        let id = WindowId::from("win-1");
        let state = run(&[
            new_window("a", "default"),
            Action::MaximizeWindow {
                window_id: id.clone(),
                bounds: full,
            },
        ]);
        assert_eq!(state.window(&id).unwrap().bounds, full);
        let restored = reduce(
            &state,
            &Action::UnmaximizeWindow {
                window_id: id.clone(),
            },
        );
        assert_eq!(
            restored.window(&id).unwrap().bounds,
            Bounds::new(Position::new(10, 10), Size::new(400, 300))
        );
        assert!(!restored.window(&id).unwrap().is_maximized());
    }

    #[test]
    fn context_stack_drops_oldest_frame() {
        let mut state = Arc::new(SystemState::default().with_context_stack_limit(2));
        for label in ["a", "b", "c"] {
            state = reduce(
                &state,
                &Action::PushContext(ContextFrame {
                    label: label.into(),
                    capability_id: None,
                    pushed_at: 0,
                }),
            );
        }
        let labels: Vec<_> = state.context_stack.iter().map(|f| f.label.as_str()).collect();
        assert_eq!(labels, vec!["b", "c"]);
    }

    #[test]
    fn switching_space_focuses_that_spaces_top_window() {
        let state = run(&[
            new_window("a", "ops"),
            new_window("b", "default"),
            Action::SwitchSpace {
                space_id: SpaceId::from("ops"),
            },
        ]);
        assert_eq!(state.focused_window_id, Some(WindowId::from("win-1")));
    }
}
