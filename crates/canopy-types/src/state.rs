//! The single `SystemState` aggregate.
//!
//! The state store owns the only instance; everything else receives shared
//! snapshots and never edits them in place.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::geometry::{Bounds, Size};
use crate::ids::{CapabilityId, ContextId, CorrelationId, SpaceId, WindowId};
use crate::manifest::Role;

/// Default bound on the context stack.
pub const DEFAULT_CONTEXT_STACK_LIMIT: usize = 16;

/// Window lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowState {
    Active,
    Minimized,
    Hidden,
}

/// A window owned by exactly one space.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub id: WindowId,
    pub capability_id: CapabilityId,
    pub space_id: SpaceId,
    pub state: WindowState,
    pub z_index: u32,
    pub context_id: Option<ContextId>,
    pub title: String,
    pub bounds: Bounds,
    pub min_size: Size,
    /// Bounds to return to when a maximized window is restored.
    pub restore_bounds: Option<Bounds>,
    /// Correlation id of the intent that created the window.
    pub opened_by: CorrelationId,
}

impl Window {
    /// Visible and focusable.
    pub fn is_active(&self) -> bool {
        self.state == WindowState::Active
    }

    /// Whether the window fills the workspace.
    pub fn is_maximized(&self) -> bool {
        self.restore_bounds.is_some()
    }

    /// Whether the window belongs to `space`.
    pub fn in_space(&self, space: &SpaceId) -> bool {
        &self.space_id == space
    }
}

/// System-wide attention state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CognitiveMode {
    Calm,
    Focused,
    Multitask,
    Alert,
    Locked,
}

impl CognitiveMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CognitiveMode::Calm => "calm",
            CognitiveMode::Focused => "focused",
            CognitiveMode::Multitask => "multitask",
            CognitiveMode::Alert => "alert",
            CognitiveMode::Locked => "locked",
        }
    }
}

impl fmt::Display for CognitiveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is acting, and with what elevation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityContext {
    pub authenticated: bool,
    pub user_id: Option<String>,
    pub role: Role,
    pub policies: BTreeSet<String>,
    pub step_up_active: bool,
    /// Epoch milliseconds after which the step-up no longer counts.
    pub step_up_expires_at: Option<i64>,
}

impl SecurityContext {
    /// Unauthenticated guest context.
    pub fn anonymous() -> Self {
        Self {
            authenticated: false,
            user_id: None,
            role: Role::Guest,
            policies: BTreeSet::new(),
            step_up_active: false,
            step_up_expires_at: None,
        }
    }

    /// Authenticated context without step-up.
    pub fn authenticated<I, S>(user_id: impl Into<String>, role: Role, policies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            authenticated: true,
            user_id: Some(user_id.into()),
            role,
            policies: policies.into_iter().map(Into::into).collect(),
            step_up_active: false,
            step_up_expires_at: None,
        }
    }

    /// Step-up counts only while armed and not yet expired.
    pub fn is_step_up_valid(&self, now_ms: i64) -> bool {
        self.step_up_active && self.step_up_expires_at.is_some_and(|expires| now_ms < expires)
    }

    /// Whether `policy` has been granted.
    pub fn has_policy(&self, policy: &str) -> bool {
        self.policies.contains(policy)
    }
}

impl Default for SecurityContext {
    fn default() -> Self {
        Self::anonymous()
    }
}

/// A pending step-up; at most one exists at a time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepUpChallenge {
    pub capability_id: CapabilityId,
    /// Correlation id of the open request that will be retried on success.
    pub correlation_id: CorrelationId,
    pub message: String,
    pub context_id: Option<ContextId>,
    pub space_id: Option<SpaceId>,
    pub requested_at: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextFrame {
    pub label: String,
    pub capability_id: Option<CapabilityId>,
    pub pushed_at: i64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemState {
    pub windows: BTreeMap<WindowId, Window>,
    /// Window ids in ascending z-order (last is topmost).
    pub window_order: Vec<WindowId>,
    pub focused_window_id: Option<WindowId>,
    pub active_space_id: SpaceId,
    /// Open window count per capability, across all spaces.
    pub active_capabilities: BTreeMap<CapabilityId, u32>,
    pub context_stack: Vec<ContextFrame>,
    pub context_stack_limit: usize,
    pub cognitive_mode: CognitiveMode,
    pub security: SecurityContext,
    pub pending_step_up: Option<StepUpChallenge>,
    /// Number of windows ever created; source of window ids.
    pub window_seq: u64,
}

impl SystemState {
    /// Empty state with `active_space_id` active.
    pub fn new(active_space_id: SpaceId) -> Self {
        Self {
            windows: BTreeMap::new(),
            window_order: Vec::new(),
            focused_window_id: None,
            active_space_id,
            active_capabilities: BTreeMap::new(),
            context_stack: Vec::new(),
            context_stack_limit: DEFAULT_CONTEXT_STACK_LIMIT,
            cognitive_mode: CognitiveMode::Calm,
            security: SecurityContext::anonymous(),
            pending_step_up: None,
            window_seq: 0,
        }
    }

    /// Set the context stack bound; at least one frame.
    pub fn with_context_stack_limit(mut self, limit: usize) -> Self {
        self.context_stack_limit = limit.max(1);
        self
    }

    /// Window by id, in any space.
    pub fn window(&self, id: &WindowId) -> Option<&Window> {
        self.windows.get(id)
    }

    /// The focused window, if any.
    pub fn focused_window(&self) -> Option<&Window> {
        self.focused_window_id.as_ref().and_then(|id| self.windows.get(id))
    }

    /// Windows of a space in ascending z-order.
    pub fn windows_in_space<'a>(&'a self, space: &'a SpaceId) -> impl Iterator<Item = &'a Window> + 'a {
        self.window_order
            .iter()
            .filter_map(|id| self.windows.get(id))
            .filter(move |w| w.in_space(space))
    }

    /// Active windows of the active space in ascending z-order.
    pub fn active_windows_in_active_space(&self) -> Vec<&Window> {
        self.windows_in_space(&self.active_space_id)
            .filter(|w| w.is_active())
            .collect()
    }

    /// Active windows in the active space.
    pub fn active_window_count_in_active_space(&self) -> usize {
        self.windows_in_space(&self.active_space_id)
            .filter(|w| w.is_active())
            .count()
    }

    /// Highest z-index in use, 0 with no windows.
    pub fn max_z_index(&self) -> u32 {
        self.windows.values().map(|w| w.z_index).max().unwrap_or(0)
    }

    /// Topmost active window in `space`, ignoring `excluding`.
    pub fn top_active_window_in_space(
        &self,
        space: &SpaceId,
        excluding: Option<&WindowId>,
    ) -> Option<&Window> {
        self.windows
            .values()
            .filter(|w| w.in_space(space) && w.is_active())
            .filter(|w| Some(&w.id) != excluding)
            .max_by_key(|w| w.z_index)
    }

    /// First window of `capability_id` in `space`. With a context id only a
    /// window opened for that context matches.
    pub fn find_window<'a>(
        &'a self,
        capability_id: &CapabilityId,
        space: &'a SpaceId,
        context_id: Option<&ContextId>,
    ) -> Option<&'a Window> {
        self.windows_in_space(space).find(|w| {
            &w.capability_id == capability_id
                && (context_id.is_none() || w.context_id.as_ref() == context_id)
        })
    }
}

impl Default for SystemState {
    fn default() -> Self {
        Self::new(SpaceId::default_space())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_up_validity_respects_expiry() {
        let mut ctx = SecurityContext::authenticated("u-1", Role::Admin, ["users.read"]);
        assert!(!ctx.is_step_up_valid(1_000));

        ctx.step_up_active = true;
        ctx.step_up_expires_at = Some(2_000);
        assert!(ctx.is_step_up_valid(1_999));
        assert!(!ctx.is_step_up_valid(2_000));
    }

    #[test]
    fn fresh_state_is_calm_and_empty() {
        let state = SystemState::default();
        assert_eq!(state.cognitive_mode, CognitiveMode::Calm);
        assert!(state.windows.is_empty());
        assert_eq!(state.active_space_id.as_str(), "default");
        assert!(!state.security.authenticated);
    }

    #[test]
    fn context_stack_limit_is_at_least_one() {
        let state = SystemState::default().with_context_stack_limit(0);
        assert_eq!(state.context_stack_limit, 1);
    }

    fn window(seq: u64, capability: &str, space: &str, context: Option<&str>) -> Window {
        Window {
            id: WindowId::from_sequence(seq),
            capability_id: CapabilityId::from(capability),
            space_id: SpaceId::from(space),
            state: WindowState::Active,
            z_index: seq as u32,
            context_id: context.map(ContextId::from),
            title: capability.to_string(),
            bounds: Bounds::default(),
            min_size: Size::default(),
            restore_bounds: None,
            opened_by: CorrelationId::from("c-1"),
        }
    }

    #[test]
    fn find_window_is_scoped_to_space_and_context() {
        let mut state = SystemState::default();
        for w in [
            window(1, "user.profile", "ops", Some("u-7")),
            window(2, "user.profile", "default", Some("u-7")),
            window(3, "core.settings", "default", None),
        ] {
            state.window_order.push(w.id.clone());
            state.windows.insert(w.id.clone(), w);
        }

        let profile = CapabilityId::from("user.profile");
        let home = SpaceId::default_space();
        let found = state.find_window(&profile, &home, Some(&ContextId::from("u-7")));
        assert_eq!(found.map(|w| w.id.as_str()), Some("win-2"));
        assert!(state
            .find_window(&profile, &home, Some(&ContextId::from("u-8")))
            .is_none());
        assert_eq!(
            state
                .find_window(&CapabilityId::from("core.settings"), &home, None)
                .map(|w| w.id.as_str()),
            Some("win-3")
        );
        assert!(state
            .find_window(&CapabilityId::from("core.settings"), &SpaceId::from("ops"), None)
            .is_none());
    }
}
