use serde::{Deserialize, Serialize};
use std::fmt;

use crate::ids::{CapabilityId, CorrelationId, SpaceId, WindowId};
use crate::manifest::Role;

/// Challenge returned when a capability needs step-up authentication.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepUpRequirement {
    pub capability_id: CapabilityId,
    pub message: String,
}

/// Outcome of a policy evaluation. Never persisted directly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum PolicyDecision {
    Allow,
    Deny { reason: String },
    RequireStepUp { challenge: StepUpRequirement },
    Degrade { fallback: CapabilityId, reason: String },
}

impl PolicyDecision {
    /// Decision kind without its payload.
    pub fn kind(&self) -> DecisionKind {
        match self {
            PolicyDecision::Allow => DecisionKind::Allow,
            PolicyDecision::Deny { .. } => DecisionKind::Deny,
            PolicyDecision::RequireStepUp { .. } => DecisionKind::RequireStepUp,
            PolicyDecision::Degrade { .. } => DecisionKind::Degrade,
        }
    }

    /// Whether the decision allows the request.
    pub fn is_allow(&self) -> bool {
        matches!(self, PolicyDecision::Allow)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionKind {
    Allow,
    Deny,
    RequireStepUp,
    Degrade,
}

impl fmt::Display for DecisionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DecisionKind::Allow => "allow",
            DecisionKind::Deny => "deny",
            DecisionKind::RequireStepUp => "require_step_up",
            DecisionKind::Degrade => "degrade",
        })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyDomain {
    CapabilityPolicy,
    SpacePolicy,
}

/// Audit-ready record of why a decision was made.
///
/// Built only from evaluation inputs, so identical inputs always yield an
/// identical explanation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionExplanation {
    pub decision: DecisionKind,
    pub intent_type: String,
    pub correlation_id: CorrelationId,
    pub space_id: Option<SpaceId>,
    pub capability_id: Option<CapabilityId>,
    pub window_id: Option<WindowId>,
    pub policy_domain: PolicyDomain,
    pub failed_rule: Option<String>,
    pub reason_chain: Vec<String>,
    pub timestamp: i64,
}

/// Actions governed by a space policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpaceAction {
    Access,
    OpenWindow,
    FocusWindow,
    MoveWindow,
}

impl SpaceAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SpaceAction::Access => "access",
            SpaceAction::OpenWindow => "openWindow",
            SpaceAction::FocusWindow => "focusWindow",
            SpaceAction::MoveWindow => "moveWindow",
        }
    }

    /// Name of the permission flag gating this action.
    pub fn permission_flag(&self) -> &'static str {
        match self {
            SpaceAction::Access => "canAccess",
            SpaceAction::OpenWindow => "canOpenWindow",
            SpaceAction::FocusWindow => "canFocusWindow",
            SpaceAction::MoveWindow => "canMoveWindow",
        }
    }
}

impl fmt::Display for SpaceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-space permission set.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpacePolicy {
    pub space_id: SpaceId,
    #[serde(default = "allow")]
    pub can_access: bool,
    #[serde(default = "allow")]
    pub can_open_window: bool,
    #[serde(default = "allow")]
    pub can_focus_window: bool,
    #[serde(default = "allow")]
    pub can_move_window: bool,
    #[serde(default)]
    pub required_role: Option<Role>,
    #[serde(default)]
    pub required_policies: Vec<String>,
}

fn allow() -> bool {
    true
}

impl SpacePolicy {
    /// A policy permitting everything; restrict it with the `with_*` helpers.
    pub fn permissive(space_id: impl Into<SpaceId>) -> Self {
        Self {
            space_id: space_id.into(),
            can_access: true,
            can_open_window: true,
            can_focus_window: true,
            can_move_window: true,
            required_role: None,
            required_policies: Vec::new(),
        }
    }

    /// Require at least `role` for every action.
    pub fn with_required_role(mut self, role: Role) -> Self {
        self.required_role = Some(role);
        self
    }

    /// Require every listed policy for every action.
    pub fn with_required_policies<I, S>(mut self, policies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_policies = policies.into_iter().map(Into::into).collect();
        self
    }

    /// Allow or forbid one action.
    pub fn with_permission(mut self, action: SpaceAction, allowed: bool) -> Self {
        match action {
            SpaceAction::Access => self.can_access = allowed,
            SpaceAction::OpenWindow => self.can_open_window = allowed,
            SpaceAction::FocusWindow => self.can_focus_window = allowed,
            SpaceAction::MoveWindow => self.can_move_window = allowed,
        }
        self
    }

    /// Whether the permission flag for `action` is set.
    pub fn permits(&self, action: SpaceAction) -> bool {
        match action {
            SpaceAction::Access => self.can_access,
            SpaceAction::OpenWindow => self.can_open_window,
            SpaceAction::FocusWindow => self.can_focus_window,
            SpaceAction::MoveWindow => self.can_move_window,
        }
    }
}
