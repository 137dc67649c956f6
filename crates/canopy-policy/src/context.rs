//! Inputs to a policy evaluation.
//!
//! Everything the engine reads is carried here explicitly, including the
//! current time, so evaluation never consults ambient state.

use canopy_types::{
    CapabilityId, CorrelationId, SecurityContext, SpaceAction, SpaceId, WindowId,
};
use serde::{Deserialize, Serialize};

/// Who is asking, on behalf of which intent, and when.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluationContext {
    /// Wire name of the intent being evaluated, e.g. `OPEN_CAPABILITY`.
    pub intent_type: String,
    pub correlation_id: CorrelationId,
    pub security: SecurityContext,
    /// Evaluation time in epoch milliseconds.
    pub now_ms: i64,
}

impl EvaluationContext {
    /// Evaluation inputs for one intent.
    pub fn new(
        intent_type: impl Into<String>,
        correlation_id: CorrelationId,
        security: SecurityContext,
        now_ms: i64,
    ) -> Self {
        Self {
            intent_type: intent_type.into(),
            correlation_id,
            security,
            now_ms,
        }
    }
}

/// The governed action being asked about.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "domain", rename_all = "snake_case")]
pub enum PolicyRequest {
    /// Open (or dry-run open) a capability.
    Capability {
        capability_id: CapabilityId,
        #[serde(default)]
        space_id: Option<SpaceId>,
    },
    /// Perform a space-scoped action.
    Space {
        space_id: SpaceId,
        action: SpaceAction,
        #[serde(default)]
        window_id: Option<WindowId>,
        #[serde(default)]
        capability_id: Option<CapabilityId>,
    },
}

impl PolicyRequest {
    /// Request to use a capability.
    pub fn capability(capability_id: impl Into<CapabilityId>) -> Self {
        PolicyRequest::Capability {
            capability_id: capability_id.into(),
            space_id: None,
        }
    }

    /// Request to perform `action` in a space.
    pub fn space(space_id: impl Into<SpaceId>, action: SpaceAction) -> Self {
        PolicyRequest::Space {
            space_id: space_id.into(),
            action,
            window_id: None,
            capability_id: None,
        }
    }

    /// Attach the window the space action targets.
    pub fn with_window(mut self, window: WindowId) -> Self {
        if let PolicyRequest::Space { window_id, .. } = &mut self {
            *window_id = Some(window);
        }
        self
    }

    /// Attach the capability involved, for space actions that open one.
    pub fn with_capability(mut self, capability: CapabilityId) -> Self {
        if let PolicyRequest::Space { capability_id, .. } = &mut self {
            *capability_id = Some(capability);
        }
        self
    }

    /// Attach the space a capability would open in.
    pub fn in_space(mut self, space: SpaceId) -> Self {
        if let PolicyRequest::Capability { space_id, .. } = &mut self {
            *space_id = Some(space);
        }
        self
    }

    /// Space the request targets, if any.
    pub fn space_id(&self) -> Option<&SpaceId> {
        match self {
            PolicyRequest::Capability { space_id, .. } => space_id.as_ref(),
            PolicyRequest::Space { space_id, .. } => Some(space_id),
        }
    }

    /// Capability the request names, if any.
    pub fn capability_id(&self) -> Option<&CapabilityId> {
        match self {
            PolicyRequest::Capability { capability_id, .. } => Some(capability_id),
            PolicyRequest::Space { capability_id, .. } => capability_id.as_ref(),
        }
    }

    /// Window the request names, if any.
    pub fn window_id(&self) -> Option<&WindowId> {
        match self {
            PolicyRequest::Capability { .. } => None,
            PolicyRequest::Space { window_id, .. } => window_id.as_ref(),
        }
    }
}
