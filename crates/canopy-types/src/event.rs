use serde::{Deserialize, Serialize};

use crate::geometry::{Position, Size};
use crate::ids::{CapabilityId, CorrelationId, SpaceId, WindowId};
use crate::manifest::Role;
use crate::policy::{DecisionExplanation, DecisionKind, SpaceAction};
use crate::state::CognitiveMode;

/// An event emitted by the kernel or window manager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemEvent {
    pub correlation_id: CorrelationId,
    pub timestamp: i64,
    pub payload: EventPayload,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventPayload {
    WindowCreated {
        window_id: WindowId,
        capability_id: CapabilityId,
        space_id: SpaceId,
    },
    WindowFocused { window_id: WindowId },
    WindowClosed {
        window_id: WindowId,
        capability_id: CapabilityId,
    },
    WindowMinimized { window_id: WindowId },
    WindowRestored { window_id: WindowId },
    WindowHidden { window_id: WindowId },
    WindowMaximized { window_id: WindowId },
    WindowUnmaximized { window_id: WindowId },
    WindowMoved { window_id: WindowId, position: Position },
    WindowResized { window_id: WindowId, size: Size },
    WindowMovedToSpace {
        window_id: WindowId,
        from: SpaceId,
        to: SpaceId,
    },
    FocusCleared,
    SpaceSwitched { from: SpaceId, to: SpaceId },
    SpaceAccessDenied {
        space_id: SpaceId,
        action: SpaceAction,
        reason: String,
    },
    CapabilityDenied {
        capability_id: CapabilityId,
        reason: String,
    },
    CapabilityDegraded {
        capability_id: CapabilityId,
        fallback: CapabilityId,
    },
    StepUpRequired {
        capability_id: CapabilityId,
        /// Correlation id of a still-pending challenge this one replaced.
        replaced_correlation_id: Option<CorrelationId>,
    },
    StepUpCompleted { capability_id: CapabilityId },
    StepUpFailed { capability_id: CapabilityId },
    StepUpCancelled { capability_id: CapabilityId },
    PermissionRequested {
        capability_id: CapabilityId,
        permission: String,
        decision: DecisionKind,
    },
    DecisionExplained { explanation: DecisionExplanation },
    CognitiveModeChanged {
        from: CognitiveMode,
        to: CognitiveMode,
    },
    SessionStarted { user_id: String, role: Role },
    SessionEnded,
    SystemLocked,
    SystemUnlocked,
    ContextPushed { label: String },
    ContextPopped { label: String },
}

impl SystemEvent {
    /// Event stamped with the intent's correlation id.
    pub fn new(correlation_id: CorrelationId, timestamp: i64, payload: EventPayload) -> Self {
        Self {
            correlation_id,
            timestamp,
            payload,
        }
    }

    /// Wire name of the event kind.
    pub fn kind(&self) -> &'static str {
        match &self.payload {
            EventPayload::WindowCreated { .. } => "WINDOW_CREATED",
            EventPayload::WindowFocused { .. } => "WINDOW_FOCUSED",
            EventPayload::WindowClosed { .. } => "WINDOW_CLOSED",
            EventPayload::WindowMinimized { .. } => "WINDOW_MINIMIZED",
            EventPayload::WindowRestored { .. } => "WINDOW_RESTORED",
            EventPayload::WindowHidden { .. } => "WINDOW_HIDDEN",
            EventPayload::WindowMaximized { .. } => "WINDOW_MAXIMIZED",
            EventPayload::WindowUnmaximized { .. } => "WINDOW_UNMAXIMIZED",
            EventPayload::WindowMoved { .. } => "WINDOW_MOVED",
            EventPayload::WindowResized { .. } => "WINDOW_RESIZED",
            EventPayload::WindowMovedToSpace { .. } => "WINDOW_MOVED_TO_SPACE",
            EventPayload::FocusCleared => "FOCUS_CLEARED",
            EventPayload::SpaceSwitched { .. } => "SPACE_SWITCHED",
            EventPayload::SpaceAccessDenied { .. } => "SPACE_ACCESS_DENIED",
            EventPayload::CapabilityDenied { .. } => "CAPABILITY_DENIED",
            EventPayload::CapabilityDegraded { .. } => "CAPABILITY_DEGRADED",
            EventPayload::StepUpRequired { .. } => "STEP_UP_REQUIRED",
            EventPayload::StepUpCompleted { .. } => "STEP_UP_COMPLETED",
            EventPayload::StepUpFailed { .. } => "STEP_UP_FAILED",
            EventPayload::StepUpCancelled { .. } => "STEP_UP_CANCELLED",
            EventPayload::PermissionRequested { .. } => "PERMISSION_REQUESTED",
            EventPayload::DecisionExplained { .. } => "DECISION_EXPLAINED",
            EventPayload::CognitiveModeChanged { .. } => "COGNITIVE_MODE_CHANGED",
            EventPayload::SessionStarted { .. } => "SESSION_STARTED",
            EventPayload::SessionEnded => "SESSION_ENDED",
            EventPayload::SystemLocked => "SYSTEM_LOCKED",
            EventPayload::SystemUnlocked => "SYSTEM_UNLOCKED",
            EventPayload::ContextPushed { .. } => "CONTEXT_PUSHED",
            EventPayload::ContextPopped { .. } => "CONTEXT_POPPED",
        }
    }

    /// The explanation carried by a `DECISION_EXPLAINED` event.
    pub fn explanation(&self) -> Option<&DecisionExplanation> {
        match &self.payload {
            EventPayload::DecisionExplained { explanation } => Some(explanation),
            _ => None,
        }
    }
}
