use serde::{Deserialize, Serialize};

use crate::geometry::{Position, Size};
use crate::ids::{CapabilityId, ContextId, CorrelationId, SpaceId, WindowId};

/// A governed action requested of the kernel.
///
/// The set is closed; the kernel matches it exhaustively.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Intent {
    OpenCapability {
        capability_id: CapabilityId,
        #[serde(default)]
        context_id: Option<ContextId>,
        /// Place the window in this space instead of the active one.
        #[serde(default)]
        space_id: Option<SpaceId>,
    },
    FocusWindow { window_id: WindowId },
    CloseWindow { window_id: WindowId },
    MinimizeWindow { window_id: WindowId },
    RestoreWindow { window_id: WindowId },
    HideWindow { window_id: WindowId },
    MaximizeWindow { window_id: WindowId },
    UnmaximizeWindow { window_id: WindowId },
    MoveWindow { window_id: WindowId, position: Position },
    ResizeWindow { window_id: WindowId, size: Size },
    MoveWindowToSpace { window_id: WindowId, space_id: SpaceId },
    MinimizeAll,
    RestoreAll,
    CloseAllInSpace,
    FocusNextWindow,
    FocusPreviousWindow,
    FocusWindowByIndex { index: usize },
    EscapeToCalm,
    ClearFocus,
    SwitchSpace { space_id: SpaceId },
    StepUpComplete { success: bool },
    StepUpCancel,
    RequestPermission { capability_id: CapabilityId, permission: String },
    Lock,
    Unlock,
    PushContext {
        label: String,
        #[serde(default)]
        capability_id: Option<CapabilityId>,
    },
    PopContext,
    Logout,
    RaiseAlert,
    Noop,
}

impl Intent {
    /// Wire name of the intent kind, used in events and audit payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Intent::OpenCapability { .. } => "OPEN_CAPABILITY",
            Intent::FocusWindow { .. } => "FOCUS_WINDOW",
            Intent::CloseWindow { .. } => "CLOSE_WINDOW",
            Intent::MinimizeWindow { .. } => "MINIMIZE_WINDOW",
            Intent::RestoreWindow { .. } => "RESTORE_WINDOW",
            Intent::HideWindow { .. } => "HIDE_WINDOW",
            Intent::MaximizeWindow { .. } => "MAXIMIZE_WINDOW",
            Intent::UnmaximizeWindow { .. } => "UNMAXIMIZE_WINDOW",
            Intent::MoveWindow { .. } => "MOVE_WINDOW",
            Intent::ResizeWindow { .. } => "RESIZE_WINDOW",
            Intent::MoveWindowToSpace { .. } => "MOVE_WINDOW_TO_SPACE",
            Intent::MinimizeAll => "MINIMIZE_ALL",
            Intent::RestoreAll => "RESTORE_ALL",
            Intent::CloseAllInSpace => "CLOSE_ALL_IN_SPACE",
            Intent::FocusNextWindow => "FOCUS_NEXT_WINDOW",
            Intent::FocusPreviousWindow => "FOCUS_PREVIOUS_WINDOW",
            Intent::FocusWindowByIndex { .. } => "FOCUS_WINDOW_BY_INDEX",
            Intent::EscapeToCalm => "ESCAPE_TO_CALM",
            Intent::ClearFocus => "CLEAR_FOCUS",
            Intent::SwitchSpace { .. } => "SWITCH_SPACE",
            Intent::StepUpComplete { .. } => "STEP_UP_COMPLETE",
            Intent::StepUpCancel => "STEP_UP_CANCEL",
            Intent::RequestPermission { .. } => "REQUEST_PERMISSION",
            Intent::Lock => "LOCK",
            Intent::Unlock => "UNLOCK",
            Intent::PushContext { .. } => "PUSH_CONTEXT",
            Intent::PopContext => "POP_CONTEXT",
            Intent::Logout => "LOGOUT",
            Intent::RaiseAlert => "RAISE_ALERT",
            Intent::Noop => "NOOP",
        }
    }

    /// Open a capability in the active space.
    pub fn open(capability_id: impl Into<CapabilityId>) -> Self {
        Intent::OpenCapability {
            capability_id: capability_id.into(),
            context_id: None,
            space_id: None,
        }
    }

    /// Open a capability for a specific context.
    pub fn open_with_context(
        capability_id: impl Into<CapabilityId>,
        context_id: impl Into<ContextId>,
    ) -> Self {
        Intent::OpenCapability {
            capability_id: capability_id.into(),
            context_id: Some(context_id.into()),
            space_id: None,
        }
    }
}

/// An intent plus its mandatory correlation id. Created once, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentEnvelope {
    pub correlation_id: CorrelationId,
    pub intent: Intent,
}

impl IntentEnvelope {
    /// Wrap an intent under a fresh correlation id.
    pub fn new(intent: Intent) -> Self {
        Self {
            correlation_id: CorrelationId::generate(),
            intent,
        }
    }

    /// Wrap an intent under an existing correlation id.
    pub fn with_correlation(correlation_id: CorrelationId, intent: Intent) -> Self {
        Self {
            correlation_id,
            intent,
        }
    }

    /// Wire name of the wrapped intent.
    pub fn kind(&self) -> &'static str {
        self.intent.kind()
    }
}

impl From<Intent> for IntentEnvelope {
    fn from(intent: Intent) -> Self {
        IntentEnvelope::new(intent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intents_serialize_with_screaming_tags() {
        let json = serde_json::to_value(Intent::open("core.settings")).unwrap();
        assert_eq!(json["type"], "OPEN_CAPABILITY");
        assert_eq!(json["capability_id"], "core.settings");

        let json = serde_json::to_value(Intent::StepUpComplete { success: true }).unwrap();
        assert_eq!(json["type"], "STEP_UP_COMPLETE");
    }

    #[test]
    fn kind_matches_serde_tag() {
        let intents = vec![
            Intent::MinimizeAll,
            Intent::FocusWindowByIndex { index: 2 },
            Intent::SwitchSpace {
                space_id: SpaceId::from("ops"),
            },
            Intent::Noop,
        ];
        for intent in intents {
            let json = serde_json::to_value(&intent).unwrap();
            assert_eq!(json["type"], intent.kind());
        }
    }

    #[test]
    fn envelope_keeps_supplied_correlation() {
        let cid = CorrelationId::from("trace-1");
        let env = IntentEnvelope::with_correlation(cid.clone(), Intent::Lock);
        assert_eq!(env.correlation_id, cid);
        assert_eq!(env.kind(), "LOCK");
    }
}
