//! Cognitive mode derivation.

use canopy_types::{CognitiveMode, SystemState};

/// Mode implied by the active window count of the active space.
///
/// `Locked` is returned unchanged: only an explicit unlock leaves it. `Alert`
/// is not sticky and is replaced by the count-based mode.
pub fn derive(state: &SystemState) -> CognitiveMode {
    if state.cognitive_mode == CognitiveMode::Locked {
        return CognitiveMode::Locked;
    }
    mode_for_count(state.active_window_count_in_active_space())
}

/// Count-based mode: 0 calm, 1 focused, 2 or more multitask.
pub fn mode_for_count(active_windows: usize) -> CognitiveMode {
    match active_windows {
        0 => CognitiveMode::Calm,
        1 => CognitiveMode::Focused,
        _ => CognitiveMode::Multitask,
    }
}

/// The new mode, if derivation would change it.
pub fn transition(state: &SystemState) -> Option<CognitiveMode> {
    let derived = derive(state);
    (derived != state.cognitive_mode).then_some(derived)
}
