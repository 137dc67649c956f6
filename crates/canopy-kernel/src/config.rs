use canopy_types::SpaceId;
use serde::{Deserialize, Serialize};

use crate::layout::LayoutConfig;

/// Step-up stays valid for 15 minutes after a successful challenge.
pub const DEFAULT_STEP_UP_TTL_MS: i64 = 15 * 60 * 1000;

pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Kernel tunables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub step_up_ttl_ms: i64,
    pub context_stack_limit: usize,
    /// Active space at boot and after logout.
    pub default_space: SpaceId,
    pub event_channel_capacity: usize,
    pub layout: LayoutConfig,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            step_up_ttl_ms: DEFAULT_STEP_UP_TTL_MS,
            context_stack_limit: canopy_types::state::DEFAULT_CONTEXT_STACK_LIMIT,
            default_space: SpaceId::default_space(),
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
            layout: LayoutConfig::default(),
        }
    }
}

impl KernelConfig {
    /// Set how long a completed step-up stays valid.
    pub fn with_step_up_ttl_ms(mut self, ttl_ms: i64) -> Self {
        self.step_up_ttl_ms = ttl_ms;
        self
    }

    /// Set the context stack bound.
    pub fn with_context_stack_limit(mut self, limit: usize) -> Self {
        self.context_stack_limit = limit;
        self
    }

    /// Replace the window placement settings.
    pub fn with_layout(mut self, layout: LayoutConfig) -> Self {
        self.layout = layout;
        self
    }
}
