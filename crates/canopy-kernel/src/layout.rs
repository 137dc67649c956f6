//! Window placement.

use canopy_types::{Bounds, Position, Size};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    /// Position of the first window in an empty space.
    pub cascade_origin: Position,
    /// Offset applied per window already in the space, on both axes.
    pub cascade_step: i32,
    /// Cap on the number of offsets applied.
    pub max_cascade_steps: u32,
    /// Area a maximized window fills.
    pub workspace: Size,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            cascade_origin: Position::new(64, 48),
            cascade_step: 32,
            max_cascade_steps: 8,
            workspace: Size::new(1440, 900),
        }
    }
}

impl LayoutConfig {
    /// Initial position for a window joining a space that holds `existing` windows.
    pub fn cascade_position(&self, existing: usize) -> Position {
        let steps = existing.min(self.max_cascade_steps as usize) as i32;
        let offset = steps.saturating_mul(self.cascade_step);
        Position::new(
            self.cascade_origin.x.saturating_add(offset),
            self.cascade_origin.y.saturating_add(offset),
        )
    }

    /// Bounds for a new window when `existing` windows already share its space.
    pub fn initial_bounds(&self, existing: usize, default_size: Size, min_size: Size) -> Bounds {
        Bounds::new(
            self.cascade_position(existing),
            default_size.clamp_min(min_size),
        )
    }

    /// Bounds of a maximized window.
    pub fn maximized_bounds(&self) -> Bounds {
        Bounds::new(Position::new(0, 0), self.workspace)
    }
}
