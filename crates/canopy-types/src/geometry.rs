//! Integer window geometry.
//!
//! Integers keep states comparable with `Eq` and their serialization stable.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Grow each dimension to at least `min`.
    pub fn clamp_min(self, min: Size) -> Size {
        Size {
            width: self.width.max(min.width),
            height: self.height.max(min.height),
        }
    }

    /// Whether both dimensions are within `other`.
    pub fn fits_within(self, other: Size) -> bool {
        self.width <= other.width && self.height <= other.height
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bounds {
    pub position: Position,
    pub size: Size,
}

impl Bounds {
    pub const fn new(position: Position, size: Size) -> Self {
        Self { position, size }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_min_grows_small_sizes() {
        let size = Size::new(200, 900).clamp_min(Size::new(320, 240));
        assert_eq!(size, Size::new(320, 900));
    }

    #[test]
    fn fits_within_compares_both_axes() {
        assert!(Size::new(100, 100).fits_within(Size::new(100, 200)));
        assert!(!Size::new(101, 100).fits_within(Size::new(100, 200)));
    }
}
