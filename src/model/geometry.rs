//! Pixel-space geometry used while interacting with the rendered image.

use super::annotation::ClassId;

/// Size in pixels of the rendered (possibly scaled) image area.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageDimensions {
    pub width: f64,
    pub height: f64,
}

impl ImageDimensions {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Dimensions are usable once both sides are positive and finite.
    /// A zero-area image has not finished loading yet.
    pub fn is_valid(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// A point in pixel space.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &ScreenPoint) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// A box in pixel space, relative to the rendered image origin (top-left corner).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub class_id: ClassId,
}

impl ScreenBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64, class_id: ClassId) -> Self {
        Self {
            x,
            y,
            width,
            height,
            class_id,
        }
    }

    /// Create a box from two opposite corners, whatever the drag direction.
    pub fn from_corners(p1: ScreenPoint, p2: ScreenPoint, class_id: ClassId) -> Self {
        Self {
            x: p1.x.min(p2.x),
            y: p1.y.min(p2.y),
            width: (p2.x - p1.x).abs(),
            height: (p2.y - p1.y).abs(),
            class_id,
        }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Check if a point is inside the box (edges included).
    pub fn contains(&self, point: &ScreenPoint) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    /// Whether both sides reach `min_size`, allowing for rounding noise.
    pub fn meets_min_size(&self, min_size: f64) -> bool {
        const EPSILON: f64 = 1e-6;
        self.width + EPSILON >= min_size && self.height + EPSILON >= min_size
    }

    /// Translate by a delta.
    pub fn translated(&self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }
}
