//! Bounding box annotation types.
//!
//! Boxes are stored in the normalized, center-based format used on the wire:
//! `x`/`y` are the box center and `w`/`h` its size, all as fractions of the
//! image width and height.

use serde::{Deserialize, Serialize};

/// Unique identifier for an annotation within one session.
pub type AnnotationId = u64;

/// Identifier of a dataset-level class.
pub type ClassId = u32;

/// A box in normalized, center-based coordinates.
///
/// This is the wire format `{class_id, x, y, w, h}` and is serialized as-is.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBox {
    pub class_id: ClassId,
    /// Center X in `[0, 1]`
    pub x: f64,
    /// Center Y in `[0, 1]`
    pub y: f64,
    /// Width in `[0, 1]`
    pub w: f64,
    /// Height in `[0, 1]`
    pub h: f64,
}

impl NormalizedBox {
    pub fn new(class_id: ClassId, x: f64, y: f64, w: f64, h: f64) -> Self {
        Self {
            class_id,
            x,
            y,
            w,
            h,
        }
    }

    /// Check that every coordinate is a finite number.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.w.is_finite() && self.h.is_finite()
    }

    /// Left edge in normalized coordinates.
    pub fn left(&self) -> f64 {
        self.x - self.w / 2.0
    }

    /// Top edge in normalized coordinates.
    pub fn top(&self) -> f64 {
        self.y - self.h / 2.0
    }

    /// Whether two boxes cover the same rectangle (class ignored).
    pub fn same_geometry(&self, other: &NormalizedBox) -> bool {
        self.x == other.x && self.y == other.y && self.w == other.w && self.h == other.h
    }

    /// Whether two boxes have the same size (position and class ignored).
    pub fn same_size(&self, other: &NormalizedBox) -> bool {
        self.w == other.w && self.h == other.h
    }
}

/// A box owned by the annotation state, with its stable identifier.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Annotation {
    /// Assigned at creation, stable for the lifetime of the box.
    pub id: AnnotationId,
    pub bbox: NormalizedBox,
}

impl Annotation {
    pub fn new(id: AnnotationId, bbox: NormalizedBox) -> Self {
        Self { id, bbox }
    }

    pub fn class_id(&self) -> ClassId {
        self.bbox.class_id
    }
}

/// A partial update for an existing box. `None` fields are left untouched.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoxChanges {
    pub class_id: Option<ClassId>,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub w: Option<f64>,
    pub h: Option<f64>,
}

impl BoxChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole geometry, keeping the class.
    pub fn geometry(bbox: &NormalizedBox) -> Self {
        Self {
            class_id: None,
            x: Some(bbox.x),
            y: Some(bbox.y),
            w: Some(bbox.w),
            h: Some(bbox.h),
        }
    }

    pub fn class_id(mut self, class_id: ClassId) -> Self {
        self.class_id = Some(class_id);
        self
    }

    pub fn center(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn size(mut self, w: f64, h: f64) -> Self {
        self.w = Some(w);
        self.h = Some(h);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.class_id.is_none()
            && self.x.is_none()
            && self.y.is_none()
            && self.w.is_none()
            && self.h.is_none()
    }

    /// Apply these changes on top of an existing box.
    pub fn apply(&self, bbox: &NormalizedBox) -> NormalizedBox {
        NormalizedBox {
            class_id: self.class_id.unwrap_or(bbox.class_id),
            x: self.x.unwrap_or(bbox.x),
            y: self.y.unwrap_or(bbox.y),
            w: self.w.unwrap_or(bbox.w),
            h: self.h.unwrap_or(bbox.h),
        }
    }
}

/// Interaction mode of the annotation view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawMode {
    /// Pointer-down starts a new box.
    #[default]
    Draw,
    /// Boxes can be selected, moved and resized.
    Edit,
    /// Read-only.
    View,
}

impl DrawMode {
    /// Get the display name for this mode.
    pub fn name(&self) -> &'static str {
        match self {
            DrawMode::Draw => "Draw",
            DrawMode::Edit => "Edit",
            DrawMode::View => "View",
        }
    }

    /// Get all modes.
    pub fn all() -> &'static [DrawMode] {
        &[DrawMode::Draw, DrawMode::Edit, DrawMode::View]
    }
}

/// Identity of an image within a dataset. Saves and loads are keyed by it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageKey {
    pub dataset_id: String,
    pub image_id: String,
}

impl ImageKey {
    pub fn new(dataset_id: impl Into<String>, image_id: impl Into<String>) -> Self {
        Self {
            dataset_id: dataset_id.into(),
            image_id: image_id.into(),
        }
    }
}

impl std::fmt::Display for ImageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.dataset_id, self.image_id)
    }
}
