//! Data models for the annotation engine.

mod annotation;
mod category;
mod geometry;

pub use annotation::{
    Annotation, AnnotationId, BoxChanges, ClassId, DrawMode, ImageKey, NormalizedBox,
};
pub use category::Category;
pub use geometry::{ImageDimensions, ScreenBox, ScreenPoint};
