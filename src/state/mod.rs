//! Annotation state management.

mod annotation_state;

pub use annotation_state::{AnnotationState, StateConfig};
