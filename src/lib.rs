//! boxmark - interactive bounding-box annotation engine
//!
//! The editing core behind an image-labeling view: boxes stored in normalized
//! YOLO format, an undoable per-image document, debounced per-image saving and
//! pointer/keyboard interaction over a letterboxed image.
//!
//! ```text
//! pointer/keys -> interaction -> transform -> state (history, dirty)
//!                                               |
//!                         session::tick -> sync -> backend
//! ```

pub mod backend;
pub mod color_utils;
pub mod config;
pub mod constants;
pub mod history;
pub mod input;
pub mod interaction;
pub mod keybindings;
pub mod model;
pub mod session;
pub mod state;
pub mod sync;
pub mod transform;

pub use backend::{AnnotationBackend, BackendError, MemoryBackend, YoloDirBackend};
pub use interaction::{InteractionController, KeyResult};
pub use model::{Annotation, AnnotationId, ClassId, DrawMode, ImageKey, NormalizedBox};
pub use session::{AnnotationSession, SessionConfig};
pub use state::AnnotationState;
