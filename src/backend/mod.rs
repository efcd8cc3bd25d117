//! Annotation storage backends.
//!
//! The engine talks to storage only through [`AnnotationBackend`]:
//!
//! - `load_annotations` fetches the persisted boxes of one image
//! - `save_annotations` replaces them with the current box set
//! - `list_classes` reads the dataset's class list
//!
//! Two implementations ship with the crate: [`YoloDirBackend`] stores YOLO
//! text files on disk, [`MemoryBackend`] keeps everything in memory and can
//! inject failures.

mod error;
mod memory;
pub mod wire;
mod yolo_dir;

pub use error::BackendError;
pub use memory::MemoryBackend;
pub use yolo_dir::{IMAGE_EXTENSIONS, YoloDirBackend, is_image_filename};

use crate::model::{Category, ImageKey, NormalizedBox};

/// Boundary to the annotation storage.
///
/// Calls may block; the session runs them off the interaction path.
pub trait AnnotationBackend: Send + Sync {
    /// Fetch the persisted boxes for an image. An image with no stored
    /// annotations yields an empty list.
    fn load_annotations(&self, image: &ImageKey) -> Result<Vec<NormalizedBox>, BackendError>;

    /// Persist the complete box set for an image.
    fn save_annotations(&self, image: &ImageKey, boxes: &[NormalizedBox])
    -> Result<(), BackendError>;

    /// The dataset's classes, in hotkey order.
    fn list_classes(&self, dataset_id: &str) -> Result<Vec<Category>, BackendError>;
}
