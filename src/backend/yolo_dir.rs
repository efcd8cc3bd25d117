//! Filesystem backend storing YOLO text annotations.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<dataset>/classes.txt          one class name per line
//! <root>/<dataset>/images/<image>       image files
//! <root>/<dataset>/labels/<stem>.txt    one "class_id x y w h" line per box
//! ```
//!
//! Labels are keyed by file stem, so images whose names differ only in
//! extension (`a.jpg`, `a.png`) would share a label file. Loads and saves for
//! such images are rejected.

use std::path::{Path, PathBuf};

use crate::backend::wire::{format_yolo, parse_classes, parse_yolo};
use crate::backend::{AnnotationBackend, BackendError};
use crate::model::{Category, ImageKey, NormalizedBox};

/// Supported image file extensions
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp"];

/// Check if a filename (string) has a supported image extension.
/// Works with both full paths and just filenames.
pub fn is_image_filename(name: &str) -> bool {
    let lower = name.to_lowercase();
    IMAGE_EXTENSIONS
        .iter()
        .any(|ext| lower.ends_with(&format!(".{}", ext)))
}

/// YOLO directory backend.
#[derive(Debug, Clone)]
pub struct YoloDirBackend {
    root: PathBuf,
}

impl YoloDirBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn dataset_dir(&self, dataset_id: &str) -> Result<PathBuf, BackendError> {
        if !is_plain_name(dataset_id) {
            return Err(BackendError::rejected(format!(
                "invalid dataset id '{}'",
                dataset_id
            )));
        }
        let dir = self.root.join(dataset_id);
        if !dir.is_dir() {
            return Err(BackendError::DatasetNotFound { path: dir });
        }
        Ok(dir)
    }

    fn label_path(&self, image: &ImageKey) -> Result<PathBuf, BackendError> {
        if !is_plain_name(&image.image_id) {
            return Err(BackendError::rejected(format!(
                "invalid image id '{}'",
                image.image_id
            )));
        }
        let stem = file_stem(&image.image_id).ok_or_else(|| {
            BackendError::rejected(format!("invalid image id '{}'", image.image_id))
        })?;

        let dataset_dir = self.dataset_dir(&image.dataset_id)?;
        if let Some(other) = self
            .list_images(&image.dataset_id)?
            .into_iter()
            .find(|name| *name != image.image_id && file_stem(name) == Some(stem))
        {
            return Err(BackendError::rejected(format!(
                "'{}' and '{}' would share labels/{}.txt",
                image.image_id, other, stem
            )));
        }

        Ok(dataset_dir.join("labels").join(format!("{}.txt", stem)))
    }

    /// Image file names in a dataset, sorted.
    pub fn list_images(&self, dataset_id: &str) -> Result<Vec<String>, BackendError> {
        let images_dir = self.dataset_dir(dataset_id)?.join("images");
        if !images_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut names: Vec<String> = std::fs::read_dir(&images_dir)?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
            .filter(|name| is_image_filename(name))
            .collect();
        names.sort();
        Ok(names)
    }

    /// Path of an image file.
    pub fn image_path(&self, image: &ImageKey) -> Result<PathBuf, BackendError> {
        if !is_plain_name(&image.image_id) {
            return Err(BackendError::rejected(format!(
                "invalid image id '{}'",
                image.image_id
            )));
        }
        Ok(self
            .dataset_dir(&image.dataset_id)?
            .join("images")
            .join(&image.image_id))
    }
}

fn file_stem(name: &str) -> Option<&str> {
    Path::new(name).file_stem().and_then(|s| s.to_str())
}

/// A single path component with no separators or parent references.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}

impl AnnotationBackend for YoloDirBackend {
    fn load_annotations(&self, image: &ImageKey) -> Result<Vec<NormalizedBox>, BackendError> {
        let path = self.label_path(image)?;
        if !path.exists() {
            log::debug!("No labels for {} at {:?}", image, path);
            return Ok(Vec::new());
        }

        let content = std::fs::read_to_string(&path)?;
        let boxes = parse_yolo(&content)?;
        log::info!("Loaded {} boxes for {} from {:?}", boxes.len(), image, path);
        Ok(boxes)
    }

    fn save_annotations(
        &self,
        image: &ImageKey,
        boxes: &[NormalizedBox],
    ) -> Result<(), BackendError> {
        let path = self.label_path(image)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        // Write next to the target and rename so readers never see a partial file.
        let tmp_path = path.with_extension("txt.tmp");
        std::fs::write(&tmp_path, format_yolo(boxes))?;
        std::fs::rename(&tmp_path, &path)?;

        log::info!("Saved {} boxes for {} to {:?}", boxes.len(), image, path);
        Ok(())
    }

    fn list_classes(&self, dataset_id: &str) -> Result<Vec<Category>, BackendError> {
        let path = self.dataset_dir(dataset_id)?.join("classes.txt");
        if !path.exists() {
            log::warn!("No classes.txt in dataset '{}'", dataset_id);
            return Ok(Vec::new());
        }
        Ok(parse_classes(&std::fs::read_to_string(path)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset() -> (tempfile::TempDir, YoloDirBackend) {
        let dir = tempfile::tempdir().expect("tempdir");
        let ds = dir.path().join("birds");
        std::fs::create_dir_all(ds.join("images")).expect("mkdir");
        std::fs::write(ds.join("classes.txt"), "sparrow\ncrow\n").expect("write classes");
        std::fs::write(ds.join("images").join("b.png"), b"").expect("write");
        std::fs::write(ds.join("images").join("a.jpg"), b"").expect("write");
        std::fs::write(ds.join("images").join("notes.md"), b"").expect("write");
        let backend = YoloDirBackend::new(dir.path());
        (dir, backend)
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let (_dir, backend) = dataset();
        let key = ImageKey::new("birds", "a.jpg");
        let boxes = vec![
            NormalizedBox::new(0, 0.25, 0.5, 0.1, 0.2),
            NormalizedBox::new(1, 0.75, 0.5, 0.3, 0.4),
        ];

        backend.save_annotations(&key, &boxes).expect("save");
        let label = backend.root().join("birds").join("labels").join("a.txt");
        assert!(label.exists());
        assert!(!label.with_extension("txt.tmp").exists());

        let loaded = backend.load_annotations(&key).expect("load");
        assert_eq!(loaded, boxes);
    }

    #[test]
    fn test_missing_labels_load_empty() {
        let (_dir, backend) = dataset();
        let loaded = backend
            .load_annotations(&ImageKey::new("birds", "b.png"))
            .expect("load");
        assert!(loaded.is_empty());
    }

    #[test]
    fn test_missing_dataset() {
        let (_dir, backend) = dataset();
        let err = backend
            .load_annotations(&ImageKey::new("fish", "a.jpg"))
            .expect_err("no dataset");
        assert!(matches!(err, BackendError::DatasetNotFound { .. }));
    }

    #[test]
    fn test_rejects_path_traversal() {
        let (_dir, backend) = dataset();
        assert!(backend
            .save_annotations(&ImageKey::new("birds", "../escape.jpg"), &[])
            .is_err());
        assert!(backend.list_classes("..").is_err());
    }

    #[test]
    fn test_list_classes_and_images() {
        let (_dir, backend) = dataset();
        let classes = backend.list_classes("birds").expect("classes");
        assert_eq!(classes.len(), 2);
        assert_eq!(classes[1], Category::new(1, "crow"));

        let images = backend.list_images("birds").expect("images");
        assert_eq!(images, vec!["a.jpg".to_string(), "b.png".to_string()]);
    }

    #[test]
    fn test_rejects_images_sharing_a_label_file() {
        let (dir, backend) = dataset();
        std::fs::write(dir.path().join("birds").join("images").join("a.png"), b"").expect("write");
        let boxes = [NormalizedBox::new(0, 0.5, 0.5, 0.1, 0.1)];

        let err = backend
            .save_annotations(&ImageKey::new("birds", "a.jpg"), &boxes)
            .expect_err("stem collision");
        assert!(matches!(err, BackendError::Rejected { .. }));
        assert!(backend
            .load_annotations(&ImageKey::new("birds", "a.png"))
            .is_err());
        assert!(!dir.path().join("birds").join("labels").join("a.txt").exists());

        // b.png has no twin and is unaffected.
        backend
            .save_annotations(&ImageKey::new("birds", "b.png"), &boxes)
            .expect("save");
    }

    #[test]
    fn test_image_extension_filter() {
        assert!(is_image_filename("photo.JPG"));
        assert!(is_image_filename("dir/photo.webp"));
        assert!(!is_image_filename("labels.txt"));
    }
}
