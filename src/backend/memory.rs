//! In-memory backend with failure injection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::backend::{AnnotationBackend, BackendError};
use crate::model::{Category, ImageKey, NormalizedBox};

/// Keeps annotations and classes in memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    annotations: Mutex<HashMap<ImageKey, Vec<NormalizedBox>>>,
    classes: Mutex<HashMap<String, Vec<Category>>>,
    save_count: AtomicUsize,
    fail_saves: AtomicBool,
    fail_loads: AtomicBool,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed stored boxes for an image.
    pub fn with_annotations(self, image: ImageKey, boxes: Vec<NormalizedBox>) -> Self {
        lock(&self.annotations).insert(image, boxes);
        self
    }

    /// Seed the class list of a dataset.
    pub fn with_classes(self, dataset_id: &str, classes: Vec<Category>) -> Self {
        lock(&self.classes).insert(dataset_id.to_string(), classes);
        self
    }

    /// Make subsequent saves fail.
    pub fn set_fail_saves(&self, fail: bool) {
        self.fail_saves.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent loads fail.
    pub fn set_fail_loads(&self, fail: bool) {
        self.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// Replace a dataset's class list, as an external class manager would.
    pub fn set_classes(&self, dataset_id: &str, classes: Vec<Category>) {
        lock(&self.classes).insert(dataset_id.to_string(), classes);
    }

    /// Currently stored boxes for an image.
    pub fn stored(&self, image: &ImageKey) -> Option<Vec<NormalizedBox>> {
        lock(&self.annotations).get(image).cloned()
    }

    /// Number of save requests received, successful or not.
    pub fn save_count(&self) -> usize {
        self.save_count.load(Ordering::SeqCst)
    }
}

impl AnnotationBackend for MemoryBackend {
    fn load_annotations(&self, image: &ImageKey) -> Result<Vec<NormalizedBox>, BackendError> {
        if self.fail_loads.load(Ordering::SeqCst) {
            return Err(BackendError::rejected(format!("load of {} refused", image)));
        }
        Ok(self.stored(image).unwrap_or_default())
    }

    fn save_annotations(
        &self,
        image: &ImageKey,
        boxes: &[NormalizedBox],
    ) -> Result<(), BackendError> {
        self.save_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(BackendError::rejected(format!("save of {} refused", image)));
        }
        lock(&self.annotations).insert(image.clone(), boxes.to_vec());
        Ok(())
    }

    fn list_classes(&self, dataset_id: &str) -> Result<Vec<Category>, BackendError> {
        Ok(lock(&self.classes)
            .get(dataset_id)
            .cloned()
            .unwrap_or_default())
    }
}
