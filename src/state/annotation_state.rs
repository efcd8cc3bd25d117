//! The per-image annotation document.
//!
//! [`AnnotationState`] is the single source of truth for one image's boxes.
//! Every mutation builds a new box list (clone-on-write) and records it in the
//! [`History`] arena, so undo/redo never sees a list that was mutated in place.
//!
//! Rejected mutations (unknown ids, undersized boxes) are silent no-ops that
//! return `false`/`None`; they come from normal fast interaction and are not
//! errors.

use std::sync::Arc;

use crate::constants::MIN_BOX_SIZE_PX;
use crate::history::{History, HistoryConfig, Snapshot};
use crate::model::{
    Annotation, AnnotationId, BoxChanges, ClassId, DrawMode, ImageDimensions, NormalizedBox,
};
use crate::transform::{clamp_normalized, to_screen};

/// Tunables for [`AnnotationState`].
#[derive(Debug, Clone)]
pub struct StateConfig {
    pub history: HistoryConfig,
    /// Smallest accepted box side in screen pixels.
    pub min_box_size: f64,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            history: HistoryConfig::default(),
            min_box_size: MIN_BOX_SIZE_PX,
        }
    }
}

/// Boxes, selection, mode and dirty tracking for the active image.
#[derive(Debug, Clone)]
pub struct AnnotationState {
    history: History,
    selected: Option<AnnotationId>,
    draw_mode: DrawMode,
    current_class_id: ClassId,
    dirty: bool,
    /// Bumped on every change of the box list, including loads.
    revision: u64,
    next_id: AnnotationId,
    dimensions: Option<ImageDimensions>,
    min_box_size: f64,
}

impl Default for AnnotationState {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnotationState {
    pub fn new() -> Self {
        Self::with_config(StateConfig::default())
    }

    pub fn with_config(config: StateConfig) -> Self {
        Self {
            history: History::with_config(config.history),
            selected: None,
            draw_mode: DrawMode::default(),
            current_class_id: 0,
            dirty: false,
            revision: 0,
            next_id: 1,
            dimensions: None,
            min_box_size: config.min_box_size,
        }
    }

    // ========================================================================
    // Read access
    // ========================================================================

    /// Current boxes in z-order (creation order).
    pub fn boxes(&self) -> &[Annotation] {
        self.history.current()
    }

    /// Shared handle to the current box list.
    pub fn snapshot(&self) -> Snapshot {
        Arc::clone(self.history.current())
    }

    /// Current boxes in wire format.
    pub fn wire_boxes(&self) -> Vec<NormalizedBox> {
        self.boxes().iter().map(|a| a.bbox).collect()
    }

    pub fn get(&self, id: AnnotationId) -> Option<&Annotation> {
        self.boxes().iter().find(|a| a.id == id)
    }

    pub fn len(&self) -> usize {
        self.boxes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes().is_empty()
    }

    pub fn selected_box_id(&self) -> Option<AnnotationId> {
        self.selected
    }

    pub fn selected_box(&self) -> Option<&Annotation> {
        self.selected.and_then(|id| self.get(id))
    }

    pub fn draw_mode(&self) -> DrawMode {
        self.draw_mode
    }

    pub fn current_class_id(&self) -> ClassId {
        self.current_class_id
    }

    /// True when the boxes differ from the last persisted version.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo_description(&self) -> Option<&str> {
        self.history.undo_description()
    }

    pub fn redo_description(&self) -> Option<&str> {
        self.history.redo_description()
    }

    pub fn image_dimensions(&self) -> Option<ImageDimensions> {
        self.dimensions
    }

    pub fn min_box_size(&self) -> f64 {
        self.min_box_size
    }

    // ========================================================================
    // Non-history state
    // ========================================================================

    /// Set the rendered image size used for the minimum-size policy.
    /// Invalid (zero-area) dimensions are treated as unknown.
    pub fn set_image_dimensions(&mut self, dimensions: Option<ImageDimensions>) {
        self.dimensions = dimensions.filter(ImageDimensions::is_valid);
    }

    /// Change the selection. Selecting an unknown id is ignored.
    pub fn select_box(&mut self, id: Option<AnnotationId>) -> bool {
        match id {
            Some(id) if self.get(id).is_none() => false,
            _ => {
                self.selected = id;
                true
            }
        }
    }

    /// Switch mode. Leaving edit mode clears the selection.
    pub fn set_draw_mode(&mut self, mode: DrawMode) {
        if self.draw_mode == DrawMode::Edit && mode != DrawMode::Edit {
            self.selected = None;
        }
        if self.draw_mode != mode {
            log::debug!("Draw mode: {} -> {}", self.draw_mode.name(), mode.name());
        }
        self.draw_mode = mode;
    }

    /// Class assigned to newly drawn boxes.
    pub fn set_current_class(&mut self, class_id: ClassId) {
        self.current_class_id = class_id;
    }

    // ========================================================================
    // Mutations (recorded in history)
    // ========================================================================

    /// Append a box. Returns its new id, or None if it was rejected.
    ///
    /// The box is clamped into the unit square; boxes below the minimum size
    /// are rejected without touching state.
    pub fn add_box(&mut self, bbox: NormalizedBox) -> Option<AnnotationId> {
        if !bbox.is_finite() {
            return None;
        }
        let bbox = clamp_normalized(&bbox);
        if !self.meets_min_size(&bbox) {
            log::trace!("Rejected undersized box {:?}", bbox);
            return None;
        }

        let id = self.next_id;
        self.next_id += 1;

        let mut boxes = self.boxes().to_vec();
        boxes.push(Annotation::new(id, bbox));
        self.commit(boxes, "Add box");

        if self.draw_mode == DrawMode::Edit {
            self.selected = Some(id);
        }
        Some(id)
    }

    /// Update fields of an existing box.
    ///
    /// No-op if the id is unknown, nothing would change, or a resize would
    /// leave the box below the minimum size.
    pub fn update_box(&mut self, id: AnnotationId, changes: BoxChanges) -> bool {
        let Some(index) = self.boxes().iter().position(|a| a.id == id) else {
            return false;
        };

        let old = self.boxes()[index].bbox;
        let new = changes.apply(&old);
        if !new.is_finite() {
            return false;
        }
        let new = clamp_normalized(&new);
        if new == old {
            return false;
        }
        if !new.same_size(&old) && !self.meets_min_size(&new) {
            log::trace!("Rejected resize of box {} below minimum size", id);
            return false;
        }

        let description = if new.same_geometry(&old) {
            "Change class"
        } else {
            "Move/resize box"
        };

        let mut boxes = self.boxes().to_vec();
        boxes[index].bbox = new;
        self.commit(boxes, description);
        true
    }

    /// Remove a box. No-op if absent.
    pub fn delete_box(&mut self, id: AnnotationId) -> bool {
        if self.get(id).is_none() {
            return false;
        }

        let boxes: Vec<Annotation> = self.boxes().iter().filter(|a| a.id != id).copied().collect();
        if self.selected == Some(id) {
            self.selected = None;
        }
        self.commit(boxes, "Delete box");
        true
    }

    /// Remove every box as a single undo step.
    pub fn clear_boxes(&mut self) -> bool {
        if self.is_empty() {
            return false;
        }
        let count = self.len();
        self.selected = None;
        self.commit(Vec::new(), format!("Clear {} boxes", count));
        true
    }

    /// Step back one mutation. Returns false when nothing can be undone.
    pub fn undo(&mut self) -> bool {
        if self.history.undo().is_none() {
            return false;
        }
        self.after_history_move();
        true
    }

    /// Re-apply the last undone mutation. Returns false when nothing can be redone.
    pub fn redo(&mut self) -> bool {
        if self.history.redo().is_none() {
            return false;
        }
        self.after_history_move();
        true
    }

    // ========================================================================
    // Persistence hooks
    // ========================================================================

    /// Called after a successful save. Boxes and history are untouched.
    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Load a new image's boxes: fresh ids, empty history, clean, nothing selected.
    pub fn replace_all(&mut self, boxes: Vec<NormalizedBox>) {
        let boxes: Vec<Annotation> = boxes
            .into_iter()
            .filter(NormalizedBox::is_finite)
            .map(|bbox| {
                let id = self.next_id;
                self.next_id += 1;
                Annotation::new(id, clamp_normalized(&bbox))
            })
            .collect();

        self.history.reset(boxes.into());
        self.selected = None;
        self.dirty = false;
        self.revision += 1;
    }

    /// Adopt boxes that were edited earlier in this session but not yet
    /// persisted. Same as [`replace_all`](Self::replace_all) except the state
    /// stays dirty.
    pub fn restore_unsaved(&mut self, boxes: &[Annotation]) {
        self.replace_all(boxes.iter().map(|a| a.bbox).collect());
        self.dirty = true;
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn meets_min_size(&self, bbox: &NormalizedBox) -> bool {
        match self.dimensions {
            Some(dims) => to_screen(bbox, dims).meets_min_size(self.min_box_size),
            None => bbox.w > 0.0 && bbox.h > 0.0,
        }
    }

    fn commit(&mut self, boxes: Vec<Annotation>, description: impl Into<String>) {
        self.history.push(boxes.into(), description);
        self.dirty = true;
        self.revision += 1;
    }

    fn after_history_move(&mut self) {
        self.dirty = true;
        self.revision += 1;
        if let Some(id) = self.selected {
            if self.get(id).is_none() {
                self.selected = None;
            }
        }
    }
}
