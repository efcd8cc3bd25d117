//! One annotation-view session over a dataset.
//!
//! The session owns the [`AnnotationState`] of the active image, the
//! [`SyncCoordinator`] and the I/O executor, and is handed to the interaction
//! controller explicitly. The host calls [`AnnotationSession::tick`] from its
//! event loop; the tick observes edits, applies finished backend calls and
//! dispatches due saves.

use std::collections::VecDeque;
use std::time::Duration;
use web_time::Instant;

use crate::backend::BackendError;
use crate::constants::DEFAULT_DEBOUNCE_MS;
use crate::keybindings::KeyBindings;
use crate::model::{Category, ImageKey, NormalizedBox};
use crate::state::{AnnotationState, StateConfig};
use crate::sync::{
    Activation, FetchTicket, IoCompletion, IoExecutor, IoJob, SaveResolution, SyncCoordinator,
    SyncStatus,
};
use crate::transform::ImageLayout;

/// Tunables for an [`AnnotationSession`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Inactivity delay before an automatic save.
    pub debounce: Duration,
    pub state: StateConfig,
    pub keybindings: KeyBindings,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(DEFAULT_DEBOUNCE_MS),
            state: StateConfig::default(),
            keybindings: KeyBindings::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Warning,
    Error,
}

/// Non-blocking message for the user (toast).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    fn error(message: String) -> Self {
        Self {
            level: NotificationLevel::Error,
            message,
        }
    }

    fn warning(message: String) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message,
        }
    }
}

impl std::fmt::Display for Notification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self.level {
            NotificationLevel::Warning => "warning",
            NotificationLevel::Error => "error",
        };
        write!(f, "[{}] {}", tag, self.message)
    }
}

/// Annotation session for one dataset.
pub struct AnnotationSession<E: IoExecutor> {
    dataset_id: String,
    executor: E,
    state: AnnotationState,
    coordinator: SyncCoordinator,
    keybindings: KeyBindings,
    classes: Vec<Category>,
    layout: Option<ImageLayout>,
    pending_load: Option<FetchTicket>,
    pending_classes: Option<FetchTicket>,
    next_fetch: u64,
    /// State revision the coordinator has been told about.
    observed_revision: u64,
    notifications: VecDeque<Notification>,
}

impl<E: IoExecutor> AnnotationSession<E> {
    /// Create a session and request the dataset's class list.
    pub fn new(dataset_id: impl Into<String>, executor: E, config: SessionConfig) -> Self {
        let state = AnnotationState::with_config(config.state);
        let observed_revision = state.revision();
        let mut session = Self {
            dataset_id: dataset_id.into(),
            executor,
            state,
            coordinator: SyncCoordinator::new(config.debounce),
            keybindings: config.keybindings,
            classes: Vec::new(),
            layout: None,
            pending_load: None,
            pending_classes: None,
            next_fetch: 1,
            observed_revision,
            notifications: VecDeque::new(),
        };
        session.reload_classes();
        session
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn dataset_id(&self) -> &str {
        &self.dataset_id
    }

    pub fn state(&self) -> &AnnotationState {
        &self.state
    }

    /// Mutable access for edits. Changes are picked up on the next tick.
    pub fn state_mut(&mut self) -> &mut AnnotationState {
        &mut self.state
    }

    pub fn active_image(&self) -> Option<&ImageKey> {
        self.coordinator.active_image()
    }

    pub fn classes(&self) -> &[Category] {
        &self.classes
    }

    pub fn keybindings(&self) -> &KeyBindings {
        &self.keybindings
    }

    pub fn layout(&self) -> Option<&ImageLayout> {
        self.layout.as_ref()
    }

    /// Set where the image is rendered. Recompute on resize or image load.
    pub fn set_layout(&mut self, layout: Option<ImageLayout>) {
        let layout = layout.filter(|l| l.dimensions.is_valid());
        self.state
            .set_image_dimensions(layout.map(|l| l.dimensions));
        self.layout = layout;
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    pub fn executor_mut(&mut self) -> &mut E {
        &mut self.executor
    }

    /// Boxes for the active image are being fetched.
    pub fn is_loading(&self) -> bool {
        self.pending_load.is_some()
    }

    /// Pointer interaction is accepted: an image is loaded and its rendered
    /// size is known.
    pub fn is_interactive(&self) -> bool {
        self.coordinator.active_image().is_some() && !self.is_loading() && self.layout.is_some()
    }

    pub fn status(&self) -> SyncStatus {
        self.coordinator.status()
    }

    /// Unsaved work on any image, or backend calls still running.
    pub fn has_pending_work(&self) -> bool {
        self.coordinator.has_pending() || self.executor.in_flight() > 0
    }

    /// Drain queued user notifications.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain(..).collect()
    }

    // ========================================================================
    // Navigation
    // ========================================================================

    /// Switch to an image of this dataset.
    ///
    /// The outgoing image's unsaved boxes keep saving in the background. The
    /// layout is cleared; set it once the new image's size is known.
    pub fn open_image(&mut self, image_id: &str, now: Instant) {
        self.observe_changes(now);
        let image = ImageKey::new(self.dataset_id.clone(), image_id);
        if self.active_image() == Some(&image) {
            return;
        }

        log::info!("Opening {}", image);
        let activation = self
            .coordinator
            .activate(Some(image.clone()), &self.state, now);
        self.set_layout(None);
        self.pending_load = None;

        match activation {
            Activation::Restore { boxes } => self.state.restore_unsaved(&boxes),
            Activation::Load | Activation::Closed => {
                self.state.replace_all(Vec::new());
                let ticket = self.next_ticket();
                self.pending_load = Some(ticket);
                self.executor.submit(IoJob::Load { ticket, image });
            }
        }
        self.observed_revision = self.state.revision();
    }

    /// Leave the current image without opening another.
    pub fn close(&mut self, now: Instant) {
        self.observe_changes(now);
        if self.active_image().is_none() {
            return;
        }
        self.coordinator.activate(None, &self.state, now);
        self.pending_load = None;
        self.set_layout(None);
        self.state.replace_all(Vec::new());
        self.observed_revision = self.state.revision();
    }

    // ========================================================================
    // Persistence
    // ========================================================================

    /// Drive the session: observe edits, apply finished backend calls and
    /// dispatch due saves.
    pub fn tick(&mut self, now: Instant) {
        self.observe_changes(now);

        while let Some(completion) = self.executor.try_next() {
            self.apply_completion(completion, now);
        }

        for request in self.coordinator.poll(now, &self.state) {
            self.executor.submit(IoJob::Save(request));
        }
    }

    /// Save the active image now. Returns false if the save was queued behind
    /// one already in flight, or no image is open.
    pub fn manual_save(&mut self, now: Instant) -> bool {
        self.observe_changes(now);
        if self.is_loading() {
            return false;
        }
        match self.coordinator.manual_save(now, &self.state) {
            Some(request) => {
                self.executor.submit(IoJob::Save(request));
                true
            }
            None => false,
        }
    }

    /// Make every pending save due now, e.g. before shutdown.
    pub fn flush(&mut self, now: Instant) {
        self.observe_changes(now);
        self.coordinator.flush_all(now);
        self.tick(now);
    }

    /// Re-query the class list after an external class manager changed it.
    pub fn reload_classes(&mut self) {
        let ticket = self.next_ticket();
        self.pending_classes = Some(ticket);
        self.executor.submit(IoJob::ListClasses {
            ticket,
            dataset_id: self.dataset_id.clone(),
        });
    }

    /// Make the class at `index` of the class list current. Ignored if the
    /// list is shorter.
    pub fn select_class_index(&mut self, index: usize) -> bool {
        match self.classes.get(index) {
            Some(category) => {
                log::debug!("Current class: {} ({})", category.name, category.id);
                self.state.set_current_class(category.id);
                true
            }
            None => false,
        }
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn next_ticket(&mut self) -> FetchTicket {
        let ticket = FetchTicket(self.next_fetch);
        self.next_fetch += 1;
        ticket
    }

    fn observe_changes(&mut self, now: Instant) {
        let revision = self.state.revision();
        if revision == self.observed_revision {
            return;
        }
        self.observed_revision = revision;
        if self.is_loading() {
            log::debug!("Ignoring edits made while loading");
            return;
        }
        self.coordinator.note_change(now);
    }

    fn apply_completion(&mut self, completion: IoCompletion, now: Instant) {
        match completion {
            IoCompletion::Saved {
                ticket,
                image,
                result,
            } => {
                let result = result.map_err(|e| e.to_string());
                let Some(done) = self.coordinator.complete(ticket, result, now) else {
                    return;
                };
                if done.active && done.resolution == SaveResolution::Clean {
                    self.state.mark_clean();
                }
                if let Some(message) = done.error {
                    self.notifications.push_back(Notification::error(format!(
                        "Failed to save annotations for {}: {}",
                        image, message
                    )));
                }
            }
            IoCompletion::Loaded {
                ticket,
                image,
                result,
            } => {
                if self.pending_load != Some(ticket) {
                    log::debug!("Discarding stale load of {}", image);
                    return;
                }
                self.pending_load = None;
                self.apply_load(&image, result);
            }
            IoCompletion::Classes { ticket, result } => {
                if self.pending_classes != Some(ticket) {
                    return;
                }
                self.pending_classes = None;
                self.apply_classes(result);
            }
        }
    }

    fn apply_load(
        &mut self,
        image: &ImageKey,
        result: Result<Vec<NormalizedBox>, BackendError>,
    ) {
        match result {
            Ok(boxes) => {
                log::info!("Loaded {} boxes for {}", boxes.len(), image);
                self.state.replace_all(boxes);
            }
            Err(e) => {
                log::error!("Failed to load annotations for {}: {}", image, e);
                self.state.replace_all(Vec::new());
                self.notifications.push_back(Notification::error(format!(
                    "Failed to load annotations for {}: {}",
                    image, e
                )));
            }
        }
        self.observed_revision = self.state.revision();
    }

    fn apply_classes(&mut self, result: Result<Vec<Category>, BackendError>) {
        match result {
            Ok(classes) => {
                log::info!(
                    "Dataset '{}' has {} classes",
                    self.dataset_id,
                    classes.len()
                );
                let current = self.state.current_class_id();
                if !classes.iter().any(|c| c.id == current) {
                    if let Some(first) = classes.first() {
                        self.state.set_current_class(first.id);
                    }
                }
                self.classes = classes;
            }
            Err(e) => {
                log::warn!("Failed to list classes of '{}': {}", self.dataset_id, e);
                self.notifications.push_back(Notification::warning(format!(
                    "Failed to load classes: {}",
                    e
                )));
            }
        }
    }
}
