//! Per-image save coordination.
//!
//! Each image with unsaved or in-flight work owns a lane holding its
//! [`SaveScheduler`]. The active image's boxes are read from the live
//! [`AnnotationState`]; an image the user navigated away from keeps a
//! detached snapshot of its last boxes until that snapshot is persisted.
//! Lanes are keyed by image identity, so a save response can only ever be
//! applied to the image it was sent for.

use std::collections::HashMap;
use std::time::Duration;
use web_time::Instant;

use crate::history::Snapshot;
use crate::model::{ImageKey, NormalizedBox};
use crate::state::AnnotationState;
use crate::sync::scheduler::{SaveResolution, SaveScheduler, SaveTicket};

/// A save to dispatch to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveRequest {
    pub ticket: SaveTicket,
    pub image: ImageKey,
    pub boxes: Vec<NormalizedBox>,
}

/// Outcome of a resolved save, as seen by the session.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveCompletion {
    pub image: ImageKey,
    /// The image is the one currently being edited.
    pub active: bool,
    pub resolution: SaveResolution,
    pub error: Option<String>,
}

/// How the session should populate its state after switching images.
#[derive(Debug, Clone, PartialEq)]
pub enum Activation {
    /// Fetch the persisted boxes from the backend.
    Load,
    /// The image still has boxes from earlier in this session that are not
    /// yet confirmed persisted.
    Restore { boxes: Snapshot },
    /// No image is active.
    Closed,
}

/// User-facing save indicator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus {
    Saved,
    Pending,
    Saving,
    Error(String),
}

impl SyncStatus {
    fn priority(&self) -> u8 {
        match self {
            SyncStatus::Saved => 0,
            SyncStatus::Pending => 1,
            SyncStatus::Error(_) => 2,
            SyncStatus::Saving => 3,
        }
    }
}

impl std::fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncStatus::Saved => write!(f, "Saved"),
            SyncStatus::Pending => write!(f, "Unsaved changes"),
            SyncStatus::Saving => write!(f, "Saving..."),
            SyncStatus::Error(message) => write!(f, "Save failed: {}", message),
        }
    }
}

#[derive(Debug)]
struct Lane {
    scheduler: SaveScheduler,
    /// Latest boxes of an image that is no longer active.
    detached: Option<Snapshot>,
    last_error: Option<String>,
}

impl Lane {
    fn new(debounce: Duration) -> Self {
        Self {
            scheduler: SaveScheduler::new(debounce),
            detached: None,
            last_error: None,
        }
    }

    fn status(&self) -> SyncStatus {
        if self.scheduler.in_flight().is_some() {
            SyncStatus::Saving
        } else if let Some(message) = &self.last_error {
            SyncStatus::Error(message.clone())
        } else if self.scheduler.is_dirty() {
            SyncStatus::Pending
        } else {
            SyncStatus::Saved
        }
    }
}

/// Debounced, coalescing save coordinator.
#[derive(Debug)]
pub struct SyncCoordinator {
    debounce: Duration,
    active: Option<ImageKey>,
    lanes: HashMap<ImageKey, Lane>,
    next_ticket: u64,
}

impl SyncCoordinator {
    pub fn new(debounce: Duration) -> Self {
        Self {
            debounce,
            active: None,
            lanes: HashMap::new(),
            next_ticket: 1,
        }
    }

    pub fn active_image(&self) -> Option<&ImageKey> {
        self.active.as_ref()
    }

    /// Switch the active image.
    ///
    /// Unsaved or in-flight work of the outgoing image is detached with a
    /// snapshot of its boxes and flushed without waiting for the debounce.
    pub fn activate(
        &mut self,
        image: Option<ImageKey>,
        state: &AnnotationState,
        now: Instant,
    ) -> Activation {
        if let Some(outgoing) = self.active.take() {
            let keep = match self.lanes.get_mut(&outgoing) {
                Some(lane) if !lane.scheduler.is_idle() => {
                    lane.detached = Some(state.snapshot());
                    lane.scheduler.expedite(now);
                    log::info!(
                        "Leaving {} with unsaved work ({} boxes), flushing",
                        outgoing,
                        state.len()
                    );
                    true
                }
                _ => false,
            };
            if !keep {
                self.lanes.remove(&outgoing);
            }
        }

        let Some(image) = image else {
            return Activation::Closed;
        };
        self.active = Some(image.clone());

        match self.lanes.get_mut(&image) {
            Some(lane) => match lane.detached.take() {
                Some(boxes) => {
                    log::info!("Returning to {} with unsaved work, restoring", image);
                    Activation::Restore { boxes }
                }
                None => Activation::Load,
            },
            None => Activation::Load,
        }
    }

    /// The active image's boxes changed.
    pub fn note_change(&mut self, now: Instant) {
        let Some(image) = &self.active else {
            return;
        };
        let debounce = self.debounce;
        self.lanes
            .entry(image.clone())
            .or_insert_with(|| Lane::new(debounce))
            .scheduler
            .mark_changed(now);
    }

    /// Saves whose debounce has expired, at most one per image.
    pub fn poll(&mut self, now: Instant, state: &AnnotationState) -> Vec<SaveRequest> {
        let due: Vec<ImageKey> = self
            .lanes
            .iter()
            .filter(|(_, lane)| lane.scheduler.is_due(now))
            .map(|(image, _)| image.clone())
            .collect();

        due.into_iter()
            .filter_map(|image| self.dispatch(image, state))
            .collect()
    }

    /// Save the active image now, bypassing the debounce.
    ///
    /// Returns None when a save for the image is already in flight; the
    /// latest boxes are then saved as soon as it resolves.
    pub fn manual_save(&mut self, now: Instant, state: &AnnotationState) -> Option<SaveRequest> {
        let image = self.active.clone()?;
        let debounce = self.debounce;
        let lane = self
            .lanes
            .entry(image.clone())
            .or_insert_with(|| Lane::new(debounce));

        if lane.scheduler.request_now(now) {
            self.dispatch(image, state)
        } else {
            log::debug!("Manual save of {} queued behind in-flight save", image);
            None
        }
    }

    /// Expedite every pending save, e.g. before shutdown.
    pub fn flush_all(&mut self, now: Instant) {
        for lane in self.lanes.values_mut() {
            lane.scheduler.expedite(now);
        }
    }

    /// Apply a save response. Responses for unknown tickets are discarded.
    pub fn complete(
        &mut self,
        ticket: SaveTicket,
        result: Result<(), String>,
        now: Instant,
    ) -> Option<SaveCompletion> {
        let Some(image) = self
            .lanes
            .iter()
            .find(|(_, lane)| lane.scheduler.in_flight() == Some(ticket))
            .map(|(image, _)| image.clone())
        else {
            log::debug!("Discarding stale response for {}", ticket);
            return None;
        };

        let active = self.active.as_ref() == Some(&image);
        let lane = self.lanes.get_mut(&image)?;
        let resolution = lane.scheduler.finish(ticket, result.is_ok(), now);
        let error = result.err();

        match &error {
            Some(message) => {
                log::error!("Save of {} failed: {}", image, message);
                lane.last_error = Some(message.clone());
            }
            None => {
                log::info!("Saved {} ({:?})", image, resolution);
                lane.last_error = None;
            }
        }

        if !active && lane.scheduler.is_idle() {
            log::debug!("Background save of {} finished, dropping lane", image);
            self.lanes.remove(&image);
        }

        Some(SaveCompletion {
            image,
            active,
            resolution,
            error,
        })
    }

    /// Save indicator across all images.
    ///
    /// Background work counts too: `Saving` wins over `Error`, which wins
    /// over `Pending`. On a tie the active image's status is reported.
    pub fn status(&self) -> SyncStatus {
        self.lanes
            .iter()
            .map(|(image, lane)| (lane.status(), self.active.as_ref() == Some(image), image))
            .max_by(|(a, a_active, a_image), (b, b_active, b_image)| {
                a.priority()
                    .cmp(&b.priority())
                    .then(a_active.cmp(b_active))
                    .then(b_image.cmp(a_image))
            })
            .map(|(status, _, _)| status)
            .unwrap_or(SyncStatus::Saved)
    }

    /// Any image still has unsaved or in-flight work.
    pub fn has_pending(&self) -> bool {
        self.lanes.values().any(|lane| !lane.scheduler.is_idle())
    }

    /// Images with unsaved or in-flight work, sorted.
    pub fn pending_images(&self) -> Vec<ImageKey> {
        let mut images: Vec<ImageKey> = self
            .lanes
            .iter()
            .filter(|(_, lane)| !lane.scheduler.is_idle())
            .map(|(image, _)| image.clone())
            .collect();
        images.sort();
        images
    }

    fn dispatch(&mut self, image: ImageKey, state: &AnnotationState) -> Option<SaveRequest> {
        let is_active = self.active.as_ref() == Some(&image);
        let lane = self.lanes.get_mut(&image)?;
        if lane.scheduler.in_flight().is_some() {
            return None;
        }

        let boxes: Vec<NormalizedBox> = if is_active {
            state.wire_boxes()
        } else {
            lane.detached
                .as_ref()
                .map(|snapshot| snapshot.iter().map(|a| a.bbox).collect())?
        };

        let ticket = SaveTicket(self.next_ticket);
        self.next_ticket += 1;
        lane.scheduler.begin(ticket);

        log::debug!("Dispatching {} for {} ({} boxes)", ticket, image, boxes.len());
        Some(SaveRequest {
            ticket,
            image,
            boxes,
        })
    }
}
