//! Debounced save scheduling for one image.
//!
//! The scheduler is a small state machine:
//!
//! ```text
//!            change                 due / manual            ok
//!   Clean ----------> DirtyPending --------------> Saving -------> Clean
//!                        ^    ^                    |    |
//!                        |    +---- error ---------+    | change
//!                        |                              v
//!                        +------- resolved ------ DirtyWhileSaving
//! ```
//!
//! At most one save is in flight. Changes that arrive while saving are folded
//! into a single follow-up save once the in-flight request resolves.

use std::time::Duration;
use web_time::Instant;

/// Identifies one save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SaveTicket(pub(crate) u64);

impl std::fmt::Display for SaveTicket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "save#{}", self.0)
    }
}

/// Save state of one image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    /// Persisted copy matches the boxes.
    Clean,
    /// Unsaved changes; a save starts once `due_at` passes.
    DirtyPending { due_at: Instant },
    /// A save is in flight and nothing changed since it was sent.
    Saving { ticket: SaveTicket },
    /// A save is in flight and the boxes changed after it was sent.
    DirtyWhileSaving {
        ticket: SaveTicket,
        due_at: Instant,
        /// A manual save was requested; follow up without waiting.
        manual: bool,
    },
}

/// What happened when a save resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveResolution {
    /// Saved and nothing changed meanwhile.
    Clean,
    /// Failed; retry scheduled.
    Retry,
    /// Changes arrived meanwhile; a follow-up save is scheduled.
    FollowUp,
    /// The ticket is not the one in flight.
    Stale,
}

/// Per-image save state machine.
#[derive(Debug, Clone)]
pub struct SaveScheduler {
    state: SaveState,
    debounce: Duration,
}

impl SaveScheduler {
    pub fn new(debounce: Duration) -> Self {
        Self {
            state: SaveState::Clean,
            debounce,
        }
    }

    pub fn state(&self) -> SaveState {
        self.state
    }

    /// True unless the persisted copy is known to match.
    pub fn is_dirty(&self) -> bool {
        !matches!(self.state, SaveState::Clean | SaveState::Saving { .. })
    }

    /// Clean with nothing in flight.
    pub fn is_idle(&self) -> bool {
        self.state == SaveState::Clean
    }

    pub fn in_flight(&self) -> Option<SaveTicket> {
        match self.state {
            SaveState::Saving { ticket } | SaveState::DirtyWhileSaving { ticket, .. } => {
                Some(ticket)
            }
            _ => None,
        }
    }

    /// Record a change to the boxes.
    pub fn mark_changed(&mut self, now: Instant) {
        let due_at = now + self.debounce;
        self.state = match self.state {
            SaveState::Clean | SaveState::DirtyPending { .. } => SaveState::DirtyPending { due_at },
            SaveState::Saving { ticket } => SaveState::DirtyWhileSaving {
                ticket,
                due_at,
                manual: false,
            },
            SaveState::DirtyWhileSaving { ticket, manual, .. } => SaveState::DirtyWhileSaving {
                ticket,
                due_at,
                manual,
            },
        };
        log::trace!("Save scheduler: marked changed -> {:?}", self.state);
    }

    /// Make a pending save due immediately.
    pub fn expedite(&mut self, now: Instant) {
        match &mut self.state {
            SaveState::DirtyPending { due_at } => *due_at = (*due_at).min(now),
            SaveState::DirtyWhileSaving { manual, .. } => *manual = true,
            SaveState::Clean | SaveState::Saving { .. } => {}
        }
    }

    /// Whether a save should start now.
    pub fn is_due(&self, now: Instant) -> bool {
        matches!(self.state, SaveState::DirtyPending { due_at } if now >= due_at)
    }

    /// Ask for a save right away.
    ///
    /// Returns true if the caller may start one now. While a save is in
    /// flight, a follow-up is queued instead and false is returned.
    pub fn request_now(&mut self, now: Instant) -> bool {
        match self.state {
            SaveState::Clean | SaveState::DirtyPending { .. } => true,
            SaveState::Saving { ticket } => {
                self.state = SaveState::DirtyWhileSaving {
                    ticket,
                    due_at: now,
                    manual: true,
                };
                false
            }
            SaveState::DirtyWhileSaving { .. } => {
                self.expedite(now);
                false
            }
        }
    }

    /// A save carrying the current boxes was dispatched.
    pub fn begin(&mut self, ticket: SaveTicket) {
        debug_assert!(self.in_flight().is_none(), "save already in flight");
        self.state = SaveState::Saving { ticket };
    }

    /// A save resolved.
    pub fn finish(&mut self, ticket: SaveTicket, ok: bool, now: Instant) -> SaveResolution {
        if self.in_flight() != Some(ticket) {
            return SaveResolution::Stale;
        }

        let (next, resolution) = match self.state {
            SaveState::Saving { .. } if ok => (SaveState::Clean, SaveResolution::Clean),
            SaveState::Saving { .. } => (
                SaveState::DirtyPending {
                    due_at: now + self.debounce,
                },
                SaveResolution::Retry,
            ),
            SaveState::DirtyWhileSaving { due_at, manual, .. } => (
                SaveState::DirtyPending {
                    due_at: if manual { now } else { due_at },
                },
                SaveResolution::FollowUp,
            ),
            state => (state, SaveResolution::Stale),
        };

        self.state = next;
        resolution
    }
}
