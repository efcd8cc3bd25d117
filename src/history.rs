//! Undo/redo history for one image's boxes.
//!
//! Every entry is an immutable snapshot of the complete box list. Entries live
//! in a single arena with a cursor pointing at the current one:
//! - undo moves the cursor back
//! - redo moves it forward
//! - a new mutation truncates everything after the cursor and appends
//!
//! Snapshots are shared (`Arc`), so handing the current one to the save
//! pipeline never copies and never aliases a mutable list.

use std::sync::Arc;

use crate::constants::DEFAULT_MAX_HISTORY;
use crate::model::Annotation;

/// An immutable box list.
pub type Snapshot = Arc<[Annotation]>;

/// Configuration for the history arena.
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum number of undo steps to keep
    pub max_history: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_MAX_HISTORY,
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    boxes: Snapshot,
    /// Description of the mutation that produced this entry.
    description: String,
}

/// Snapshot arena with a cursor.
#[derive(Debug, Clone)]
pub struct History {
    entries: Vec<Entry>,
    cursor: usize,
    config: HistoryConfig,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    /// Create a history holding an empty box list.
    pub fn new() -> Self {
        Self::with_config(HistoryConfig::default())
    }

    /// Create with custom configuration
    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            entries: vec![Entry {
                boxes: Arc::from(Vec::new()),
                description: String::new(),
            }],
            cursor: 0,
            config,
        }
    }

    /// The current box list.
    pub fn current(&self) -> &Snapshot {
        &self.entries[self.cursor].boxes
    }

    /// Record a new state. Anything that could have been redone is dropped.
    pub fn push(&mut self, boxes: Snapshot, description: impl Into<String>) {
        let description = description.into();
        log::debug!("📝 History: pushed '{}'", description);

        self.entries.truncate(self.cursor + 1);
        self.entries.push(Entry { boxes, description });
        self.cursor = self.entries.len() - 1;

        while self.entries.len() > self.config.max_history + 1 {
            self.entries.remove(0);
            self.cursor -= 1;
        }
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Step back one entry. Returns the new current list, or None if at the start.
    pub fn undo(&mut self) -> Option<&Snapshot> {
        if !self.can_undo() {
            return None;
        }
        log::debug!("⏪ Undo: '{}'", self.entries[self.cursor].description);
        self.cursor -= 1;
        Some(self.current())
    }

    /// Step forward one entry. Returns the new current list, or None if at the end.
    pub fn redo(&mut self) -> Option<&Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        log::debug!("⏩ Redo: '{}'", self.entries[self.cursor].description);
        Some(self.current())
    }

    /// Description of the step that would be undone.
    pub fn undo_description(&self) -> Option<&str> {
        self.can_undo()
            .then(|| self.entries[self.cursor].description.as_str())
    }

    /// Description of the step that would be redone.
    pub fn redo_description(&self) -> Option<&str> {
        self.can_redo()
            .then(|| self.entries[self.cursor + 1].description.as_str())
    }

    /// Drop all history and start over from `boxes`.
    pub fn reset(&mut self, boxes: Snapshot) {
        self.entries.clear();
        self.entries.push(Entry {
            boxes,
            description: String::new(),
        });
        self.cursor = 0;
        log::debug!("🗑️ History cleared");
    }

    /// Get the number of steps that can be undone
    pub fn undo_count(&self) -> usize {
        self.cursor
    }

    /// Get the number of steps that can be redone
    pub fn redo_count(&self) -> usize {
        self.entries.len() - 1 - self.cursor
    }
}
