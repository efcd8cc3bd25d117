//! Global constants for the annotation engine

/// Smallest accepted box side, in screen pixels
pub const MIN_BOX_SIZE_PX: f64 = 10.0;

/// Default number of undo steps kept per image
pub const DEFAULT_MAX_HISTORY: usize = 100;

/// Default inactivity delay before an automatic save, in milliseconds
pub const DEFAULT_DEBOUNCE_MS: u64 = 1500;

/// Pointer distance from a box edge or corner that grabs a resize handle, in pixels
pub const HANDLE_HIT_RADIUS: f64 = 6.0;

/// Pointer travel before a press on a box turns into a drag, in pixels
pub const MIN_DRAG_DISTANCE: f64 = 3.0;

/// Number of class slots reachable with digit keys
pub const MAX_CLASS_HOTKEYS: usize = 9;
