//! Keeps the backend's stored boxes eventually consistent with the editor.
//!
//! - [`SaveScheduler`]: per-image debounce state machine
//! - [`SyncCoordinator`]: per-image lanes, coalescing and stale-response discard
//! - [`IoExecutor`]: runs backend calls without blocking interaction

mod coordinator;
mod scheduler;
mod worker;

pub use coordinator::{Activation, SaveCompletion, SaveRequest, SyncCoordinator, SyncStatus};
pub use scheduler::{SaveResolution, SaveScheduler, SaveState, SaveTicket};
pub use worker::{FetchTicket, IoCompletion, IoExecutor, IoJob, ThreadedExecutor};

#[cfg(test)]
pub(crate) use worker::testing;
