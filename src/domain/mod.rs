//! Domain layer for status-updater.
//!
//! Contains the canonical types shared across all modules:
//! - `Event`: one status update, the unit that flows through the queue
//! - `EventKind`: the fixed set of update kinds and their wire identifiers
//! - `UpdaterError`: Top-level error type

pub mod error;
pub mod event;

pub use error::UpdaterError;
pub use event::{Event, EventKind, MAX_PAYLOAD_LEN};
