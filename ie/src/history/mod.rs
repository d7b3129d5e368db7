//! Undo/redo history
//!
//! A linear stack of full entry-list snapshots with a cursor. The snapshot
//! under the cursor is what the editor displays; committing after an undo
//! discards the redo branch.

mod manager;

pub use manager::{DEFAULT_MAX_SNAPSHOTS, HistoryExhausted, HistoryManager, HistorySnapshot, MIN_SNAPSHOTS};
