//! HistoryManager - bounded snapshot stack with a cursor

use std::collections::VecDeque;
use thiserror::Error;
use tracing::debug;

use crate::domain::Entry;

/// Default number of snapshots kept per session
pub const DEFAULT_MAX_SNAPSHOTS: usize = 100;

/// Smallest usable capacity: the initial state plus one edit
pub const MIN_SNAPSHOTS: usize = 2;

/// Undo/redo hit the end of the stack; nothing changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HistoryExhausted {
    #[error("Already at the oldest snapshot")]
    AtOldest,

    #[error("Already at the newest snapshot")]
    AtNewest,
}

impl HistoryExhausted {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AtOldest => "at-oldest",
            Self::AtNewest => "at-newest",
        }
    }
}

/// One immutable copy of the entry list
#[derive(Debug, Clone, PartialEq)]
pub struct HistorySnapshot {
    /// Monotonic commit number within the session, 0 for the initial state
    pub seq: u64,
    pub entries: Vec<Entry>,
}

#[derive(Debug, Clone)]
pub struct HistoryManager {
    snapshots: VecDeque<HistorySnapshot>,
    cursor: usize,
    next_seq: u64,
    capacity: usize,
    /// Set once anything was committed after the initial snapshot
    edited: bool,
}

impl HistoryManager {
    /// Start a session with `initial` as snapshot 0
    pub fn new(initial: Vec<Entry>, capacity: usize) -> Self {
        let capacity = capacity.max(MIN_SNAPSHOTS);
        debug!(count = initial.len(), capacity, "HistoryManager::new: called");
        let mut snapshots = VecDeque::with_capacity(capacity.min(16));
        snapshots.push_back(HistorySnapshot { seq: 0, entries: initial });
        Self {
            snapshots,
            cursor: 0,
            next_seq: 1,
            capacity,
            edited: false,
        }
    }

    /// The displayed snapshot
    pub fn current(&self) -> &HistorySnapshot {
        &self.snapshots[self.cursor]
    }

    /// Record a completed mutation; discards anything after the cursor
    pub fn commit(&mut self, entries: Vec<Entry>) -> &HistorySnapshot {
        let dropped = self.snapshots.len() - self.cursor - 1;
        self.snapshots.truncate(self.cursor + 1);

        let seq = self.next_seq;
        self.next_seq += 1;
        self.snapshots.push_back(HistorySnapshot { seq, entries });
        self.edited = true;

        if self.snapshots.len() > self.capacity {
            self.snapshots.pop_front();
        }
        self.cursor = self.snapshots.len() - 1;
        debug!(seq, dropped, depth = self.snapshots.len(), "commit: recorded snapshot");
        &self.snapshots[self.cursor]
    }

    /// Step back one snapshot
    pub fn undo(&mut self) -> Result<&HistorySnapshot, HistoryExhausted> {
        if self.cursor == 0 {
            debug!("undo: at oldest");
            return Err(HistoryExhausted::AtOldest);
        }
        self.cursor -= 1;
        debug!(cursor = self.cursor, "undo: moved cursor");
        Ok(&self.snapshots[self.cursor])
    }

    /// Step forward one snapshot
    pub fn redo(&mut self) -> Result<&HistorySnapshot, HistoryExhausted> {
        if self.cursor + 1 >= self.snapshots.len() {
            debug!("redo: at newest");
            return Err(HistoryExhausted::AtNewest);
        }
        self.cursor += 1;
        debug!(cursor = self.cursor, "redo: moved cursor");
        Ok(&self.snapshots[self.cursor])
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.snapshots.len()
    }

    /// Whether any mutation was committed since the session started
    ///
    /// Stays true after undoing back to the first snapshot.
    pub fn has_edits(&self) -> bool {
        self.edited
    }

    /// Throw the stack away and start over from `initial`
    pub fn reset(&mut self, initial: Vec<Entry>) {
        debug!(count = initial.len(), "reset: called");
        *self = Self::new(initial, self.capacity);
    }

    /// Snapshots currently held
    pub fn depth(&self) -> usize {
        self.snapshots.len()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
