//! Session manager messages
//!
//! Commands and responses for the actor pattern.

use serde_json::Value;
use thiserror::Error;
use tokio::sync::oneshot;

use super::editor::{ReloadOutcome, SeedMode};
use crate::domain::{Entry, EntryDraft, EntryPatch, Plan};
use crate::history::HistoryExhausted;
use crate::normalizer::SeedSource;
use crate::ordering::{InvalidOperation, Mutation, ReorderGesture};
use crate::sync::PersistenceFailure;

/// Errors from session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No plan is open")]
    NoActivePlan,

    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    #[error(transparent)]
    Invalid(#[from] InvalidOperation),

    #[error(transparent)]
    History(#[from] HistoryExhausted),

    #[error(transparent)]
    Persistence(#[from] PersistenceFailure),

    #[error("Channel error")]
    ChannelError,
}

/// Response from session operations
pub type SessionResponse<T> = Result<T, SessionError>;

/// What a caller sees of the open plan
#[derive(Debug, Clone, PartialEq)]
pub struct PlanView {
    pub plan: Plan,
    pub source: SeedSource,
    pub entries: Vec<Entry>,
    pub can_undo: bool,
    pub can_redo: bool,
}

/// Commands sent to the SessionManager actor
#[derive(Debug)]
pub enum SessionCommand {
    Open {
        plan: Plan,
        stored: Vec<Entry>,
        mode: SeedMode,
        reply: oneshot::Sender<SessionResponse<PlanView>>,
    },
    View {
        reply: oneshot::Sender<SessionResponse<PlanView>>,
    },
    ActivePlan {
        reply: oneshot::Sender<SessionResponse<Option<String>>>,
    },

    // Mutations
    Add {
        draft: EntryDraft,
        day: u32,
        at_order: Option<u32>,
        reply: oneshot::Sender<SessionResponse<Entry>>,
    },
    Move {
        entry_id: String,
        from_day: u32,
        to_day: u32,
        to_order: u32,
        reply: oneshot::Sender<SessionResponse<Mutation>>,
    },
    Gesture {
        gesture: ReorderGesture,
        reply: oneshot::Sender<SessionResponse<Mutation>>,
    },
    Delete {
        entry_id: String,
        reply: oneshot::Sender<SessionResponse<Mutation>>,
    },
    Update {
        entry_id: String,
        patch: EntryPatch,
        reply: oneshot::Sender<SessionResponse<Mutation>>,
    },

    // History
    Undo {
        reply: oneshot::Sender<SessionResponse<u64>>,
    },
    Redo {
        reply: oneshot::Sender<SessionResponse<u64>>,
    },

    /// Fresh data from the reload loop; ignored if `plan_id` is no longer open
    Reload {
        plan_id: String,
        raw: Value,
        stored: Vec<Entry>,
        reply: oneshot::Sender<SessionResponse<Option<ReloadOutcome>>>,
    },

    Close {
        reply: oneshot::Sender<SessionResponse<()>>,
    },

    // Shutdown
    Shutdown,
}
