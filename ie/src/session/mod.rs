//! Editing sessions
//!
//! [`ItineraryEditor`] ties one plan's ordering engine, history and sync
//! adapter together. [`SessionManager`] owns the active editor inside an
//! actor task so edits, undo/redo and background reloads are serialized.

mod editor;
mod manager;
mod messages;
mod reload;

pub use editor::{EditorDeps, ItineraryEditor, ReloadOutcome, ReloadSkip, SeedMode, diff_sync_ops};
pub use manager::{SessionManager, SessionSettings};
pub use messages::{PlanView, SessionCommand, SessionError, SessionResponse};
pub use reload::spawn_reload_loop;
