//! Publish/subscribe channel for editor activity
//!
//! ```text
//!   ItineraryEditor ──┐                 ┌──> CLI event log
//!                     ├──> EventBus ────┤
//!   SyncAdapter ──────┘  (broadcast)    └──> views
//! ```
//!
//! Every event carries the plan id it belongs to, so subscribers can ignore
//! events from a session that is no longer active.

mod bus;
mod types;

pub use bus::{DEFAULT_CHANNEL_CAPACITY, EventBus, EventEmitter};
pub use types::{EditorEvent, EventLogEntry, HistoryDirection};
