//! Editor event types
//!
//! These replace shared mutable UI state: the editor publishes what happened
//! and any number of views subscribe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ordering::MutationKind;

/// Direction of a history step
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryDirection {
    Undo,
    Redo,
}

/// Everything observable about an editing session
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EditorEvent {
    /// A plan became the active session
    PlanOpened {
        plan_id: String,
        /// `document`, `stored` or `empty`
        source: String,
        entry_count: usize,
    },
    /// A mutation was committed to history
    EntriesChanged {
        plan_id: String,
        cause: MutationKind,
        entry_id: String,
        seq: u64,
    },
    /// Undo or redo moved the history cursor
    HistoryMoved {
        plan_id: String,
        direction: HistoryDirection,
        seq: u64,
    },
    /// A background reload replaced the pristine list
    ReloadApplied { plan_id: String, entry_count: usize },
    /// A background reload was ignored
    ReloadSkipped { plan_id: String, reason: String },
    /// A persist or remove call failed; the local state was kept
    PersistenceFailed {
        plan_id: String,
        entry_id: String,
        operation: String,
        message: String,
    },
    /// The session for a plan ended
    PlanClosed { plan_id: String },
}

impl EditorEvent {
    pub fn plan_id(&self) -> &str {
        match self {
            EditorEvent::PlanOpened { plan_id, .. }
            | EditorEvent::EntriesChanged { plan_id, .. }
            | EditorEvent::HistoryMoved { plan_id, .. }
            | EditorEvent::ReloadApplied { plan_id, .. }
            | EditorEvent::ReloadSkipped { plan_id, .. }
            | EditorEvent::PersistenceFailed { plan_id, .. }
            | EditorEvent::PlanClosed { plan_id } => plan_id,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            EditorEvent::PlanOpened { .. } => "PlanOpened",
            EditorEvent::EntriesChanged { .. } => "EntriesChanged",
            EditorEvent::HistoryMoved { .. } => "HistoryMoved",
            EditorEvent::ReloadApplied { .. } => "ReloadApplied",
            EditorEvent::ReloadSkipped { .. } => "ReloadSkipped",
            EditorEvent::PersistenceFailed { .. } => "PersistenceFailed",
            EditorEvent::PlanClosed { .. } => "PlanClosed",
        }
    }
}

/// A timestamped event, as written by `ie edit --events`
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventLogEntry {
    #[serde(rename = "ts")]
    pub timestamp: DateTime<Utc>,
    pub event: EditorEvent,
}

impl EventLogEntry {
    pub fn new(event: EditorEvent) -> Self {
        Self {
            timestamp: Utc::now(),
            event,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_plan_id_and_type() {
        let event = EditorEvent::HistoryMoved {
            plan_id: "munich-3d".to_string(),
            direction: HistoryDirection::Undo,
            seq: 2,
        };
        assert_eq!(event.plan_id(), "munich-3d");
        assert_eq!(event.event_type(), "HistoryMoved");
    }

    #[test]
    fn test_event_serialization() {
        let event = EditorEvent::EntriesChanged {
            plan_id: "p".to_string(),
            cause: MutationKind::Move,
            entry_id: "e1".to_string(),
            seq: 4,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"EntriesChanged\""));
        assert!(json.contains("\"cause\":\"move\""));

        let parsed: EditorEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }

    #[test]
    fn test_event_log_entry() {
        let entry = EventLogEntry::new(EditorEvent::PlanClosed {
            plan_id: "p".to_string(),
        });
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"ts\""));
        assert!(json.contains("PlanClosed"));
    }
}
