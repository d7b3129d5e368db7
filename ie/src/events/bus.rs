//! Event Bus - broadcast channel for editor events

use tokio::sync::broadcast;
use tracing::debug;

use super::types::{EditorEvent, HistoryDirection};
use crate::ordering::MutationKind;

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

/// Central event bus for editing sessions
///
/// Views subscribe; the editor and the sync worker emit.
pub struct EventBus {
    tx: broadcast::Sender<EditorEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Emit an event to all subscribers
    ///
    /// Fire-and-forget: with no subscribers the event is dropped.
    pub fn emit(&self, event: EditorEvent) {
        debug!(event_type = event.event_type(), plan_id = event.plan_id(), "EventBus::emit");
        let _ = self.tx.send(event);
    }

    /// Receive every event emitted after this call
    pub fn subscribe(&self) -> broadcast::Receiver<EditorEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Emitter bound to one plan
    pub fn emitter_for(&self, plan_id: impl Into<String>) -> EventEmitter {
        let plan_id = plan_id.into();
        debug!(%plan_id, "EventBus::emitter_for: creating emitter");
        EventEmitter {
            tx: self.tx.clone(),
            plan_id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Cheap handle that stamps every event with its plan id
#[derive(Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<EditorEvent>,
    plan_id: String,
}

impl EventEmitter {
    pub fn plan_id(&self) -> &str {
        &self.plan_id
    }

    pub fn emit(&self, event: EditorEvent) {
        debug!(event_type = event.event_type(), "EventEmitter::emit");
        let _ = self.tx.send(event);
    }

    pub fn plan_opened(&self, source: &str, entry_count: usize) {
        self.emit(EditorEvent::PlanOpened {
            plan_id: self.plan_id.clone(),
            source: source.to_string(),
            entry_count,
        });
    }

    pub fn entries_changed(&self, cause: MutationKind, entry_id: &str, seq: u64) {
        self.emit(EditorEvent::EntriesChanged {
            plan_id: self.plan_id.clone(),
            cause,
            entry_id: entry_id.to_string(),
            seq,
        });
    }

    pub fn history_moved(&self, direction: HistoryDirection, seq: u64) {
        self.emit(EditorEvent::HistoryMoved {
            plan_id: self.plan_id.clone(),
            direction,
            seq,
        });
    }

    pub fn reload_applied(&self, entry_count: usize) {
        self.emit(EditorEvent::ReloadApplied {
            plan_id: self.plan_id.clone(),
            entry_count,
        });
    }

    pub fn reload_skipped(&self, reason: &str) {
        self.emit(EditorEvent::ReloadSkipped {
            plan_id: self.plan_id.clone(),
            reason: reason.to_string(),
        });
    }

    pub fn persistence_failed(&self, entry_id: &str, operation: &str, message: &str) {
        self.emit(EditorEvent::PersistenceFailed {
            plan_id: self.plan_id.clone(),
            entry_id: entry_id.to_string(),
            operation: operation.to_string(),
            message: message.to_string(),
        });
    }

    pub fn plan_closed(&self) {
        self.emit(EditorEvent::PlanClosed {
            plan_id: self.plan_id.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast::error::TryRecvError;

    #[tokio::test]
    async fn test_emit_without_subscribers() {
        let bus = EventBus::new(16);
        bus.emit(EditorEvent::PlanClosed {
            plan_id: "p".to_string(),
        });
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_emitter_stamps_plan_id() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let emitter = bus.emitter_for("rome-4d");

        emitter.plan_opened("document", 7);
        emitter.entries_changed(MutationKind::Insert, "e1", 1);
        emitter.history_moved(HistoryDirection::Undo, 0);
        emitter.reload_skipped("local edits");

        for _ in 0..4 {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.plan_id(), "rome-4d");
        }
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[tokio::test]
    async fn test_multiple_subscribers() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emitter_for("p").persistence_failed("e1", "persist", "disk full");

        let first = rx1.recv().await.unwrap();
        let second = rx2.recv().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.event_type(), "PersistenceFailed");
    }
}
