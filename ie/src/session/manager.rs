//! SessionManager - actor that owns the active ItineraryEditor
//!
//! All edits funnel through one task, so the ordering engine and history see
//! one operation at a time no matter how many callers hold a handle.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use super::editor::{EditorDeps, ItineraryEditor, ReloadOutcome, SeedMode};
use super::messages::{PlanView, SessionCommand, SessionError, SessionResponse};
use crate::domain::{Entry, EntryDraft, EntryPatch};
use crate::events::EventBus;
use crate::history::DEFAULT_MAX_SNAPSHOTS;
use crate::ordering::{Mutation, ReorderGesture};
use crate::sync::{ItineraryStore, SyncAdapter};

const COMMAND_CHANNEL_CAPACITY: usize = 256;

/// Tunables for a session manager
#[derive(Debug, Clone, Copy)]
pub struct SessionSettings {
    pub max_snapshots: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            max_snapshots: DEFAULT_MAX_SNAPSHOTS,
        }
    }
}

/// Handle to send commands to the SessionManager
#[derive(Clone)]
pub struct SessionManager {
    tx: mpsc::Sender<SessionCommand>,
    sync: SyncAdapter,
    events: Arc<EventBus>,
}

impl SessionManager {
    /// Spawn the actor and its sync worker on the current runtime
    pub fn spawn(store: Arc<dyn ItineraryStore>, events: Arc<EventBus>, settings: SessionSettings) -> Self {
        debug!(max_snapshots = settings.max_snapshots, "spawn: called");
        let sync = SyncAdapter::spawn(store, events.clone());
        let deps = EditorDeps::new(events.clone())
            .with_sync(sync.clone())
            .with_max_snapshots(settings.max_snapshots);

        let (tx, rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        tokio::spawn(actor_loop(deps, rx));

        info!("SessionManager spawned");
        Self { tx, sync, events }
    }

    pub fn sync(&self) -> &SyncAdapter {
        &self.sync
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    async fn call<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<SessionResponse<T>>) -> SessionCommand,
    ) -> SessionResponse<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| SessionError::ChannelError)?;
        reply_rx.await.map_err(|_| SessionError::ChannelError)?
    }

    /// Load a plan from the store and make it the active session
    pub async fn open(&self, plan_id: &str, mode: SeedMode) -> SessionResponse<PlanView> {
        debug!(%plan_id, ?mode, "open: called");
        let plan = self
            .sync
            .store()
            .load_plan(plan_id)
            .await?
            .ok_or_else(|| SessionError::PlanNotFound(plan_id.to_string()))?;
        let stored = self.sync.load_entries(plan_id).await?;
        // A written entry log wins over the document, even once emptied
        let mode = if mode == SeedMode::Resume && self.sync.store().has_entry_log(plan_id).await? {
            SeedMode::Stored
        } else {
            mode
        };
        self.call(|reply| SessionCommand::Open {
            plan,
            stored,
            mode,
            reply,
        })
        .await
    }

    pub async fn view(&self) -> SessionResponse<PlanView> {
        debug!("view: called");
        self.call(|reply| SessionCommand::View { reply }).await
    }

    pub async fn active_plan(&self) -> SessionResponse<Option<String>> {
        self.call(|reply| SessionCommand::ActivePlan { reply }).await
    }

    pub async fn add(&self, draft: EntryDraft, day: u32, at_order: Option<u32>) -> SessionResponse<Entry> {
        debug!(name = %draft.name, day, ?at_order, "add: called");
        self.call(|reply| SessionCommand::Add {
            draft,
            day,
            at_order,
            reply,
        })
        .await
    }

    pub async fn move_entry(
        &self,
        entry_id: &str,
        from_day: u32,
        to_day: u32,
        to_order: u32,
    ) -> SessionResponse<Mutation> {
        debug!(%entry_id, from_day, to_day, to_order, "move_entry: called");
        self.call(|reply| SessionCommand::Move {
            entry_id: entry_id.to_string(),
            from_day,
            to_day,
            to_order,
            reply,
        })
        .await
    }

    pub async fn apply_gesture(&self, gesture: ReorderGesture) -> SessionResponse<Mutation> {
        debug!(entry_id = %gesture.entry_id, "apply_gesture: called");
        self.call(|reply| SessionCommand::Gesture { gesture, reply }).await
    }

    pub async fn delete(&self, entry_id: &str) -> SessionResponse<Mutation> {
        debug!(%entry_id, "delete: called");
        self.call(|reply| SessionCommand::Delete {
            entry_id: entry_id.to_string(),
            reply,
        })
        .await
    }

    pub async fn update(&self, entry_id: &str, patch: EntryPatch) -> SessionResponse<Mutation> {
        debug!(%entry_id, "update: called");
        self.call(|reply| SessionCommand::Update {
            entry_id: entry_id.to_string(),
            patch,
            reply,
        })
        .await
    }

    pub async fn undo(&self) -> SessionResponse<u64> {
        self.call(|reply| SessionCommand::Undo { reply }).await
    }

    pub async fn redo(&self) -> SessionResponse<u64> {
        self.call(|reply| SessionCommand::Redo { reply }).await
    }

    /// Fetch fresh data for the active plan and offer it to the editor
    ///
    /// `None` when no plan is open or the plan changed while loading.
    pub async fn reload_active(&self) -> SessionResponse<Option<ReloadOutcome>> {
        let Some(plan_id) = self.active_plan().await? else {
            debug!("reload_active: no plan open");
            return Ok(None);
        };
        debug!(%plan_id, "reload_active: called");
        let raw = self.sync.load_raw_plan(&plan_id).await?.unwrap_or_default();
        let stored = self.sync.load_entries(&plan_id).await?;
        self.call(|reply| SessionCommand::Reload {
            plan_id,
            raw,
            stored,
            reply,
        })
        .await
    }

    pub async fn close(&self) -> SessionResponse<()> {
        debug!("close: called");
        self.call(|reply| SessionCommand::Close { reply }).await
    }

    /// Wait for queued store writes to land
    pub async fn flush(&self) -> SessionResponse<()> {
        self.sync.flush().await.map_err(SessionError::from)
    }

    /// Stop the actor; later calls fail with `ChannelError`
    pub async fn shutdown(&self) -> SessionResponse<()> {
        debug!("shutdown: called");
        self.tx
            .send(SessionCommand::Shutdown)
            .await
            .map_err(|_| SessionError::ChannelError)
    }
}

fn view_of(editor: &ItineraryEditor) -> PlanView {
    PlanView {
        plan: editor.plan().clone(),
        source: editor.source(),
        entries: editor.entries().to_vec(),
        can_undo: editor.history().can_undo(),
        can_redo: editor.history().can_redo(),
    }
}

async fn actor_loop(deps: EditorDeps, mut rx: mpsc::Receiver<SessionCommand>) {
    debug!("actor_loop: called");
    let mut editor: Option<ItineraryEditor> = None;

    while let Some(cmd) = rx.recv().await {
        match cmd {
            SessionCommand::Open {
                plan,
                stored,
                mode,
                reply,
            } => {
                debug!(plan_id = %plan.id, ?mode, "actor_loop: Open command");
                editor = Some(match editor.take() {
                    Some(mut current) => {
                        current.switch_plan(plan, &stored, mode);
                        current
                    }
                    None => ItineraryEditor::start(plan, &stored, mode, deps.clone()),
                });
                let _ = reply.send(editor.as_ref().map(view_of).ok_or(SessionError::NoActivePlan));
            }

            SessionCommand::View { reply } => {
                let _ = reply.send(editor.as_ref().map(view_of).ok_or(SessionError::NoActivePlan));
            }

            SessionCommand::ActivePlan { reply } => {
                let _ = reply.send(Ok(editor.as_ref().map(|e| e.plan_id().to_string())));
            }

            SessionCommand::Add {
                draft,
                day,
                at_order,
                reply,
            } => {
                debug!(day, "actor_loop: Add command");
                let result = with_editor(&mut editor, |e| e.add(draft, day, at_order).map_err(SessionError::from));
                let _ = reply.send(result);
            }

            SessionCommand::Move {
                entry_id,
                from_day,
                to_day,
                to_order,
                reply,
            } => {
                debug!(%entry_id, "actor_loop: Move command");
                let result = with_editor(&mut editor, |e| {
                    e.move_entry(&entry_id, from_day, to_day, to_order)
                        .map_err(SessionError::from)
                });
                let _ = reply.send(result);
            }

            SessionCommand::Gesture { gesture, reply } => {
                debug!(entry_id = %gesture.entry_id, "actor_loop: Gesture command");
                let result = with_editor(&mut editor, |e| e.apply_gesture(&gesture).map_err(SessionError::from));
                let _ = reply.send(result);
            }

            SessionCommand::Delete { entry_id, reply } => {
                debug!(%entry_id, "actor_loop: Delete command");
                let result = with_editor(&mut editor, |e| e.delete(&entry_id).map_err(SessionError::from));
                let _ = reply.send(result);
            }

            SessionCommand::Update { entry_id, patch, reply } => {
                debug!(%entry_id, "actor_loop: Update command");
                let result = with_editor(&mut editor, |e| e.update(&entry_id, &patch).map_err(SessionError::from));
                let _ = reply.send(result);
            }

            SessionCommand::Undo { reply } => {
                let result = with_editor(&mut editor, |e| e.undo().map_err(SessionError::from));
                let _ = reply.send(result);
            }

            SessionCommand::Redo { reply } => {
                let result = with_editor(&mut editor, |e| e.redo().map_err(SessionError::from));
                let _ = reply.send(result);
            }

            SessionCommand::Reload {
                plan_id,
                raw,
                stored,
                reply,
            } => {
                let outcome = match editor.as_mut() {
                    Some(e) if e.plan_id() == plan_id => Some(e.apply_reload(&raw, &stored)),
                    _ => {
                        debug!(%plan_id, "actor_loop: reload for inactive plan ignored");
                        None
                    }
                };
                let _ = reply.send(Ok(outcome));
            }

            SessionCommand::Close { reply } => {
                if let Some(e) = editor.take() {
                    e.close();
                }
                let _ = reply.send(Ok(()));
            }

            SessionCommand::Shutdown => {
                info!("SessionManager shutting down");
                if let Some(e) = editor.take() {
                    e.close();
                }
                break;
            }
        }
    }

    debug!("actor_loop: exiting");
}

fn with_editor<T>(
    editor: &mut Option<ItineraryEditor>,
    op: impl FnOnce(&mut ItineraryEditor) -> SessionResponse<T>,
) -> SessionResponse<T> {
    match editor.as_mut() {
        Some(e) => op(e),
        None => Err(SessionError::NoActivePlan),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{EntryKind, Plan};
    use crate::ordering::InvalidOperation;
    use crate::sync::mock::MockItineraryStore;
    use serde_json::json;

    fn store_with_plan() -> Arc<MockItineraryStore> {
        let plan = Plan::with_id("rome", "Rome", 2).with_document(json!({
            "hotels": ["Hotel Artemide"],
            "attractions": ["Colosseum", "Pantheon"]
        }));
        Arc::new(MockItineraryStore::new().with_plan(plan, Vec::new()))
    }

    fn spawn(store: Arc<MockItineraryStore>) -> SessionManager {
        SessionManager::spawn(store, Arc::new(EventBus::default()), SessionSettings::default())
    }

    #[tokio::test]
    async fn test_operations_require_open_plan() {
        let session = spawn(store_with_plan());
        assert!(matches!(session.undo().await, Err(SessionError::NoActivePlan)));
        assert!(matches!(session.view().await, Err(SessionError::NoActivePlan)));
        assert_eq!(session.reload_active().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_open_unknown_plan() {
        let session = spawn(store_with_plan());
        let err = session.open("paris", SeedMode::Open).await.unwrap_err();
        assert!(matches!(err, SessionError::PlanNotFound(id) if id == "paris"));
    }

    #[tokio::test]
    async fn test_edits_reach_store() {
        let store = store_with_plan();
        let session = spawn(store.clone());

        let view = session.open("rome", SeedMode::Open).await.unwrap();
        assert_eq!(view.entries.len(), 3);
        assert!(!view.can_undo);

        let added = session
            .add(EntryDraft::new(EntryKind::Restaurant, "Roscioli"), 2, None)
            .await
            .unwrap();
        session.flush().await.unwrap();

        let stored = store.stored("rome");
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].id, added.id);

        session.undo().await.unwrap();
        session.flush().await.unwrap();
        assert!(store.stored("rome").is_empty());

        let view = session.view().await.unwrap();
        assert!(view.can_redo);
    }

    #[tokio::test]
    async fn test_invalid_operation_surfaces() {
        let session = spawn(store_with_plan());
        session.open("rome", SeedMode::Open).await.unwrap();

        let err = session.move_entry("nope", 1, 2, 0).await.unwrap_err();
        assert!(matches!(
            err,
            SessionError::Invalid(InvalidOperation::NotFound { .. })
        ));
        assert!(matches!(
            session.redo().await,
            Err(SessionError::History(_))
        ));
    }

    #[tokio::test]
    async fn test_shutdown_closes_channel() {
        let session = spawn(store_with_plan());
        session.shutdown().await.unwrap();
        let result = session.view().await;
        assert!(matches!(result, Err(SessionError::ChannelError)));
    }
}
