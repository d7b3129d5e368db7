//! ItineraryEditor - one plan's entries, history and sync wiring
//!
//! Every user operation runs synchronously against the ordering engine,
//! commits one snapshot, then hands its persistence work to the sync adapter
//! without waiting for it.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::domain::{Entry, EntryDraft, EntryPatch, IdAllocator, Plan};
use crate::events::{EventBus, EventEmitter, HistoryDirection};
use crate::history::{DEFAULT_MAX_SNAPSHOTS, HistoryExhausted, HistoryManager};
use crate::normalizer::{Normalized, SeedSource, canonicalize, normalize_with_fallback};
use crate::ordering::{InvalidOperation, Mutation, OrderingEngine, ReorderGesture, SyncOp};
use crate::sync::SyncAdapter;

/// Collaborators shared by every editor of a session manager
#[derive(Clone)]
pub struct EditorDeps {
    pub events: Arc<EventBus>,
    pub sync: Option<SyncAdapter>,
    pub max_snapshots: usize,
}

impl EditorDeps {
    pub fn new(events: Arc<EventBus>) -> Self {
        Self {
            events,
            sync: None,
            max_snapshots: DEFAULT_MAX_SNAPSHOTS,
        }
    }

    pub fn with_sync(mut self, sync: SyncAdapter) -> Self {
        self.sync = Some(sync);
        self
    }

    pub fn with_max_snapshots(mut self, max_snapshots: usize) -> Self {
        self.max_snapshots = max_snapshots;
        self
    }
}

/// Why a background reload was not applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadSkip {
    /// The user has edited this session
    LocalEdits,
    /// Neither the document nor the store had entries
    NothingToShow,
}

impl std::fmt::Display for ReloadSkip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LocalEdits => write!(f, "local edits"),
            Self::NothingToShow => write!(f, "nothing to show"),
        }
    }
}

/// How a new session picks its initial list
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedMode {
    /// Document first, stored entries as fallback
    #[default]
    Open,
    /// Stored entries first, document as fallback
    Resume,
    /// Stored entries only, even when none are left
    Stored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    Applied { entry_count: usize },
    Unchanged,
    Skipped(ReloadSkip),
}

pub struct ItineraryEditor {
    plan: Plan,
    engine: OrderingEngine,
    history: HistoryManager,
    ids: IdAllocator,
    source: SeedSource,
    mode: SeedMode,
    emitter: EventEmitter,
    deps: EditorDeps,
}

/// Pick the initial list for `mode`
fn seed_list(mode: SeedMode, raw: &Value, duration_days: u32, stored: &[Entry]) -> Normalized {
    match mode {
        SeedMode::Open => normalize_with_fallback(raw, duration_days, stored),
        SeedMode::Resume if stored.is_empty() => normalize_with_fallback(raw, duration_days, stored),
        SeedMode::Resume | SeedMode::Stored => Normalized {
            entries: canonicalize(stored.to_vec(), duration_days),
            source: SeedSource::Stored,
        },
    }
}

impl ItineraryEditor {
    pub fn start(plan: Plan, stored: &[Entry], mode: SeedMode, deps: EditorDeps) -> Self {
        match mode {
            SeedMode::Open => Self::open(plan, stored, deps),
            SeedMode::Resume => Self::resume(plan, stored, deps),
            SeedMode::Stored => Self::stored(plan, stored, deps),
        }
    }

    /// Seed from the plan's generated document, falling back to stored entries
    pub fn open(plan: Plan, stored: &[Entry], deps: EditorDeps) -> Self {
        debug!(plan_id = %plan.id, stored = stored.len(), "ItineraryEditor::open: called");
        let normalized = seed_list(SeedMode::Open, &plan.raw_generated_document, plan.days(), stored);
        Self::seeded(plan, SeedMode::Open, normalized, deps)
    }

    /// Seed from stored entries when there are any, else from the document
    ///
    /// Used for plans that were already edited and persisted.
    pub fn resume(plan: Plan, stored: &[Entry], deps: EditorDeps) -> Self {
        debug!(plan_id = %plan.id, stored = stored.len(), "ItineraryEditor::resume: called");
        let normalized = seed_list(SeedMode::Resume, &plan.raw_generated_document, plan.days(), stored);
        Self::seeded(plan, SeedMode::Resume, normalized, deps)
    }

    /// Seed from stored entries only
    ///
    /// For plans whose entry log exists; an emptied log stays empty instead
    /// of being refilled from the document.
    pub fn stored(plan: Plan, stored: &[Entry], deps: EditorDeps) -> Self {
        debug!(plan_id = %plan.id, stored = stored.len(), "ItineraryEditor::stored: called");
        let normalized = seed_list(SeedMode::Stored, &plan.raw_generated_document, plan.days(), stored);
        Self::seeded(plan, SeedMode::Stored, normalized, deps)
    }

    fn seeded(plan: Plan, mode: SeedMode, normalized: Normalized, deps: EditorDeps) -> Self {
        let engine = OrderingEngine::new(normalized.entries, plan.days());
        let history = HistoryManager::new(engine.entries().to_vec(), deps.max_snapshots);
        let mut ids = IdAllocator::new();
        ids.observe(engine.entries().iter().map(|e| e.id.as_str()));

        if let Some(sync) = &deps.sync {
            sync.set_active_plan(Some(&plan.id));
        }
        let emitter = deps.events.emitter_for(plan.id.as_str());
        emitter.plan_opened(&normalized.source.to_string(), engine.entries().len());
        info!(
            plan_id = %plan.id,
            source = %normalized.source,
            count = engine.entries().len(),
            "Opened itinerary"
        );

        Self {
            plan,
            engine,
            history,
            ids,
            source: normalized.source,
            mode,
            emitter,
            deps,
        }
    }

    pub fn plan(&self) -> &Plan {
        &self.plan
    }

    pub fn plan_id(&self) -> &str {
        &self.plan.id
    }

    pub fn entries(&self) -> &[Entry] {
        self.engine.entries()
    }

    pub fn get(&self, entry_id: &str) -> Option<&Entry> {
        self.engine.get(entry_id)
    }

    pub fn source(&self) -> SeedSource {
        self.source
    }

    pub fn mode(&self) -> SeedMode {
        self.mode
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    /// Create an entry from a draft with a fresh id
    pub fn add(&mut self, draft: EntryDraft, day: u32, at_order: Option<u32>) -> Result<Entry, InvalidOperation> {
        debug!(name = %draft.name, day, ?at_order, "add: called");
        if draft.name.trim().is_empty() {
            return Err(InvalidOperation::EmptyName);
        }
        let id = self.ids.allocate(draft.kind, &draft.name);
        let mutation = self.insert_entry(draft.into_entry(id), day, at_order)?;
        self.engine
            .get(&mutation.entry_id)
            .cloned()
            .ok_or(InvalidOperation::NotFound {
                entry_id: mutation.entry_id,
            })
    }

    /// Insert an entry that already carries an id
    ///
    /// Ids seen earlier in the session stay taken after their entry is
    /// deleted.
    pub fn insert(&mut self, entry: Entry, day: u32, at_order: Option<u32>) -> Result<Mutation, InvalidOperation> {
        let entry_id = entry.id.clone();
        if self.ids.is_known(&entry_id) && self.engine.get(&entry_id).is_none() {
            debug!(%entry_id, "insert: id was used earlier in this session");
            return Err(InvalidOperation::DuplicateId { entry_id });
        }
        self.insert_entry(entry, day, at_order)
    }

    fn insert_entry(&mut self, entry: Entry, day: u32, at_order: Option<u32>) -> Result<Mutation, InvalidOperation> {
        let entry_id = entry.id.clone();
        let mutation = self.engine.insert(entry, day, at_order)?;
        self.ids.observe([entry_id.as_str()]);
        Ok(self.commit(mutation))
    }

    pub fn move_entry(
        &mut self,
        entry_id: &str,
        from_day: u32,
        to_day: u32,
        to_order: u32,
    ) -> Result<Mutation, InvalidOperation> {
        let mutation = self.engine.move_entry(entry_id, from_day, to_day, to_order)?;
        Ok(self.commit(mutation))
    }

    pub fn apply_gesture(&mut self, gesture: &ReorderGesture) -> Result<Mutation, InvalidOperation> {
        let mutation = self.engine.apply_gesture(gesture)?;
        Ok(self.commit(mutation))
    }

    pub fn delete(&mut self, entry_id: &str) -> Result<Mutation, InvalidOperation> {
        let mutation = self.engine.delete(entry_id)?;
        Ok(self.commit(mutation))
    }

    pub fn update(&mut self, entry_id: &str, patch: &EntryPatch) -> Result<Mutation, InvalidOperation> {
        let mutation = self.engine.update(entry_id, patch)?;
        Ok(self.commit(mutation))
    }

    /// Step back one snapshot; returns the displayed snapshot's seq
    pub fn undo(&mut self) -> Result<u64, HistoryExhausted> {
        debug!(plan_id = %self.plan.id, "undo: called");
        let snapshot = self.history.undo()?.clone();
        self.show(snapshot.entries, HistoryDirection::Undo, snapshot.seq);
        Ok(snapshot.seq)
    }

    /// Step forward one snapshot; returns the displayed snapshot's seq
    pub fn redo(&mut self) -> Result<u64, HistoryExhausted> {
        debug!(plan_id = %self.plan.id, "redo: called");
        let snapshot = self.history.redo()?.clone();
        self.show(snapshot.entries, HistoryDirection::Redo, snapshot.seq);
        Ok(snapshot.seq)
    }

    /// Re-normalize from a freshly fetched document and stored list
    ///
    /// Only a pristine session is replaced; once the user has edited, the
    /// local list wins until the session is closed.
    pub fn apply_reload(&mut self, raw: &Value, stored: &[Entry]) -> ReloadOutcome {
        debug!(plan_id = %self.plan.id, stored = stored.len(), "apply_reload: called");
        if self.history.has_edits() {
            self.emitter.reload_skipped(&ReloadSkip::LocalEdits.to_string());
            return ReloadOutcome::Skipped(ReloadSkip::LocalEdits);
        }

        let normalized = seed_list(self.mode, raw, self.plan.days(), stored);
        if normalized.entries.is_empty() {
            debug!(plan_id = %self.plan.id, "apply_reload: keeping current view");
            self.emitter.reload_skipped(&ReloadSkip::NothingToShow.to_string());
            return ReloadOutcome::Skipped(ReloadSkip::NothingToShow);
        }
        if normalized.entries.as_slice() == self.engine.entries() {
            debug!(plan_id = %self.plan.id, "apply_reload: unchanged");
            return ReloadOutcome::Unchanged;
        }

        if !raw.is_null() {
            self.plan.raw_generated_document = raw.clone();
        }
        let entry_count = normalized.entries.len();
        self.ids.observe(normalized.entries.iter().map(|e| e.id.as_str()));
        self.engine.restore(normalized.entries);
        self.history.reset(self.engine.entries().to_vec());
        self.source = normalized.source;
        self.emitter.reload_applied(entry_count);
        info!(plan_id = %self.plan.id, entry_count, source = %self.source, "Applied reload");
        ReloadOutcome::Applied { entry_count }
    }

    /// Close this plan and open another in its place
    pub fn switch_plan(&mut self, plan: Plan, stored: &[Entry], mode: SeedMode) {
        info!(from = %self.plan.id, to = %plan.id, "Switching plan");
        self.emitter.plan_closed();
        *self = Self::start(plan, stored, mode, self.deps.clone());
    }

    /// End the session; queued writes for this plan are dropped
    pub fn close(self) {
        debug!(plan_id = %self.plan.id, "close: called");
        if let Some(sync) = &self.deps.sync
            && sync.active_plan().as_deref() == Some(self.plan.id.as_str())
        {
            sync.set_active_plan(None);
        }
        self.emitter.plan_closed();
    }

    fn commit(&mut self, mutation: Mutation) -> Mutation {
        if mutation.is_noop() {
            debug!(entry_id = %mutation.entry_id, kind = %mutation.kind, "commit: no change, skipping history");
            return mutation;
        }
        let seq = self.history.commit(self.engine.entries().to_vec()).seq;
        self.emitter.entries_changed(mutation.kind, &mutation.entry_id, seq);
        self.dispatch(mutation.sync.clone());
        mutation
    }

    fn show(&mut self, entries: Vec<Entry>, direction: HistoryDirection, seq: u64) {
        let ops = diff_sync_ops(self.engine.entries(), &entries);
        self.engine.restore(entries);
        self.emitter.history_moved(direction, seq);
        self.dispatch(ops);
    }

    fn dispatch(&self, ops: Vec<SyncOp>) {
        if let Some(sync) = &self.deps.sync {
            sync.dispatch(&self.plan.id, ops);
        }
    }
}

/// Persistence work that turns the `before` list into `after`
pub fn diff_sync_ops(before: &[Entry], after: &[Entry]) -> Vec<SyncOp> {
    let previous: HashMap<&str, &Entry> = before.iter().map(|e| (e.id.as_str(), e)).collect();
    let current: HashMap<&str, &Entry> = after.iter().map(|e| (e.id.as_str(), e)).collect();

    let mut ops: Vec<SyncOp> = before
        .iter()
        .filter(|e| !current.contains_key(e.id.as_str()))
        .map(|e| SyncOp::Remove { entry_id: e.id.clone() })
        .collect();
    ops.extend(
        after
            .iter()
            .filter(|e| previous.get(e.id.as_str()) != Some(e))
            .cloned()
            .map(SyncOp::Persist),
    );
    ops
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntryKind;
    use crate::events::EditorEvent;
    use crate::ordering::check_invariants;
    use serde_json::json;

    fn deps() -> EditorDeps {
        EditorDeps::new(Arc::new(EventBus::default()))
    }

    fn munich() -> Plan {
        Plan::with_id("munich", "Munich", 3).with_document(json!({
            "accommodations": {"hotels": [{"name": "Hotel Bayerischer Hof", "price_per_night": 320}]},
            "attractions": {"places": [
                {"name": "Marienplatz"},
                {"name": "English Garden"},
                {"name": "Nymphenburg Palace"},
                {"name": "Deutsches Museum"}
            ]}
        }))
    }

    fn day_names(editor: &ItineraryEditor, day: u32) -> Vec<String> {
        editor
            .entries()
            .iter()
            .filter(|e| e.day == day)
            .map(|e| e.name.clone())
            .collect()
    }

    #[test]
    fn test_open_seeds_from_document() {
        let editor = ItineraryEditor::open(munich(), &[], deps());
        assert_eq!(editor.source(), SeedSource::Document);
        assert_eq!(editor.entries().len(), 5);
        assert_eq!(editor.history().depth(), 1);
        assert!(check_invariants(editor.entries(), 3).is_ok());
    }

    #[test]
    fn test_open_falls_back_to_stored() {
        let plan = Plan::with_id("empty", "Nowhere", 2);
        let stored = vec![Entry::new("s1", EntryKind::Restaurant, "Cafe").at(5, 3)];
        let editor = ItineraryEditor::open(plan, &stored, deps());
        assert_eq!(editor.source(), SeedSource::Stored);
        assert_eq!(editor.entries()[0].position(), (1, 0));
    }

    #[test]
    fn test_resume_prefers_stored() {
        let stored = vec![Entry::new("s1", EntryKind::Activity, "Bike tour").at(2, 0)];
        let editor = ItineraryEditor::resume(munich(), &stored, deps());
        assert_eq!(editor.source(), SeedSource::Stored);
        assert_eq!(editor.entries().len(), 1);

        let editor = ItineraryEditor::resume(munich(), &[], deps());
        assert_eq!(editor.source(), SeedSource::Document);
    }

    #[test]
    fn test_add_allocates_unique_ids() {
        let mut editor = ItineraryEditor::open(munich(), &[], deps());
        let first = editor.add(EntryDraft::new(EntryKind::Restaurant, "Tantris"), 2, Some(0)).unwrap();
        let second = editor.add(EntryDraft::new(EntryKind::Restaurant, "Tantris"), 2, None).unwrap();

        assert_ne!(first.id, second.id);
        assert_eq!(first.position(), (2, 0));
        assert_eq!(editor.history().depth(), 3);
        assert_eq!(
            editor.add(EntryDraft::new(EntryKind::Activity, " "), 1, None).unwrap_err(),
            InvalidOperation::EmptyName
        );
    }

    #[test]
    fn test_deleted_id_is_not_reused() {
        let mut editor = ItineraryEditor::open(munich(), &[], deps());
        editor.insert(Entry::new("x", EntryKind::Activity, "Surfing"), 1, None).unwrap();
        editor.delete("x").unwrap();

        let err = editor
            .insert(Entry::new("x", EntryKind::Hotel, "Different"), 2, None)
            .unwrap_err();
        assert_eq!(
            err,
            InvalidOperation::DuplicateId {
                entry_id: "x".to_string()
            }
        );
        assert!(editor.get("x").is_none());

        // Undo brings the original back; that is not a reuse
        editor.undo().unwrap();
        assert_eq!(editor.get("x").map(|e| e.name.as_str()), Some("Surfing"));
    }

    #[test]
    fn test_stored_mode_keeps_empty_log_empty() {
        let editor = ItineraryEditor::stored(munich(), &[], deps());
        assert_eq!(editor.source(), SeedSource::Stored);
        assert!(editor.entries().is_empty());

        let mut editor = ItineraryEditor::start(munich(), &[], SeedMode::Stored, deps());
        assert_eq!(editor.mode(), SeedMode::Stored);
        let raw = editor.plan().raw_generated_document.clone();
        assert_eq!(
            editor.apply_reload(&raw, &[]),
            ReloadOutcome::Skipped(ReloadSkip::NothingToShow)
        );
        assert!(editor.entries().is_empty());
    }

    #[test]
    fn test_undo_redo_through_editor() {
        let mut editor = ItineraryEditor::open(munich(), &[], deps());
        let original = editor.entries().to_vec();
        let target = editor.entries()[0].id.clone();

        editor.delete(&target).unwrap();
        assert!(editor.get(&target).is_none());

        editor.undo().unwrap();
        assert_eq!(editor.entries(), original.as_slice());
        assert_eq!(editor.undo().unwrap_err(), HistoryExhausted::AtOldest);

        editor.redo().unwrap();
        assert!(editor.get(&target).is_none());
        assert_eq!(editor.redo().unwrap_err(), HistoryExhausted::AtNewest);
    }

    #[test]
    fn test_noop_move_is_not_committed() {
        let mut editor = ItineraryEditor::open(munich(), &[], deps());
        let first = editor.entries()[0].clone();
        let mutation = editor.move_entry(&first.id, first.day, first.day, first.order).unwrap();
        assert!(mutation.is_noop());
        assert_eq!(editor.history().depth(), 1);
        assert!(!editor.history().has_edits());
    }

    #[test]
    fn test_failed_operation_changes_nothing() {
        let mut editor = ItineraryEditor::open(munich(), &[], deps());
        let before = editor.entries().to_vec();
        assert_eq!(editor.delete("missing").unwrap_err().kind(), "not-found");
        assert_eq!(editor.entries(), before.as_slice());
        assert_eq!(editor.history().depth(), 1);
    }

    #[test]
    fn test_reload_replaces_pristine_session() {
        let mut editor = ItineraryEditor::open(Plan::with_id("p", "Vienna", 2), &[], deps());
        assert!(editor.entries().is_empty());

        let raw = json!({"hotels": ["Hotel Sacher"]});
        assert_eq!(
            editor.apply_reload(&raw, &[]),
            ReloadOutcome::Applied { entry_count: 1 }
        );
        assert_eq!(day_names(&editor, 1), vec!["Hotel Sacher"]);
        assert_eq!(editor.apply_reload(&raw, &[]), ReloadOutcome::Unchanged);
        assert_eq!(editor.history().depth(), 1);
    }

    #[test]
    fn test_reload_skipped_after_edits() {
        let mut editor = ItineraryEditor::open(munich(), &[], deps());
        let id = editor.entries()[0].id.clone();
        editor.delete(&id).unwrap();
        editor.undo().unwrap();

        let raw = json!({"hotels": ["Somewhere Else"]});
        assert_eq!(
            editor.apply_reload(&raw, &[]),
            ReloadOutcome::Skipped(ReloadSkip::LocalEdits)
        );
        assert_eq!(editor.entries().len(), 5);
    }

    #[test]
    fn test_reload_with_nothing_keeps_view() {
        let mut editor = ItineraryEditor::open(munich(), &[], deps());
        assert_eq!(
            editor.apply_reload(&Value::Null, &[]),
            ReloadOutcome::Skipped(ReloadSkip::NothingToShow)
        );
        assert_eq!(editor.entries().len(), 5);
    }

    #[tokio::test]
    async fn test_events_follow_operations() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let mut editor = ItineraryEditor::open(munich(), &[], EditorDeps::new(bus.clone()));
        let id = editor.entries()[1].id.clone();

        editor.move_entry(&id, 1, 3, 0).unwrap();
        editor.undo().unwrap();
        editor.switch_plan(Plan::with_id("other", "Paris", 1), &[], SeedMode::Open);

        let types: Vec<&str> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|e| e.event_type())
            .collect();
        assert_eq!(
            types,
            vec!["PlanOpened", "EntriesChanged", "HistoryMoved", "PlanClosed", "PlanOpened"]
        );
        assert_eq!(editor.plan_id(), "other");
        assert_eq!(editor.history().depth(), 1);
    }

    #[test]
    fn test_diff_sync_ops() {
        let a = Entry::new("a", EntryKind::Hotel, "A").at(1, 0);
        let b = Entry::new("b", EntryKind::Hotel, "B").at(1, 1);
        let b_moved = b.clone().at(1, 0);

        let ops = diff_sync_ops(&[a.clone(), b.clone()], std::slice::from_ref(&b_moved));
        assert_eq!(
            ops,
            vec![
                SyncOp::Remove {
                    entry_id: "a".to_string()
                },
                SyncOp::Persist(b_moved.clone()),
            ]
        );
        assert!(diff_sync_ops(&[a.clone()], &[a]).is_empty());
    }

    #[test]
    fn test_entries_changed_event_carries_cause() {
        let bus = Arc::new(EventBus::default());
        let mut rx = bus.subscribe();
        let mut editor = ItineraryEditor::open(munich(), &[], EditorDeps::new(bus.clone()));
        let id = editor.entries()[0].id.clone();
        let patch = EntryPatch {
            description: Some("Five-star".to_string()),
            ..Default::default()
        };
        editor.update(&id, &patch).unwrap();

        let _opened = rx.try_recv().unwrap();
        match rx.try_recv().unwrap() {
            EditorEvent::EntriesChanged { cause, entry_id, seq, .. } => {
                assert_eq!(cause.to_string(), "update");
                assert_eq!(entry_id, id);
                assert_eq!(seq, 1);
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
