//! OrderingEngine - per-day ordered entry list

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::debug;

use super::error::{InvalidOperation, InvariantViolation};
use crate::domain::{Entry, EntryPatch};
use crate::normalizer::canonicalize;

/// Which user operation produced a mutation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Insert,
    Move,
    Delete,
    Update,
}

impl std::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Insert => write!(f, "insert"),
            Self::Move => write!(f, "move"),
            Self::Delete => write!(f, "delete"),
            Self::Update => write!(f, "update"),
        }
    }
}

/// One persistence call implied by a committed mutation
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOp {
    /// Write the entry at its current day/order
    Persist(Entry),
    /// Remove the entry from the store
    Remove { entry_id: String },
}

impl SyncOp {
    pub fn entry_id(&self) -> &str {
        match self {
            Self::Persist(entry) => &entry.id,
            Self::Remove { entry_id } => entry_id,
        }
    }
}

/// Result of a successful ordering operation
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub kind: MutationKind,
    pub entry_id: String,
    /// Persist/remove calls, empty when the operation changed nothing
    pub sync: Vec<SyncOp>,
}

impl Mutation {
    /// True when the list is unchanged (e.g. moving an entry onto itself)
    pub fn is_noop(&self) -> bool {
        self.sync.is_empty()
    }
}

/// A drag-completion gesture from the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderGesture {
    pub entry_id: String,
    pub from_day: u32,
    pub from_order: u32,
    pub to_day: u32,
    pub to_order: u32,
}

/// Entry list kept sorted by `(day, order)` with contiguous order runs
#[derive(Debug, Clone, PartialEq)]
pub struct OrderingEngine {
    entries: Vec<Entry>,
    duration_days: u32,
}

impl OrderingEngine {
    /// Create an engine; the list is brought to canonical form first
    pub fn new(entries: Vec<Entry>, duration_days: u32) -> Self {
        let duration_days = duration_days.max(1);
        debug!(count = entries.len(), duration_days, "OrderingEngine::new: called");
        Self {
            entries: canonicalize(entries, duration_days),
            duration_days,
        }
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn duration_days(&self) -> u32 {
        self.duration_days
    }

    pub fn get(&self, entry_id: &str) -> Option<&Entry> {
        self.entries.iter().find(|e| e.id == entry_id)
    }

    /// Entries of one day in order
    pub fn day(&self, day: u32) -> impl Iterator<Item = &Entry> {
        self.entries.iter().filter(move |e| e.day == day)
    }

    /// Number of entries on a day
    pub fn count(&self, day: u32) -> u32 {
        self.day(day).count() as u32
    }

    /// Swap in a list taken from history; it is already canonical
    pub fn restore(&mut self, entries: Vec<Entry>) {
        debug!(count = entries.len(), "OrderingEngine::restore: called");
        self.entries = entries;
        self.settle();
    }

    /// Insert an entry into `day`, appending when `at_order` is omitted
    ///
    /// An `at_order` past the end of the day appends.
    pub fn insert(&mut self, mut entry: Entry, day: u32, at_order: Option<u32>) -> Result<Mutation, InvalidOperation> {
        debug!(entry_id = %entry.id, day, ?at_order, "insert: called");
        self.check_day(day)?;
        if entry.name.trim().is_empty() {
            return Err(InvalidOperation::EmptyName);
        }
        if entry.id.is_empty() || self.index_of(&entry.id).is_some() {
            return Err(InvalidOperation::DuplicateId { entry_id: entry.id });
        }

        let before = self.positions();
        let count = self.count(day);
        let at = at_order.map_or(count, |o| o.min(count));

        for e in self.entries.iter_mut().filter(|e| e.day == day && e.order >= at) {
            e.order += 1;
        }
        entry.day = day;
        entry.order = at;
        let entry_id = entry.id.clone();
        self.entries.push(entry);
        self.settle();

        Ok(Mutation {
            kind: MutationKind::Insert,
            entry_id,
            sync: self.changed_since(&before),
        })
    }

    /// Move an entry out of `from_day` into `to_day` at `to_order`
    ///
    /// `from_day` must be the entry's current day; a stale gesture is `NotFound`.
    pub fn move_entry(
        &mut self,
        entry_id: &str,
        from_day: u32,
        to_day: u32,
        to_order: u32,
    ) -> Result<Mutation, InvalidOperation> {
        debug!(%entry_id, from_day, to_day, to_order, "move_entry: called");
        self.check_day(from_day)?;
        self.check_day(to_day)?;
        let idx = self
            .index_of(entry_id)
            .filter(|&idx| self.entries[idx].day == from_day)
            .ok_or_else(|| not_found(entry_id))?;

        let before = self.positions();
        let mut entry = self.entries.remove(idx);
        self.close_gap(entry.day, entry.order);

        let count = self.count(to_day);
        let at = to_order.min(count);
        for e in self.entries.iter_mut().filter(|e| e.day == to_day && e.order >= at) {
            e.order += 1;
        }
        entry.day = to_day;
        entry.order = at;
        self.entries.push(entry);
        self.settle();

        Ok(Mutation {
            kind: MutationKind::Move,
            entry_id: entry_id.to_string(),
            sync: self.changed_since(&before),
        })
    }

    /// Remove an entry and close the gap in its day
    pub fn delete(&mut self, entry_id: &str) -> Result<Mutation, InvalidOperation> {
        debug!(%entry_id, "delete: called");
        let idx = self.index_of(entry_id).ok_or_else(|| not_found(entry_id))?;

        let before = self.positions();
        let entry = self.entries.remove(idx);
        self.close_gap(entry.day, entry.order);
        self.settle();

        let mut sync = vec![SyncOp::Remove {
            entry_id: entry.id.clone(),
        }];
        sync.extend(self.changed_since(&before));
        Ok(Mutation {
            kind: MutationKind::Delete,
            entry_id: entry.id,
            sync,
        })
    }

    /// Change display fields; position is never touched
    pub fn update(&mut self, entry_id: &str, patch: &EntryPatch) -> Result<Mutation, InvalidOperation> {
        debug!(%entry_id, "update: called");
        let idx = self.index_of(entry_id).ok_or_else(|| not_found(entry_id))?;

        let entry = &mut self.entries[idx];
        let sync = if patch.apply(entry) {
            vec![SyncOp::Persist(entry.clone())]
        } else {
            debug!(%entry_id, "update: patch changed nothing");
            Vec::new()
        };
        Ok(Mutation {
            kind: MutationKind::Update,
            entry_id: entry_id.to_string(),
            sync,
        })
    }

    /// Apply a drag-completion gesture as a move
    pub fn apply_gesture(&mut self, gesture: &ReorderGesture) -> Result<Mutation, InvalidOperation> {
        debug!(?gesture, "apply_gesture: called");
        if let Some(entry) = self.get(&gesture.entry_id)
            && entry.order != gesture.from_order
        {
            debug!(
                entry_id = %gesture.entry_id,
                actual = entry.order,
                reported = gesture.from_order,
                "apply_gesture: from_order is stale, trusting entry id"
            );
        }
        self.move_entry(&gesture.entry_id, gesture.from_day, gesture.to_day, gesture.to_order)
    }

    fn check_day(&self, day: u32) -> Result<(), InvalidOperation> {
        if (1..=self.duration_days).contains(&day) {
            Ok(())
        } else {
            Err(InvalidOperation::OutOfRange {
                day,
                duration_days: self.duration_days,
            })
        }
    }

    fn index_of(&self, entry_id: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.id == entry_id)
    }

    fn close_gap(&mut self, day: u32, order: u32) {
        for e in self.entries.iter_mut().filter(|e| e.day == day && e.order > order) {
            e.order -= 1;
        }
    }

    fn positions(&self) -> HashMap<String, (u32, u32)> {
        self.entries.iter().map(|e| (e.id.clone(), e.position())).collect()
    }

    /// Entries that are new or sit at a different position than before
    fn changed_since(&self, before: &HashMap<String, (u32, u32)>) -> Vec<SyncOp> {
        self.entries
            .iter()
            .filter(|e| before.get(&e.id) != Some(&e.position()))
            .cloned()
            .map(SyncOp::Persist)
            .collect()
    }

    /// Sort by position and renumber every day from zero
    fn settle(&mut self) {
        self.entries.sort_by_key(Entry::position);
        let mut current_day = None;
        let mut next = 0;
        for entry in &mut self.entries {
            if current_day != Some(entry.day) {
                current_day = Some(entry.day);
                next = 0;
            }
            entry.order = next;
            next += 1;
        }
    }
}

fn not_found(entry_id: &str) -> InvalidOperation {
    InvalidOperation::NotFound {
        entry_id: entry_id.to_string(),
    }
}

/// Verify day range, contiguous order runs, unique ids and non-empty names
pub fn check_invariants(entries: &[Entry], duration_days: u32) -> Result<(), InvariantViolation> {
    let mut ids = HashSet::new();
    let mut orders: BTreeMap<u32, Vec<u32>> = BTreeMap::new();

    for entry in entries {
        if !ids.insert(entry.id.as_str()) {
            return Err(InvariantViolation::DuplicateId(entry.id.clone()));
        }
        if entry.name.trim().is_empty() {
            return Err(InvariantViolation::EmptyName(entry.id.clone()));
        }
        if !(1..=duration_days).contains(&entry.day) {
            return Err(InvariantViolation::DayOutOfRange {
                entry_id: entry.id.clone(),
                day: entry.day,
                duration_days,
            });
        }
        orders.entry(entry.day).or_default().push(entry.order);
    }

    for (day, mut run) in orders {
        run.sort_unstable();
        if run.iter().enumerate().any(|(idx, order)| *order != idx as u32) {
            return Err(InvariantViolation::NonContiguousOrder {
                day,
                count: run.len(),
                orders: run,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::EntryKind;
    use proptest::prelude::*;

    fn entry(id: &str, day: u32, order: u32) -> Entry {
        Entry::new(id, EntryKind::Attraction, id.to_uppercase()).at(day, order)
    }

    fn day_ids(engine: &OrderingEngine, day: u32) -> Vec<&str> {
        engine.day(day).map(|e| e.id.as_str()).collect()
    }

    fn three_day_engine() -> OrderingEngine {
        OrderingEngine::new(
            vec![
                entry("a", 1, 0),
                entry("b", 1, 1),
                entry("c", 2, 0),
                entry("d", 2, 1),
                entry("e", 2, 2),
            ],
            3,
        )
    }

    #[test]
    fn test_insert_shifts_following_entries() {
        let mut engine = three_day_engine();

        let mutation = engine.insert(entry("new", 1, 0), 2, Some(1)).unwrap();

        assert_eq!(day_ids(&engine, 2), vec!["c", "new", "d", "e"]);
        let orders: Vec<u32> = engine.day(2).map(|e| e.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
        assert_eq!(engine.get("d").unwrap().order, 2);

        let persisted: Vec<&str> = mutation.sync.iter().map(SyncOp::entry_id).collect();
        assert_eq!(persisted, vec!["new", "d", "e"]);
    }

    #[test]
    fn test_insert_appends_by_default_and_clamps() {
        let mut engine = three_day_engine();

        engine.insert(entry("x", 1, 0), 1, None).unwrap();
        engine.insert(entry("y", 1, 0), 3, Some(99)).unwrap();

        assert_eq!(day_ids(&engine, 1), vec!["a", "b", "x"]);
        assert_eq!(engine.get("y").unwrap().position(), (3, 0));
    }

    #[test]
    fn test_insert_rejections_leave_state_untouched() {
        let mut engine = three_day_engine();
        let before = engine.clone();

        assert_eq!(
            engine.insert(entry("z", 1, 0), 4, None).unwrap_err().kind(),
            "out-of-range"
        );
        assert_eq!(engine.insert(entry("a", 1, 0), 1, None).unwrap_err().kind(), "duplicate-id");
        let blank = Entry::new("blank", EntryKind::Activity, "  ");
        assert_eq!(engine.insert(blank, 1, None).unwrap_err(), InvalidOperation::EmptyName);

        assert_eq!(engine, before);
    }

    #[test]
    fn test_delete_closes_gap() {
        let mut engine = OrderingEngine::new(vec![entry("a", 1, 0), entry("b", 1, 1)], 1);

        let mutation = engine.delete("a").unwrap();

        assert_eq!(engine.get("b").unwrap().order, 0);
        assert_eq!(
            mutation.sync,
            vec![
                SyncOp::Remove {
                    entry_id: "a".to_string()
                },
                SyncOp::Persist(engine.get("b").unwrap().clone()),
            ]
        );
        assert_eq!(engine.delete("a").unwrap_err().kind(), "not-found");
    }

    #[test]
    fn test_same_day_move_is_reindex() {
        let mut engine = three_day_engine();

        engine.move_entry("e", 2, 2, 0).unwrap();
        assert_eq!(day_ids(&engine, 2), vec!["e", "c", "d"]);

        engine.move_entry("e", 2, 2, 2).unwrap();
        assert_eq!(day_ids(&engine, 2), vec!["c", "d", "e"]);
    }

    #[test]
    fn test_cross_day_move_updates_day() {
        let mut engine = three_day_engine();

        let mutation = engine.move_entry("a", 1, 2, 1).unwrap();

        assert_eq!(day_ids(&engine, 1), vec!["b"]);
        assert_eq!(day_ids(&engine, 2), vec!["c", "a", "d", "e"]);
        assert_eq!(engine.get("a").unwrap().day, 2);
        assert!(check_invariants(engine.entries(), 3).is_ok());
        assert!(mutation.sync.iter().any(|op| op.entry_id() == "b"));
    }

    #[test]
    fn test_move_onto_itself_is_noop() {
        let mut engine = three_day_engine();
        let mutation = engine.move_entry("d", 2, 2, 1).unwrap();
        assert!(mutation.is_noop());
    }

    #[test]
    fn test_move_rejections() {
        let mut engine = three_day_engine();
        let before = engine.clone();

        assert_eq!(engine.move_entry("zzz", 1, 2, 0).unwrap_err().kind(), "not-found");
        assert_eq!(engine.move_entry("a", 2, 2, 0).unwrap_err().kind(), "not-found");
        assert_eq!(engine.move_entry("a", 1, 0, 0).unwrap_err().kind(), "out-of-range");
        assert_eq!(engine.move_entry("a", 1, 4, 0).unwrap_err().kind(), "out-of-range");

        assert_eq!(engine, before);
    }

    #[test]
    fn test_update_keeps_position() {
        let mut engine = three_day_engine();
        let patch = EntryPatch {
            name: Some("Renamed".to_string()),
            ..Default::default()
        };

        let mutation = engine.update("d", &patch).unwrap();
        let d = engine.get("d").unwrap();
        assert_eq!(d.name, "Renamed");
        assert_eq!(d.position(), (2, 1));
        assert_eq!(mutation.sync.len(), 1);

        assert!(engine.update("d", &patch).unwrap().is_noop());
        assert_eq!(engine.update("nope", &patch).unwrap_err().kind(), "not-found");
    }

    #[test]
    fn test_apply_gesture() {
        let mut engine = three_day_engine();
        let gesture = ReorderGesture {
            entry_id: "c".to_string(),
            from_day: 2,
            from_order: 0,
            to_day: 3,
            to_order: 0,
        };

        engine.apply_gesture(&gesture).unwrap();
        assert_eq!(day_ids(&engine, 3), vec!["c"]);
        assert_eq!(day_ids(&engine, 2), vec!["d", "e"]);
    }

    #[test]
    fn test_check_invariants_detects_problems() {
        assert!(check_invariants(&[entry("a", 1, 0), entry("b", 1, 2)], 2).is_err());
        assert!(check_invariants(&[entry("a", 3, 0)], 2).is_err());
        assert!(check_invariants(&[entry("a", 1, 0), entry("a", 2, 0)], 2).is_err());
        assert!(check_invariants(&[entry("a", 1, 1), entry("b", 1, 0)], 2).is_ok());
    }

    #[derive(Debug, Clone)]
    enum Op {
        Insert { day: u32, at: Option<u32> },
        Move { pick: usize, to_day: u32, to_order: u32 },
        Delete { pick: usize },
    }

    fn arb_op() -> impl Strategy<Value = Op> {
        prop_oneof![
            (0u32..6, proptest::option::of(0u32..8)).prop_map(|(day, at)| Op::Insert { day, at }),
            (any::<usize>(), 0u32..6, 0u32..8).prop_map(|(pick, to_day, to_order)| Op::Move {
                pick,
                to_day,
                to_order
            }),
            any::<usize>().prop_map(|pick| Op::Delete { pick }),
        ]
    }

    proptest! {
        #[test]
        fn prop_operations_preserve_ordering_invariant(ops in proptest::collection::vec(arb_op(), 0..40)) {
            let days = 4;
            let mut engine = OrderingEngine::new(Vec::new(), days);
            let mut next_id = 0;

            for op in ops {
                let before = engine.clone();
                let result = match op {
                    Op::Insert { day, at } => {
                        next_id += 1;
                        engine.insert(entry(&format!("e{}", next_id), 1, 0), day, at)
                    }
                    Op::Move { pick, to_day, to_order } => {
                        if engine.entries().is_empty() {
                            continue;
                        }
                        let target = engine.entries()[pick % engine.entries().len()].clone();
                        engine.move_entry(&target.id, target.day, to_day, to_order)
                    }
                    Op::Delete { pick } => {
                        if engine.entries().is_empty() {
                            continue;
                        }
                        let id = engine.entries()[pick % engine.entries().len()].id.clone();
                        engine.delete(&id)
                    }
                };
                if result.is_err() {
                    prop_assert_eq!(&engine, &before);
                }
                prop_assert!(check_invariants(engine.entries(), days).is_ok());
            }
        }
    }
}
