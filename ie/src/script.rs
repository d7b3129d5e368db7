//! Batch edit scripts
//!
//! A YAML list of operations applied in order to one plan:
//!
//! ```yaml
//! ops:
//!   - add: { day: 2, at: 0, entry: { kind: restaurant, name: Tantris } }
//!   - move: { id: hotel-d1-0-bayerischer-hof, from-day: 1, to-day: 2, to-order: 0 }
//!   - update: { id: attraction-d1-1-marienplatz, patch: { description: Old town square } }
//!   - delete: { id: attraction-d2-0-deutsches-museum }
//!   - undo
//!   - redo
//! ```

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::domain::{EntryDraft, EntryPatch};
use crate::ordering::ReorderGesture;
use crate::session::{SessionError, SessionManager};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EditOp {
    Add {
        day: u32,
        #[serde(default)]
        at: Option<u32>,
        entry: EntryDraft,
    },
    #[serde(rename_all = "kebab-case")]
    Move {
        id: String,
        from_day: u32,
        to_day: u32,
        to_order: u32,
    },
    Gesture(ReorderGesture),
    Delete {
        id: String,
    },
    Update {
        id: String,
        patch: EntryPatch,
    },
    Undo,
    Redo,
}

impl EditOp {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Add { .. } => "add",
            Self::Move { .. } => "move",
            Self::Gesture(_) => "gesture",
            Self::Delete { .. } => "delete",
            Self::Update { .. } => "update",
            Self::Undo => "undo",
            Self::Redo => "redo",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditScript {
    #[serde(default)]
    pub ops: Vec<EditOp>,
}

/// What happened to one scripted operation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepReport {
    pub index: usize,
    pub op: &'static str,
    pub applied: bool,
    /// Entry id touched, or the rejection kind
    pub detail: String,
}

impl EditScript {
    pub fn from_yaml(text: &str) -> Result<Self> {
        serde_yaml::from_str(text).context("Failed to parse edit script")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).context(format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&text)
    }

    /// Run every op against the open plan
    ///
    /// Rejected ops are reported and skipped; only a dead or empty session
    /// stops the run.
    pub async fn run(&self, session: &SessionManager) -> Result<Vec<StepReport>, SessionError> {
        debug!(ops = self.ops.len(), "EditScript::run: called");
        let mut reports = Vec::with_capacity(self.ops.len());

        for (index, op) in self.ops.iter().enumerate() {
            let result = match op.clone() {
                EditOp::Add { day, at, entry } => session.add(entry, day, at).await.map(|e| e.id),
                EditOp::Move {
                    id,
                    from_day,
                    to_day,
                    to_order,
                } => session
                    .move_entry(&id, from_day, to_day, to_order)
                    .await
                    .map(|m| m.entry_id),
                EditOp::Gesture(gesture) => session.apply_gesture(gesture).await.map(|m| m.entry_id),
                EditOp::Delete { id } => session.delete(&id).await.map(|m| m.entry_id),
                EditOp::Update { id, patch } => session.update(&id, patch).await.map(|m| m.entry_id),
                EditOp::Undo => session.undo().await.map(|seq| format!("seq {}", seq)),
                EditOp::Redo => session.redo().await.map(|seq| format!("seq {}", seq)),
            };

            let report = match result {
                Ok(detail) => StepReport {
                    index,
                    op: op.label(),
                    applied: true,
                    detail,
                },
                Err(SessionError::Invalid(e)) => StepReport {
                    index,
                    op: op.label(),
                    applied: false,
                    detail: e.kind().to_string(),
                },
                Err(SessionError::History(e)) => StepReport {
                    index,
                    op: op.label(),
                    applied: false,
                    detail: e.kind().to_string(),
                },
                Err(e) => return Err(e),
            };
            debug!(index, op = report.op, applied = report.applied, "EditScript::run: step done");
            reports.push(report);
        }

        Ok(reports)
    }
}
