//! SyncAdapter - fire-and-forget persistence worker
//!
//! Committed mutations are queued on an unbounded channel and applied by a
//! single task, so store writes land in commit order and the editor never
//! waits on the store.

use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use super::error::PersistenceFailure;
use super::traits::ItineraryStore;
use crate::domain::Entry;
use crate::events::EventBus;
use crate::ordering::SyncOp;

/// The persistence work of one committed mutation
#[derive(Debug, Clone)]
pub struct SyncBatch {
    pub plan_id: String,
    pub ops: Vec<SyncOp>,
}

#[derive(Debug)]
enum SyncCommand {
    Apply(SyncBatch),
    Flush { reply: oneshot::Sender<()> },
}

/// Handle to the sync worker
#[derive(Clone)]
pub struct SyncAdapter {
    store: Arc<dyn ItineraryStore>,
    tx: mpsc::UnboundedSender<SyncCommand>,
    active: Arc<watch::Sender<Option<String>>>,
}

impl SyncAdapter {
    /// Spawn the worker on the current tokio runtime
    pub fn spawn(store: Arc<dyn ItineraryStore>, events: Arc<EventBus>) -> Self {
        debug!("SyncAdapter::spawn: called");
        let (tx, rx) = mpsc::unbounded_channel();
        let (active_tx, active_rx) = watch::channel(None);

        tokio::spawn(worker_loop(store.clone(), rx, active_rx, events));
        info!("SyncAdapter spawned");

        Self {
            store,
            tx,
            active: Arc::new(active_tx),
        }
    }

    pub fn store(&self) -> &Arc<dyn ItineraryStore> {
        &self.store
    }

    /// Batches for any other plan are dropped from now on
    pub fn set_active_plan(&self, plan_id: Option<&str>) {
        debug!(?plan_id, "set_active_plan: called");
        self.active.send_replace(plan_id.map(str::to_string));
    }

    pub fn active_plan(&self) -> Option<String> {
        self.active.borrow().clone()
    }

    /// Queue a batch; returns immediately
    pub fn dispatch(&self, plan_id: &str, ops: Vec<SyncOp>) {
        if ops.is_empty() {
            return;
        }
        debug!(%plan_id, ops = ops.len(), "dispatch: called");
        let batch = SyncBatch {
            plan_id: plan_id.to_string(),
            ops,
        };
        if self.tx.send(SyncCommand::Apply(batch)).is_err() {
            warn!(%plan_id, "Sync worker is gone, dropping batch");
        }
    }

    /// Wait until everything queued before this call has been applied
    pub async fn flush(&self) -> Result<(), PersistenceFailure> {
        debug!("flush: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(SyncCommand::Flush { reply: reply_tx })
            .map_err(|_| PersistenceFailure::ChannelError)?;
        reply_rx.await.map_err(|_| PersistenceFailure::ChannelError)
    }

    pub async fn load_entries(&self, plan_id: &str) -> Result<Vec<Entry>, PersistenceFailure> {
        debug!(%plan_id, "load_entries: called");
        self.store.list(plan_id).await
    }

    pub async fn load_raw_plan(&self, plan_id: &str) -> Result<Option<Value>, PersistenceFailure> {
        debug!(%plan_id, "load_raw_plan: called");
        self.store.load_raw_plan(plan_id).await
    }
}

async fn worker_loop(
    store: Arc<dyn ItineraryStore>,
    mut rx: mpsc::UnboundedReceiver<SyncCommand>,
    active: watch::Receiver<Option<String>>,
    events: Arc<EventBus>,
) {
    debug!("worker_loop: called");

    while let Some(cmd) = rx.recv().await {
        match cmd {
            SyncCommand::Apply(batch) => {
                let is_active = active.borrow().as_deref() == Some(batch.plan_id.as_str());
                if !is_active {
                    debug!(plan_id = %batch.plan_id, "worker_loop: plan no longer active, dropping batch");
                    continue;
                }
                apply_batch(store.as_ref(), &batch, &events).await;
            }
            SyncCommand::Flush { reply } => {
                debug!("worker_loop: Flush command");
                let _ = reply.send(());
            }
        }
    }

    info!("Sync worker stopped");
}

async fn apply_batch(store: &dyn ItineraryStore, batch: &SyncBatch, events: &EventBus) {
    debug!(plan_id = %batch.plan_id, ops = batch.ops.len(), "apply_batch: called");
    for op in &batch.ops {
        let (operation, result) = match op {
            SyncOp::Persist(entry) => ("persist", store.upsert(&batch.plan_id, entry).await),
            SyncOp::Remove { entry_id } => ("remove", store.delete(&batch.plan_id, entry_id).await.map(|_| ())),
        };
        if let Err(e) = result {
            warn!(
                plan_id = %batch.plan_id,
                entry_id = op.entry_id(),
                operation,
                error = %e,
                "Persistence failed, keeping local state"
            );
            events
                .emitter_for(batch.plan_id.as_str())
                .persistence_failed(op.entry_id(), operation, &e.to_string());
        }
    }
}
