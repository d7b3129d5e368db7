//! ItineraryStore backed by a planstore directory

use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

use planstore::{PlanStore, PlanSummary};

use super::error::PersistenceFailure;
use super::traits::ItineraryStore;
use crate::domain::{Entry, Plan};

/// Plans and entries on local disk
#[derive(Debug, Clone)]
pub struct FileItineraryStore {
    store: PlanStore,
}

impl FileItineraryStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistenceFailure> {
        debug!(path = %path.as_ref().display(), "FileItineraryStore::open: called");
        let store = PlanStore::open(path).map_err(store_error)?;
        Ok(Self { store })
    }

    pub fn base_path(&self) -> &Path {
        self.store.base_path()
    }

    pub fn list_plans(&self) -> Result<Vec<PlanSummary>, PersistenceFailure> {
        self.store.list_plans().map_err(store_error)
    }

    /// Overwrite the stored entry list of a plan in one write
    pub fn replace_entries(&self, plan_id: &str, entries: &[Entry]) -> Result<(), PersistenceFailure> {
        debug!(%plan_id, count = entries.len(), "replace_entries: called");
        self.store.replace_all(plan_id, entries).map_err(store_error)
    }

    pub fn delete_plan(&self, plan_id: &str) -> Result<(), PersistenceFailure> {
        self.store.delete_plan(plan_id).map_err(store_error)
    }
}

fn store_error(e: eyre::Report) -> PersistenceFailure {
    PersistenceFailure::Store(format!("{:#}", e))
}

#[async_trait]
impl ItineraryStore for FileItineraryStore {
    async fn list(&self, plan_id: &str) -> Result<Vec<Entry>, PersistenceFailure> {
        debug!(%plan_id, "FileItineraryStore::list: called");
        self.store.list(plan_id).map_err(store_error)
    }

    async fn load_plan(&self, plan_id: &str) -> Result<Option<Plan>, PersistenceFailure> {
        debug!(%plan_id, "FileItineraryStore::load_plan: called");
        self.store.load_plan(plan_id).map_err(store_error)
    }

    async fn save_plan(&self, plan: &Plan) -> Result<(), PersistenceFailure> {
        debug!(plan_id = %plan.id, "FileItineraryStore::save_plan: called");
        self.store.save_plan(&plan.id, plan).map_err(store_error)
    }

    async fn upsert(&self, plan_id: &str, entry: &Entry) -> Result<(), PersistenceFailure> {
        debug!(%plan_id, entry_id = %entry.id, "FileItineraryStore::upsert: called");
        self.store.upsert(plan_id, entry).map_err(store_error)
    }

    async fn delete(&self, plan_id: &str, entry_id: &str) -> Result<bool, PersistenceFailure> {
        debug!(%plan_id, %entry_id, "FileItineraryStore::delete: called");
        self.store.delete(plan_id, entry_id).map_err(store_error)
    }

    async fn has_entry_log(&self, plan_id: &str) -> Result<bool, PersistenceFailure> {
        self.store.has_entry_log(plan_id).map_err(store_error)
    }
}
