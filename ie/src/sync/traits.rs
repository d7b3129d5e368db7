//! External collaborator traits

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::error::{GenerationError, PersistenceFailure};
use crate::domain::{Entry, Plan};

/// Where plans and their normalized entries live
///
/// Implementations are called from the sync worker and the reload loop, never
/// from inside an ordering operation.
#[async_trait]
pub trait ItineraryStore: Send + Sync {
    /// Stored entries of a plan, in no particular order
    async fn list(&self, plan_id: &str) -> Result<Vec<Entry>, PersistenceFailure>;

    async fn load_plan(&self, plan_id: &str) -> Result<Option<Plan>, PersistenceFailure>;

    async fn save_plan(&self, plan: &Plan) -> Result<(), PersistenceFailure>;

    /// Write one entry at its current day/order
    async fn upsert(&self, plan_id: &str, entry: &Entry) -> Result<(), PersistenceFailure>;

    /// Remove one entry; `false` when it was not stored
    async fn delete(&self, plan_id: &str, entry_id: &str) -> Result<bool, PersistenceFailure>;

    /// Whether entries were ever written for the plan
    ///
    /// A written log is authoritative even when it is empty now.
    async fn has_entry_log(&self, plan_id: &str) -> Result<bool, PersistenceFailure> {
        Ok(!self.list(plan_id).await?.is_empty())
    }

    /// The raw generated document, if the plan has one
    async fn load_raw_plan(&self, plan_id: &str) -> Result<Option<Value>, PersistenceFailure> {
        debug!(%plan_id, "load_raw_plan: called");
        let plan = self.load_plan(plan_id).await?;
        Ok(plan
            .map(|p| p.raw_generated_document)
            .filter(|doc| !doc.is_null()))
    }
}

/// Parameters for one itinerary generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub destination: String,
    pub duration_days: u32,
    #[serde(default)]
    pub preferences: Vec<String>,
    pub language: String,
}

impl GenerationRequest {
    pub fn for_plan(plan: &Plan) -> Self {
        Self {
            destination: plan.destination.clone(),
            duration_days: plan.days(),
            preferences: plan.preferences.clone(),
            language: plan.language.clone(),
        }
    }
}

/// Produces the raw itinerary document for a trip
#[async_trait]
pub trait GenerationService: Send + Sync {
    async fn request_plan(&self, request: GenerationRequest) -> Result<Value, GenerationError>;
}

/// Ask the service for a document and attach it to `plan`
pub async fn generate_plan(service: &dyn GenerationService, plan: Plan) -> Result<Plan, GenerationError> {
    debug!(plan_id = %plan.id, "generate_plan: called");
    let document = service.request_plan(GenerationRequest::for_plan(&plan)).await?;
    Ok(plan.with_document(document))
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A store call as seen by the mock
    #[derive(Debug, Clone, PartialEq)]
    pub enum StoreCall {
        Upsert { plan_id: String, entry_id: String, day: u32, order: u32 },
        Delete { plan_id: String, entry_id: String },
    }

    /// In-memory store that records writes and can be told to fail them
    #[derive(Default)]
    pub struct MockItineraryStore {
        plans: Mutex<HashMap<String, Plan>>,
        entries: Mutex<HashMap<String, Vec<Entry>>>,
        calls: Mutex<Vec<StoreCall>>,
        fail_writes: Mutex<bool>,
    }

    impl MockItineraryStore {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_plan(self, plan: Plan, entries: Vec<Entry>) -> Self {
            if let Ok(mut map) = self.entries.lock() {
                map.insert(plan.id.clone(), entries);
            }
            if let Ok(mut map) = self.plans.lock() {
                map.insert(plan.id.clone(), plan);
            }
            self
        }

        pub fn set_fail_writes(&self, fail: bool) {
            *self.fail_writes.lock().unwrap() = fail;
        }

        pub fn calls(&self) -> Vec<StoreCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn stored(&self, plan_id: &str) -> Vec<Entry> {
            self.entries.lock().unwrap().get(plan_id).cloned().unwrap_or_default()
        }

        fn check_writable(&self) -> Result<(), PersistenceFailure> {
            if *self.fail_writes.lock().unwrap() {
                return Err(PersistenceFailure::Store("write refused".to_string()));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ItineraryStore for MockItineraryStore {
        async fn list(&self, plan_id: &str) -> Result<Vec<Entry>, PersistenceFailure> {
            Ok(self.stored(plan_id))
        }

        async fn load_plan(&self, plan_id: &str) -> Result<Option<Plan>, PersistenceFailure> {
            Ok(self.plans.lock().unwrap().get(plan_id).cloned())
        }

        async fn save_plan(&self, plan: &Plan) -> Result<(), PersistenceFailure> {
            self.check_writable()?;
            self.plans.lock().unwrap().insert(plan.id.clone(), plan.clone());
            Ok(())
        }

        async fn upsert(&self, plan_id: &str, entry: &Entry) -> Result<(), PersistenceFailure> {
            self.calls.lock().unwrap().push(StoreCall::Upsert {
                plan_id: plan_id.to_string(),
                entry_id: entry.id.clone(),
                day: entry.day,
                order: entry.order,
            });
            self.check_writable()?;
            let mut map = self.entries.lock().unwrap();
            let list = map.entry(plan_id.to_string()).or_default();
            match list.iter_mut().find(|e| e.id == entry.id) {
                Some(existing) => *existing = entry.clone(),
                None => list.push(entry.clone()),
            }
            Ok(())
        }

        async fn delete(&self, plan_id: &str, entry_id: &str) -> Result<bool, PersistenceFailure> {
            self.calls.lock().unwrap().push(StoreCall::Delete {
                plan_id: plan_id.to_string(),
                entry_id: entry_id.to_string(),
            });
            self.check_writable()?;
            let mut map = self.entries.lock().unwrap();
            let list = map.entry(plan_id.to_string()).or_default();
            let before = list.len();
            list.retain(|e| e.id != entry_id);
            Ok(list.len() != before)
        }
    }

    /// Generation service that replays canned documents
    pub struct MockGenerationService {
        documents: Vec<Value>,
        call_count: AtomicUsize,
    }

    impl MockGenerationService {
        pub fn new(documents: Vec<Value>) -> Self {
            Self {
                documents,
                call_count: AtomicUsize::new(0),
            }
        }

        pub fn call_count(&self) -> usize {
            self.call_count.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl GenerationService for MockGenerationService {
        async fn request_plan(&self, request: GenerationRequest) -> Result<Value, GenerationError> {
            debug!(destination = %request.destination, "MockGenerationService::request_plan: called");
            let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
            self.documents
                .get(idx)
                .cloned()
                .ok_or_else(|| GenerationError::Unavailable("no more mock documents".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::*;
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_generate_plan_attaches_document() {
        let service = MockGenerationService::new(vec![json!({"hotels": ["Hotel Adlon"]})]);
        let plan = Plan::with_id("berlin", "Berlin", 2);

        let plan = generate_plan(&service, plan).await.unwrap();
        assert_eq!(plan.raw_generated_document["hotels"][0], "Hotel Adlon");
        assert_eq!(service.call_count(), 1);

        let err = generate_plan(&service, Plan::with_id("b2", "Berlin", 2)).await.unwrap_err();
        assert!(matches!(err, GenerationError::Unavailable(_)));
    }

    #[test]
    fn test_generation_request_from_plan() {
        let mut plan = Plan::with_id("p", "Kyoto", 0);
        plan.preferences = vec!["temples".to_string()];
        let request = GenerationRequest::for_plan(&plan);
        assert_eq!(request.duration_days, 1);
        assert_eq!(request.preferences, vec!["temples"]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["durationDays"], 1);
    }

    #[tokio::test]
    async fn test_load_raw_plan_skips_null_document() {
        let store = MockItineraryStore::new().with_plan(Plan::with_id("p", "Oslo", 2), Vec::new());
        assert!(store.load_raw_plan("p").await.unwrap().is_none());
        assert!(store.load_raw_plan("missing").await.unwrap().is_none());

        let with_doc = Plan::with_id("q", "Oslo", 2).with_document(json!({"hotels": []}));
        let store = MockItineraryStore::new().with_plan(with_doc, Vec::new());
        assert!(store.load_raw_plan("q").await.unwrap().is_some());
    }
}
