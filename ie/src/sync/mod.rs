//! Sync Adapter boundary
//!
//! The editor never talks to storage directly. Loads go through
//! [`SyncAdapter::load_entries`] / [`SyncAdapter::load_raw_plan`]; writes are
//! queued with [`SyncAdapter::dispatch`] after the local state has committed.

mod adapter;
mod error;
mod file_store;
mod traits;

pub use adapter::{SyncAdapter, SyncBatch};
pub use error::{GenerationError, PersistenceFailure};
pub use file_store::FileItineraryStore;
#[cfg(test)]
pub use traits::mock;
pub use traits::{GenerationRequest, GenerationService, ItineraryStore, generate_plan};
