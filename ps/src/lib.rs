//! PlanStore - file-backed storage for trip plans and their itinerary entries
//!
//! Each plan lives in its own directory. The plan document is a single JSON
//! file; entries are stored one JSON object per line so they stay diffable.
//!
//! # Architecture
//!
//! ```text
//! plans/
//! └── {plan_id}/
//!     ├── plan.json        # plan metadata + raw generated document
//!     ├── entries.jsonl    # one record per line
//!     └── .lock            # exclusive lock held during writes
//! ```
//!
//! # Example
//!
//! ```ignore
//! use planstore::PlanStore;
//!
//! let store = PlanStore::open("plans")?;
//! store.save_plan("munich-3d", &plan)?;
//! store.upsert("munich-3d", &entry)?;
//! let entries: Vec<MyEntry> = store.list("munich-3d")?;
//! ```

mod store;

pub use store::{PlanId, PlanStore, PlanSummary, Record, now_ms};

/// File name of the plan document inside a plan directory
pub const PLAN_FILE: &str = "plan.json";

/// File name of the entry log inside a plan directory
pub const ENTRIES_FILE: &str = "entries.jsonl";
