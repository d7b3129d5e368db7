//! Domain types for the itinerary engine
//!
//! Core domain types: Entry, Plan, and the id allocator that keeps entry ids
//! unique for the lifetime of an editing session.

mod entry;
mod id;
mod plan;

pub use entry::{Coordinates, Entry, EntryDraft, EntryKind, EntryPatch};
pub use id::{IdAllocator, derived_id, slugify};
pub use plan::{BudgetTier, Plan};
