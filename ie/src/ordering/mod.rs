//! Ordering engine
//!
//! Applies user mutations (insert, move, delete, update) to the entry list
//! while keeping every day's order run contiguous from zero. Each successful
//! call returns a [`Mutation`] describing the persistence work it implies.

mod engine;
mod error;

pub use engine::{Mutation, MutationKind, OrderingEngine, ReorderGesture, SyncOp, check_invariants};
pub use error::{InvalidOperation, InvariantViolation};
