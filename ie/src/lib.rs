//! Itinerary - reconcile and edit agent-generated trip plans
//!
//! A generation service hands back a trip document whose shape is never
//! guaranteed. This crate turns that document into a flat list of entries
//! with stable ids and dense per-day ordering, lets a user edit the list with
//! undo/redo, and mirrors every edit to a store in the background.
//!
//! # Core Concepts
//!
//! - **Normalize once**: Any document shape becomes `Vec<Entry>` with `day` in
//!   `1..=duration` and orders `0..n` per day
//! - **Local first**: Edits apply to the in-memory list immediately; writes
//!   are queued and never block the editor
//! - **Snapshots**: Undo/redo restores whole entry lists
//!
//! # Modules
//!
//! - [`domain`] - Plan, entry and id types
//! - [`normalizer`] - Raw document to canonical entries
//! - [`ordering`] - Insert, move, delete and update with invariant checks
//! - [`history`] - Bounded undo/redo snapshots
//! - [`sync`] - Store and generation traits, background writer
//! - [`session`] - Editor state and the session actor
//! - [`events`] - Editor event bus
//! - [`feasibility`] - Constraint-solver request and service boundary
//! - [`script`] - YAML edit scripts
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod domain;
pub mod events;
pub mod feasibility;
pub mod history;
pub mod normalizer;
pub mod ordering;
pub mod script;
pub mod session;
pub mod sync;

pub use domain::{Entry, EntryDraft, EntryKind, EntryPatch, Plan};
pub use ordering::{InvalidOperation, OrderingEngine};
pub use session::{ItineraryEditor, SessionManager};
