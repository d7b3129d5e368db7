//! Plan normalizer
//!
//! Turns an agent-generated plan document of unknown shape into the canonical,
//! day-bucketed entry list the editor works on.
//!
//! # Extraction
//!
//! ```text
//! raw document ──► probe() ──► [Catalog(hotels), Catalog(attractions), DayItinerary, ...]
//!                                   │
//!                                   ▼
//!                 extract every probe (merge, never short-circuit)
//!                                   │
//!                 remap days ─► de-duplicate ─► stable sort (day, order)
//!                                   │
//!                 renumber each day 0..n ─► assign ids ─► Vec<Entry>
//! ```
//!
//! A document nothing matches produces an empty list. That is a valid
//! "nothing to show yet" state, not an error.

use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, info};

mod fields;
mod probe;

pub use fields::{ItemFields, read_item};
pub use probe::{CategoryList, DayBucket, RawPlanShapeProbe, Scope, parse_day_key, probe};

use crate::domain::{Entry, EntryKind, derived_id};

/// Order offset for category arrays nested under an itinerary day
pub const NESTED_ORDER_OFFSET: u32 = 100;

/// Where a normalized list came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedSource {
    /// Extracted from the raw generated document
    Document,
    /// Taken from the already-normalized stored items
    Stored,
    /// Nothing to show yet
    Empty,
}

impl std::fmt::Display for SeedSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Document => write!(f, "document"),
            Self::Stored => write!(f, "stored"),
            Self::Empty => write!(f, "empty"),
        }
    }
}

/// A normalized entry list plus where it came from
#[derive(Debug, Clone, PartialEq)]
pub struct Normalized {
    pub entries: Vec<Entry>,
    pub source: SeedSource,
}

/// Map any source day into `1..=duration_days`
///
/// Days past the end wrap around: with 3 days, day 4 becomes day 1.
pub fn remap_day(source_day: u32, duration_days: u32) -> u32 {
    let days = duration_days.max(1);
    let day = source_day.max(1);
    ((day - 1) % days) + 1
}

/// Normalize a raw generated document
pub fn normalize(raw: &Value, duration_days: u32) -> Vec<Entry> {
    let duration_days = duration_days.max(1);
    debug!(duration_days, "normalize: called");

    // Agents sometimes hand back the plan as JSON text
    let parsed;
    let document = match raw {
        Value::String(text) => match serde_json::from_str::<Value>(text) {
            Ok(value) => {
                parsed = value;
                &parsed
            }
            Err(e) => {
                debug!(error = %e, "normalize: string document is not JSON");
                return Vec::new();
            }
        },
        other => other,
    };

    let mut extracted = Vec::new();
    for shape in probe(document) {
        extract(&shape, &mut extracted);
    }

    let entries = finish(extracted, duration_days);
    info!(count = entries.len(), duration_days, "Normalized generated plan");
    entries
}

/// Normalize, falling back to stored items when the document yields nothing
pub fn normalize_with_fallback(raw: &Value, duration_days: u32, stored: &[Entry]) -> Normalized {
    let entries = normalize(raw, duration_days);
    if !entries.is_empty() {
        return Normalized {
            entries,
            source: SeedSource::Document,
        };
    }
    if !stored.is_empty() {
        debug!(stored = stored.len(), "normalize_with_fallback: using stored items");
        return Normalized {
            entries: canonicalize(stored.to_vec(), duration_days),
            source: SeedSource::Stored,
        };
    }
    debug!("normalize_with_fallback: nothing to show yet");
    Normalized {
        entries: Vec::new(),
        source: SeedSource::Empty,
    }
}

/// Bring an already-normalized list back to canonical form
///
/// Remaps days into range, sorts by `(day, order)`, renumbers each day from
/// zero and repairs duplicate or empty ids. Stored lists are trusted for
/// content but not for invariants.
pub fn canonicalize(mut entries: Vec<Entry>, duration_days: u32) -> Vec<Entry> {
    let duration_days = duration_days.max(1);
    for entry in &mut entries {
        entry.day = remap_day(entry.day, duration_days);
    }
    entries.sort_by_key(Entry::position);
    renumber(&mut entries);

    let mut used = HashSet::new();
    for entry in &mut entries {
        if entry.id.is_empty() || !used.insert(entry.id.clone()) {
            entry.id = unique_derived_id(entry, &used);
            used.insert(entry.id.clone());
        }
    }
    entries
}

/// Extracted entry still carrying its source id
struct Extracted {
    entry: Entry,
    source_id: Option<String>,
}

fn extract(shape: &RawPlanShapeProbe<'_>, out: &mut Vec<Extracted>) {
    match shape {
        RawPlanShapeProbe::Catalog(list) => {
            for (index, item) in list.items.iter().enumerate() {
                let Some(mut fields) = read_item(item) else {
                    continue;
                };
                let index = index as u32;
                let (default_day, default_order) = catalog_position(list.kind, index);
                let day = fields.day.unwrap_or(default_day);
                let order = fields.order.unwrap_or(default_order);
                let source_id = fields.id.take();
                out.push(Extracted {
                    entry: fields.into_entry(list.kind, day, order),
                    source_id,
                });
            }
        }
        RawPlanShapeProbe::DayItinerary(buckets) => {
            for bucket in buckets {
                for (index, item) in bucket.activities.iter().enumerate() {
                    let Some(mut fields) = read_item(item) else {
                        continue;
                    };
                    let kind = fields.kind.unwrap_or(EntryKind::Activity);
                    let day = fields.day.unwrap_or(bucket.day);
                    let order = fields.order.unwrap_or(index as u32);
                    let source_id = fields.id.take();
                    out.push(Extracted {
                        entry: fields.into_entry(kind, day, order),
                        source_id,
                    });
                }

                let mut offset = NESTED_ORDER_OFFSET;
                for (kind, items) in &bucket.nested {
                    for item in items.iter() {
                        let Some(mut fields) = read_item(item) else {
                            continue;
                        };
                        let source_id = fields.id.take();
                        out.push(Extracted {
                            entry: fields.into_entry(*kind, bucket.day, offset),
                            source_id,
                        });
                        offset += 1;
                    }
                }
            }
        }
    }
}

/// Heuristic spacing for flat category lists
///
/// Hotels all land on day 1; attractions fill three per day and restaurants
/// two per day. This is display spacing, not scheduling.
fn catalog_position(kind: EntryKind, index: u32) -> (u32, u32) {
    match kind {
        EntryKind::Hotel => (1, index),
        EntryKind::Attraction => (index / 3 + 1, index % 3),
        EntryKind::Restaurant => (index / 2 + 1, index % 2),
        EntryKind::Activity => (1, index),
    }
}

fn finish(extracted: Vec<Extracted>, duration_days: u32) -> Vec<Entry> {
    let mut seen = HashSet::new();
    let mut kept: Vec<Extracted> = Vec::with_capacity(extracted.len());

    for mut item in extracted {
        item.entry.day = remap_day(item.entry.day, duration_days);
        let key = (item.entry.kind, item.entry.name.trim().to_lowercase(), item.entry.day);
        if seen.insert(key) {
            kept.push(item);
        } else {
            debug!(name = %item.entry.name, day = item.entry.day, "finish: dropping duplicate");
        }
    }

    // Stable: ties keep extraction order
    kept.sort_by_key(|item| item.entry.position());

    let mut entries: Vec<Entry> = Vec::with_capacity(kept.len());
    let mut source_ids = Vec::with_capacity(kept.len());
    for item in kept {
        source_ids.push(item.source_id);
        entries.push(item.entry);
    }
    renumber(&mut entries);

    let mut used = HashSet::new();
    for (entry, source_id) in entries.iter_mut().zip(source_ids) {
        entry.id = match source_id {
            Some(id) if !used.contains(&id) => id,
            _ => unique_derived_id(entry, &used),
        };
        used.insert(entry.id.clone());
    }
    entries
}

/// Renumber each day's run to `0..count`; input must be sorted by position
fn renumber(entries: &mut [Entry]) {
    let mut current_day = None;
    let mut next = 0;
    for entry in entries.iter_mut() {
        if current_day != Some(entry.day) {
            current_day = Some(entry.day);
            next = 0;
        }
        entry.order = next;
        next += 1;
    }
}

fn unique_derived_id(entry: &Entry, used: &HashSet<String>) -> String {
    let base = derived_id(entry.kind, entry.day, entry.order, &entry.name);
    if !used.contains(&base) {
        return base;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}-{}", base, n);
        if !used.contains(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
