//! Entry id generation
//!
//! Locally created entries get ids of the form `{8-char-hex}-{kind}-{slug}`,
//! e.g. `9f3ac2d1-restaurant-cafe-luitpold`. Normalized entries without a
//! source id get a deterministic `{kind}-d{day}-{order}-{slug}` id instead.

use std::collections::HashSet;
use tracing::debug;

use super::EntryKind;

const MAX_SLUG_LEN: usize = 40;

/// Slugify a title for use in ids
pub fn slugify(title: &str) -> String {
    let slug = title
        .to_lowercase()
        .chars()
        // Strip apostrophes entirely, replace other non-alphanumeric with hyphens
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c)
            } else if c == '\'' || c == '\u{2019}' || c == '\u{2018}' {
                None
            } else {
                Some('-')
            }
        })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");

    let truncated: String = slug.chars().take(MAX_SLUG_LEN).collect();
    let truncated = truncated.trim_end_matches('-');
    if truncated.is_empty() {
        "entry".to_string()
    } else {
        truncated.to_string()
    }
}

/// Deterministic id for a normalized entry at its final position
pub fn derived_id(kind: EntryKind, day: u32, order: u32, name: &str) -> String {
    format!("{}-d{}-{}-{}", kind, day, order, slugify(name))
}

/// Hands out entry ids that never collide with any id seen in the session
///
/// Every id the allocator has issued or observed stays reserved, including ids
/// of entries that were later deleted, so undo/redo can never confuse a new
/// entry with a stale one.
#[derive(Debug, Clone, Default)]
pub struct IdAllocator {
    known: HashSet<String>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve ids that already exist (loaded or normalized entries)
    pub fn observe<'a>(&mut self, ids: impl IntoIterator<Item = &'a str>) {
        for id in ids {
            self.known.insert(id.to_string());
        }
        debug!(known = self.known.len(), "IdAllocator::observe: done");
    }

    /// Whether an id has ever been seen in this session
    pub fn is_known(&self, id: &str) -> bool {
        self.known.contains(id)
    }

    /// Allocate a fresh id for a new entry
    pub fn allocate(&mut self, kind: EntryKind, name: &str) -> String {
        let slug = slugify(name);
        loop {
            let uuid = uuid::Uuid::now_v7().simple().to_string();
            // Tail of a v7 uuid is random; the head is a timestamp
            let hex = &uuid[uuid.len() - 8..];
            let id = format!("{}-{}-{}", hex, kind, slug);
            if self.known.insert(id.clone()) {
                debug!(%id, "IdAllocator::allocate: issued");
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Café Luitpold"), "café-luitpold");
        assert_eq!(slugify("St. Peter's Church"), "st-peters-church");
        assert_eq!(slugify("  --  "), "entry");
        assert!(slugify(&"a".repeat(100)).len() <= MAX_SLUG_LEN);
    }

    #[test]
    fn test_derived_id_is_deterministic() {
        let a = derived_id(EntryKind::Attraction, 2, 0, "English Garden");
        let b = derived_id(EntryKind::Attraction, 2, 0, "English Garden");
        assert_eq!(a, b);
        assert_eq!(a, "attraction-d2-0-english-garden");
    }

    #[test]
    fn test_allocate_never_repeats_known_ids() {
        let mut ids = IdAllocator::new();
        ids.observe(["existing"]);
        assert!(ids.is_known("existing"));

        let mut seen = HashSet::new();
        for _ in 0..200 {
            let id = ids.allocate(EntryKind::Activity, "Walk");
            assert!(id.ends_with("-activity-walk"));
            assert!(seen.insert(id));
        }
    }
}
