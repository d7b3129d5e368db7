//! Shape probes for generated plan documents
//!
//! Generated documents have no fixed schema. Each layout we know how to read
//! is one [`RawPlanShapeProbe`] variant; [`probe`] returns every variant that
//! matches, and an unrecognized document simply yields no probes.

use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::EntryKind;

/// Where a category list was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Under the `destination` object
    Destination,
    /// Directly under the document root
    Root,
}

/// A flat list of items of one kind (hotels, attractions, restaurants)
#[derive(Debug, Clone)]
pub struct CategoryList<'a> {
    pub kind: EntryKind,
    pub scope: Scope,
    /// Dotted path the list was found at, relative to its scope
    pub path: &'static str,
    pub items: &'a [Value],
}

/// One day of a per-day itinerary
#[derive(Debug, Clone)]
pub struct DayBucket<'a> {
    /// Day parsed from the key (or position when the key has no number)
    pub day: u32,
    pub activities: &'a [Value],
    /// Category arrays nested under the day, in kind order
    pub nested: Vec<(EntryKind, &'a [Value])>,
}

/// One recognized document layout
#[derive(Debug, Clone)]
pub enum RawPlanShapeProbe<'a> {
    /// Category arrays under `destination` or the root
    Catalog(CategoryList<'a>),
    /// `itinerary` keyed by day (`day1`, `day2`, ...) or an array of day objects
    DayItinerary(Vec<DayBucket<'a>>),
}

/// Candidate paths per kind, most specific first
const CATEGORY_PATHS: [(EntryKind, [&str; 2]); 3] = [
    (EntryKind::Hotel, ["accommodations.hotels", "hotels"]),
    (EntryKind::Attraction, ["attractions.places", "attractions"]),
    (EntryKind::Restaurant, ["dining.restaurants", "restaurants"]),
];

/// Day-level keys for nested category arrays
const DAY_NESTED_KEYS: [(EntryKind, &str); 3] = [
    (EntryKind::Hotel, "hotels"),
    (EntryKind::Attraction, "attractions"),
    (EntryKind::Restaurant, "restaurants"),
];

/// Probe a document for every layout it matches
pub fn probe(document: &Value) -> Vec<RawPlanShapeProbe<'_>> {
    let Some(root) = document.as_object() else {
        debug!("probe: document is not an object");
        return Vec::new();
    };
    let destination = root.get("destination").and_then(Value::as_object);

    let mut probes = Vec::new();

    for (kind, paths) in CATEGORY_PATHS {
        if let Some(list) = find_category(destination, root, kind, &paths) {
            debug!(%kind, path = list.path, scope = ?list.scope, count = list.items.len(), "probe: catalog match");
            probes.push(RawPlanShapeProbe::Catalog(list));
        }
    }

    let itinerary = root
        .get("itinerary")
        .or_else(|| destination.and_then(|d| d.get("itinerary")));
    if let Some(itinerary) = itinerary {
        let buckets = day_buckets(itinerary);
        if !buckets.is_empty() {
            debug!(days = buckets.len(), "probe: itinerary match");
            probes.push(RawPlanShapeProbe::DayItinerary(buckets));
        }
    }

    probes
}

fn find_category<'a>(
    destination: Option<&'a Map<String, Value>>,
    root: &'a Map<String, Value>,
    kind: EntryKind,
    paths: &[&'static str],
) -> Option<CategoryList<'a>> {
    let scopes = destination
        .map(|d| (Scope::Destination, d))
        .into_iter()
        .chain(std::iter::once((Scope::Root, root)));

    for (scope, map) in scopes {
        for &path in paths {
            if let Some(items) = lookup_array(map, path) {
                return Some(CategoryList {
                    kind,
                    scope,
                    path,
                    items,
                });
            }
        }
    }
    None
}

/// Resolve a dotted path to an array
fn lookup_array<'a>(map: &'a Map<String, Value>, path: &str) -> Option<&'a [Value]> {
    let mut segments = path.split('.');
    let first = segments.next()?;
    let mut current = map.get(first)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    current.as_array().map(Vec::as_slice)
}

fn day_buckets(itinerary: &Value) -> Vec<DayBucket<'_>> {
    let mut buckets: Vec<_> = match itinerary {
        // Unnumbered keys take their position in document order
        Value::Object(days) => days
            .iter()
            .enumerate()
            .filter_map(|(idx, (key, day))| {
                let position = idx as u32 + 1;
                bucket(day, parse_day_key(key).unwrap_or(position))
            })
            .collect(),
        Value::Array(days) => days
            .iter()
            .enumerate()
            .filter_map(|(idx, day)| {
                let position = idx as u32 + 1;
                let declared = day.get("day").and_then(day_number);
                bucket(day, declared.unwrap_or(position))
            })
            .collect(),
        _ => Vec::new(),
    };
    // Numeric day order, so "day10" follows "day2"; stable for equal days
    buckets.sort_by_key(|b| b.day);
    buckets
}

fn bucket(day_value: &Value, day: u32) -> Option<DayBucket<'_>> {
    match day_value {
        // A bare list under a day key is that day's activities
        Value::Array(items) => Some(DayBucket {
            day,
            activities: items.as_slice(),
            nested: Vec::new(),
        }),
        Value::Object(map) => {
            let activities = map
                .get("activities")
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or(&[]);
            let nested: Vec<_> = DAY_NESTED_KEYS
                .iter()
                .filter_map(|(kind, key)| {
                    map.get(*key)
                        .and_then(Value::as_array)
                        .map(|items| (*kind, items.as_slice()))
                })
                .collect();
            if activities.is_empty() && nested.is_empty() {
                None
            } else {
                Some(DayBucket {
                    day,
                    activities,
                    nested,
                })
            }
        }
        _ => None,
    }
}

/// Parse the first run of digits in a day key: `day1`, `Day 2`, `day_3`, `4`
pub fn parse_day_key(key: &str) -> Option<u32> {
    let digits: String = key
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse::<u32>().ok().filter(|d| *d >= 1)
}

/// A positive day number from a JSON number or string
pub fn day_number(value: &Value) -> Option<u32> {
    match value {
        Value::Number(n) => n.as_u64().and_then(|d| u32::try_from(d).ok()).filter(|d| *d >= 1),
        Value::String(s) => parse_day_key(s),
        _ => None,
    }
}
