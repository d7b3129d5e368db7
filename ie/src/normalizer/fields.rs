//! Field extraction for individual generated items
//!
//! Items come as plain strings or as objects whose keys vary between
//! generations (`name` vs `title`, `price` vs `price_per_night`, ...).

use serde_json::{Map, Value};

use super::probe::day_number;
use crate::domain::{Coordinates, Entry, EntryKind};

const NAME_KEYS: &[&str] = &["name", "title", "activity", "place"];
const DESCRIPTION_KEYS: &[&str] = &["description", "details", "summary", "notes"];
const LOCATION_KEYS: &[&str] = &["location", "address", "vicinity", "area"];
const TIME_KEYS: &[&str] = &["time", "startTime", "start_time"];
const DURATION_KEYS: &[&str] = &["duration", "durationText"];
const COST_KEYS: &[&str] = &[
    "cost",
    "price",
    "price_per_night",
    "pricePerNight",
    "priceRange",
    "price_range",
    "estimatedCost",
];
const IMAGE_KEYS: &[&str] = &["imageUrl", "image_url", "image", "photo"];
const KIND_KEYS: &[&str] = &["type", "kind", "category"];

/// Everything we could read from one generated item
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemFields {
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub time: Option<String>,
    pub duration: Option<String>,
    pub cost: Option<String>,
    pub coordinates: Option<Coordinates>,
    pub image_url: Option<String>,
    pub rating: Option<f64>,
    /// Day the item declares for itself
    pub day: Option<u32>,
    /// Order the item declares for itself
    pub order: Option<u32>,
    /// Kind the item declares for itself
    pub kind: Option<EntryKind>,
}

impl ItemFields {
    /// Build an entry; id is assigned later once the final position is known
    pub fn into_entry(self, kind: EntryKind, day: u32, order: u32) -> Entry {
        Entry {
            id: String::new(),
            kind,
            name: self.name,
            description: self.description,
            location: self.location,
            time: self.time,
            duration: self.duration,
            cost: self.cost,
            day,
            order,
            coordinates: self.coordinates,
            image_url: self.image_url,
            rating: self.rating,
        }
    }
}

/// Read one item; `None` when it has no usable name
pub fn read_item(value: &Value) -> Option<ItemFields> {
    match value {
        Value::String(s) => non_blank(s).map(|name| ItemFields {
            name,
            ..Default::default()
        }),
        Value::Object(map) => read_object(map),
        _ => None,
    }
}

fn read_object(map: &Map<String, Value>) -> Option<ItemFields> {
    let name = first_text(map, NAME_KEYS)?;

    // `location` is sometimes a text address and sometimes a {lat, lng, address} object
    let (location, location_coordinates) = match map.get("location") {
        Some(Value::Object(loc)) => (
            first_text(loc, &["address", "name", "formatted_address"]).or_else(|| first_text(map, &LOCATION_KEYS[1..])),
            coordinates_from(loc),
        ),
        _ => (first_text(map, LOCATION_KEYS), None),
    };

    let coordinates = map
        .get("coordinates")
        .and_then(Value::as_object)
        .and_then(coordinates_from)
        .or_else(|| coordinates_from(map))
        .or(location_coordinates);

    Some(ItemFields {
        id: map.get("id").and_then(text),
        name,
        description: first_text(map, DESCRIPTION_KEYS),
        location,
        time: first_text(map, TIME_KEYS),
        duration: first_text(map, DURATION_KEYS),
        cost: first_text(map, COST_KEYS),
        coordinates,
        image_url: first_text(map, IMAGE_KEYS),
        rating: map.get("rating").and_then(number),
        day: map.get("day").and_then(day_number),
        order: map
            .get("order")
            .and_then(Value::as_u64)
            .and_then(|o| u32::try_from(o).ok()),
        kind: KIND_KEYS
            .iter()
            .filter_map(|key| map.get(*key).and_then(Value::as_str))
            .find_map(|s| s.parse::<EntryKind>().ok()),
    })
}

fn first_text(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| map.get(*key).and_then(text))
}

/// Display text for a scalar; numbers are rendered, blanks dropped
fn text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => non_blank(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|n| n.is_finite())
}

fn coordinates_from(map: &Map<String, Value>) -> Option<Coordinates> {
    let lat = ["lat", "latitude"].iter().find_map(|k| map.get(*k).and_then(number))?;
    let lng = ["lng", "lon", "long", "longitude"]
        .iter()
        .find_map(|k| map.get(*k).and_then(number))?;
    ((-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lng)).then_some(Coordinates { lat, lng })
}
