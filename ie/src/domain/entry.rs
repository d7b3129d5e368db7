//! Entry domain type
//!
//! One plannable unit of an itinerary (hotel, attraction, restaurant or activity)
//! positioned by a 1-based `day` and a 0-based `order` within that day.

use planstore::Record;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::debug;

/// What kind of thing an entry is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Hotel,
    Attraction,
    Restaurant,
    #[default]
    Activity,
}

impl EntryKind {
    /// All kinds, in extraction order
    pub const ALL: [EntryKind; 4] = [
        EntryKind::Hotel,
        EntryKind::Attraction,
        EntryKind::Restaurant,
        EntryKind::Activity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hotel => "hotel",
            Self::Attraction => "attraction",
            Self::Restaurant => "restaurant",
            Self::Activity => "activity",
        }
    }
}

impl std::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = String;

    /// Parse a kind, accepting the loose vocabulary generated plans use
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "hotel" | "hotels" | "accommodation" | "accommodations" | "lodging" | "stay" => Ok(Self::Hotel),
            "attraction" | "attractions" | "sight" | "sightseeing" | "landmark" | "museum" | "place" => {
                Ok(Self::Attraction)
            }
            "restaurant" | "restaurants" | "dining" | "food" | "meal" | "cafe" => Ok(Self::Restaurant),
            "activity" | "activities" | "event" => Ok(Self::Activity),
            other => Err(format!("unknown entry kind: {}", other)),
        }
    }
}

/// Geographic position of an entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

/// A single itinerary entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Stable identifier, unique within the plan's lifetime
    pub id: String,

    pub kind: EntryKind,

    /// Display title (never empty)
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<String>,

    /// 1-based day within the plan
    pub day: u32,

    /// 0-based position within the day
    pub order: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coordinates: Option<Coordinates>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
}

impl Entry {
    /// Create an entry with no optional fields at day 1, order 0
    pub fn new(id: impl Into<String>, kind: EntryKind, name: impl Into<String>) -> Self {
        let id = id.into();
        let name = name.into();
        debug!(%id, %kind, %name, "Entry::new: called");
        Self {
            id,
            kind,
            name,
            description: None,
            location: None,
            time: None,
            duration: None,
            cost: None,
            day: 1,
            order: 0,
            coordinates: None,
            image_url: None,
            rating: None,
        }
    }

    /// Builder-style position setter
    pub fn at(mut self, day: u32, order: u32) -> Self {
        self.day = day;
        self.order = order;
        self
    }

    /// Sort key establishing global itinerary order
    pub fn position(&self) -> (u32, u32) {
        (self.day, self.order)
    }
}

impl Record for Entry {
    fn id(&self) -> &str {
        &self.id
    }
}

/// A user-supplied entry that has not been given an id or position yet
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryDraft {
    #[serde(default)]
    pub kind: EntryKind,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub cost: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

impl EntryDraft {
    pub fn new(kind: EntryKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            ..Default::default()
        }
    }

    /// Materialize the draft with an allocated id; position is set on insert
    pub fn into_entry(self, id: impl Into<String>) -> Entry {
        Entry {
            id: id.into(),
            kind: self.kind,
            name: self.name.trim().to_string(),
            description: self.description,
            location: self.location,
            time: self.time,
            duration: self.duration,
            cost: self.cost,
            day: 1,
            order: 0,
            coordinates: self.coordinates,
            image_url: self.image_url,
            rating: self.rating,
        }
    }
}

/// Display-field changes for an existing entry
///
/// `None` leaves a field untouched. An empty string clears an optional field;
/// a blank `name` is ignored because entries always carry a title.
/// Position (`day`/`order`) is absent: only moves change it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPatch {
    #[serde(default)]
    pub kind: Option<EntryKind>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub time: Option<String>,
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default)]
    pub cost: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
}

impl EntryPatch {
    /// Apply the patch, returning whether anything changed
    pub fn apply(&self, entry: &mut Entry) -> bool {
        debug!(entry_id = %entry.id, "EntryPatch::apply: called");
        let before = entry.clone();

        if let Some(kind) = self.kind {
            entry.kind = kind;
        }
        if let Some(name) = &self.name {
            let name = name.trim();
            if name.is_empty() {
                debug!(entry_id = %entry.id, "EntryPatch::apply: ignoring blank name");
            } else {
                entry.name = name.to_string();
            }
        }
        patch_text(&mut entry.description, &self.description);
        patch_text(&mut entry.location, &self.location);
        patch_text(&mut entry.time, &self.time);
        patch_text(&mut entry.duration, &self.duration);
        patch_text(&mut entry.cost, &self.cost);
        patch_text(&mut entry.image_url, &self.image_url);
        if let Some(coordinates) = self.coordinates {
            entry.coordinates = Some(coordinates);
        }
        if let Some(rating) = self.rating {
            entry.rating = Some(rating);
        }

        *entry != before
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

fn patch_text(field: &mut Option<String>, value: &Option<String>) {
    if let Some(value) = value {
        *field = if value.trim().is_empty() { None } else { Some(value.clone()) };
    }
}
