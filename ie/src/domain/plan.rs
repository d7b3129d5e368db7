//! Plan domain type
//!
//! The enclosing trip: where, how long, how expensive, and the raw generated
//! document the itinerary was seeded from.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::str::FromStr;
use tracing::debug;

use super::slugify;

/// Spending level requested for the trip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BudgetTier {
    Budget,
    #[default]
    Moderate,
    Luxury,
}

impl std::fmt::Display for BudgetTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Budget => write!(f, "budget"),
            Self::Moderate => write!(f, "moderate"),
            Self::Luxury => write!(f, "luxury"),
        }
    }
}

impl FromStr for BudgetTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "budget" | "low" | "cheap" => Ok(Self::Budget),
            "moderate" | "medium" | "mid" | "standard" => Ok(Self::Moderate),
            "luxury" | "high" | "premium" => Ok(Self::Luxury),
            other => Err(format!("unknown budget tier: {}", other)),
        }
    }
}

/// A trip plan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,

    pub destination: String,

    /// Number of days in the trip (always at least 1)
    pub duration_days: u32,

    #[serde(default)]
    pub budget_tier: BudgetTier,

    /// Total budget, when the user gave a number
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,

    #[serde(default)]
    pub preferences: Vec<String>,

    #[serde(default = "default_language")]
    pub language: String,

    /// Agent-generated document, shape not guaranteed
    #[serde(default)]
    pub raw_generated_document: Value,
}

fn default_language() -> String {
    "en".to_string()
}

impl Plan {
    /// Create a plan with a generated id
    pub fn new(destination: impl Into<String>, duration_days: u32) -> Self {
        let destination = destination.into();
        let duration_days = duration_days.max(1);
        let uuid = uuid::Uuid::now_v7().simple().to_string();
        let id = format!("{}-{}d-{}", slugify(&destination), duration_days, &uuid[uuid.len() - 6..]);
        debug!(%id, %destination, duration_days, "Plan::new: called");
        Self::with_id(id, destination, duration_days)
    }

    /// Create with a specific id (for stores that assign ids)
    pub fn with_id(id: impl Into<String>, destination: impl Into<String>, duration_days: u32) -> Self {
        Self {
            id: id.into(),
            destination: destination.into(),
            duration_days: duration_days.max(1),
            budget_tier: BudgetTier::default(),
            budget: None,
            preferences: Vec::new(),
            language: default_language(),
            raw_generated_document: Value::Null,
        }
    }

    pub fn with_document(mut self, document: Value) -> Self {
        self.raw_generated_document = document;
        self
    }

    /// Duration with the `>= 1` floor applied (deserialized plans may carry 0)
    pub fn days(&self) -> u32 {
        self.duration_days.max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plan_new_clamps_duration() {
        let plan = Plan::new("Munich", 0);
        assert_eq!(plan.duration_days, 1);
        assert!(plan.id.starts_with("munich-1d-"));
    }

    #[test]
    fn test_plan_serde_defaults() {
        let plan: Plan = serde_json::from_value(serde_json::json!({
            "id": "p1",
            "destination": "Zurich",
            "durationDays": 4
        }))
        .unwrap();

        assert_eq!(plan.budget_tier, BudgetTier::Moderate);
        assert_eq!(plan.language, "en");
        assert!(plan.raw_generated_document.is_null());
        assert!(plan.preferences.is_empty());
    }

    #[test]
    fn test_budget_tier_parse() {
        assert_eq!("LOW".parse::<BudgetTier>(), Ok(BudgetTier::Budget));
        assert_eq!("luxury".parse::<BudgetTier>(), Ok(BudgetTier::Luxury));
        assert!("free".parse::<BudgetTier>().is_err());
    }
}
