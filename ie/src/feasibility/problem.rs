//! Constraint-solver request and response shapes

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::domain::{Entry, EntryKind, Plan};

/// Nightly price assumed when a hotel entry carries no usable cost
pub const DEFAULT_PRICE_PER_NIGHT: f64 = 100.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HotelOption {
    pub name: String,
    pub price_per_night: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttractionOption {
    pub name: String,
    pub category: String,
}

/// Request body for the feasibility solver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverProblem {
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    pub duration: u32,
    #[serde(default)]
    pub preferences: Vec<String>,
    #[serde(default)]
    pub hotels: Vec<HotelOption>,
    #[serde(default)]
    pub attractions: Vec<AttractionOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
}

impl SolverProblem {
    /// Build a request from a plan and its current entries
    ///
    /// Hotels become priced options; attractions and activities become
    /// attraction options categorized by kind. Restaurants are not sent.
    pub fn from_plan(plan: &Plan, entries: &[Entry]) -> Self {
        debug!(plan_id = %plan.id, count = entries.len(), "SolverProblem::from_plan: called");
        let hotels = entries
            .iter()
            .filter(|e| e.kind == EntryKind::Hotel)
            .map(|e| HotelOption {
                name: e.name.clone(),
                price_per_night: e
                    .cost
                    .as_deref()
                    .and_then(leading_price)
                    .unwrap_or(DEFAULT_PRICE_PER_NIGHT),
            })
            .collect();
        let attractions = entries
            .iter()
            .filter(|e| matches!(e.kind, EntryKind::Attraction | EntryKind::Activity))
            .map(|e| AttractionOption {
                name: e.name.clone(),
                category: e.kind.to_string(),
            })
            .collect();

        Self {
            destination: plan.destination.clone(),
            budget: plan.budget,
            duration: plan.days(),
            preferences: plan.preferences.clone(),
            hotels,
            attractions,
            start_date: None,
            end_date: None,
        }
    }
}

/// First number in a free-form price such as `"€120-150 per night"`
pub fn leading_price(text: &str) -> Option<f64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .filter(|c| *c != ',')
        .collect();
    digits.trim_end_matches('.').parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolverStatus {
    Satisfiable,
    Unsatisfiable,
    Timeout,
    Error,
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Satisfiable => write!(f, "satisfiable"),
            Self::Unsatisfiable => write!(f, "unsatisfiable"),
            Self::Timeout => write!(f, "timeout"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Solver response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverVerdict {
    pub status: SolverStatus,
    /// Variable assignments when satisfiable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub solution: Option<Map<String, Value>>,
    /// Names of the conflicting constraints when unsatisfiable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unsat_core: Option<Vec<String>>,
    /// Milliseconds
    #[serde(default)]
    pub execution_time: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SolverVerdict {
    pub fn is_feasible(&self) -> bool {
        self.status == SolverStatus::Satisfiable
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: SolverStatus::Error,
            solution: None,
            unsat_core: None,
            execution_time: 0,
            constraints_count: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_plan() {
        let mut plan = Plan::with_id("p", "Munich", 3);
        plan.budget = Some(1500.0);
        plan.preferences = vec!["culture".to_string()];
        let entries = vec![
            Entry {
                cost: Some("€320 per night".to_string()),
                ..Entry::new("h1", EntryKind::Hotel, "Bayerischer Hof")
            },
            Entry::new("h2", EntryKind::Hotel, "Budget Inn"),
            Entry::new("a1", EntryKind::Attraction, "Deutsches Museum"),
            Entry::new("r1", EntryKind::Restaurant, "Tantris"),
        ];

        let problem = SolverProblem::from_plan(&plan, &entries);
        assert_eq!(problem.duration, 3);
        assert_eq!(problem.hotels[0].price_per_night, 320.0);
        assert_eq!(problem.hotels[1].price_per_night, DEFAULT_PRICE_PER_NIGHT);
        assert_eq!(problem.attractions.len(), 1);
        assert_eq!(problem.attractions[0].category, "attraction");

        let json = serde_json::to_value(&problem).unwrap();
        assert_eq!(json["hotels"][0]["price_per_night"], 320.0);
        assert!(json.get("start_date").is_none());
    }

    #[test]
    fn test_leading_price() {
        assert_eq!(leading_price("120"), Some(120.0));
        assert_eq!(leading_price("€1,200-1,500"), Some(1200.0));
        assert_eq!(leading_price("approx. 89.50 EUR"), Some(89.5));
        assert_eq!(leading_price("free"), None);
    }

    #[test]
    fn test_parse_satisfiable_verdict() {
        let verdict: SolverVerdict = serde_json::from_value(json!({
            "status": "satisfiable",
            "solution": {"hotel_selected": true, "accommodation_cost": 960.0},
            "execution_time": 12,
            "constraints_count": 8
        }))
        .unwrap();
        assert!(verdict.is_feasible());
        assert_eq!(verdict.solution.unwrap()["hotel_selected"], true);
    }

    #[test]
    fn test_parse_unsat_and_timeout() {
        let verdict: SolverVerdict = serde_json::from_value(json!({
            "status": "unsatisfiable",
            "unsat_core": ["budget_limit"],
            "execution_time": 3,
            "constraints_count": 5
        }))
        .unwrap();
        assert_eq!(verdict.unsat_core.as_deref(), Some(&["budget_limit".to_string()][..]));

        let timeout: SolverVerdict = serde_json::from_value(json!({"status": "timeout", "execution_time": 30000})).unwrap();
        assert_eq!(timeout.status, SolverStatus::Timeout);
        assert!(timeout.constraints_count.is_none());
    }
}
