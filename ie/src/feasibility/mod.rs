//! Feasibility checking boundary
//!
//! A plan's budget, duration and candidate hotels/attractions can be sent to
//! an external constraint solver that answers satisfiable, unsatisfiable
//! (with the conflicting constraint names), timeout or error. Only the
//! request and the verdict live here; solving stays with the service.

mod problem;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use crate::domain::{Entry, Plan};

pub use problem::{
    AttractionOption, DEFAULT_PRICE_PER_NIGHT, HotelOption, SolverProblem, SolverStatus, SolverVerdict, leading_price,
};

#[derive(Debug, Error)]
pub enum FeasibilityError {
    #[error("Solver unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid solver response: {0}")]
    InvalidResponse(String),
}

/// Answers whether a plan's constraints can all hold
#[async_trait]
pub trait FeasibilityService: Send + Sync {
    async fn check(&self, problem: &SolverProblem) -> Result<SolverVerdict, FeasibilityError>;
}

/// Build the request for a plan's current entries and ask the service
pub async fn check_plan(
    service: &dyn FeasibilityService,
    plan: &Plan,
    entries: &[Entry],
) -> Result<SolverVerdict, FeasibilityError> {
    debug!(plan_id = %plan.id, count = entries.len(), "check_plan: called");
    let problem = SolverProblem::from_plan(plan, entries);
    service.check(&problem).await
}


#[cfg(test)]
mod tests {
    use super::mock::MockFeasibilityService;
    use super::*;
    use crate::domain::EntryKind;

    fn munich() -> (Plan, Vec<Entry>) {
        let mut plan = Plan::with_id("munich", "Munich", 3);
        plan.budget = Some(300.0);
        let entries = vec![
            Entry {
                cost: Some("150 EUR".to_string()),
                ..Entry::new("h1", EntryKind::Hotel, "Hotel A")
            },
            Entry::new("a1", EntryKind::Attraction, "Marienplatz").at(1, 1),
        ];
        (plan, entries)
    }

    #[tokio::test]
    async fn test_check_plan_sends_problem_and_returns_verdict() {
        let unsat = SolverVerdict {
            status: SolverStatus::Unsatisfiable,
            solution: None,
            unsat_core: Some(vec!["budget_limit".to_string()]),
            execution_time: 4,
            constraints_count: Some(7),
            error: None,
        };
        let service = MockFeasibilityService::answering(unsat.clone());
        let (plan, entries) = munich();

        let verdict = check_plan(&service, &plan, &entries).await.unwrap();
        assert_eq!(verdict, unsat);
        assert!(!verdict.is_feasible());

        let requests = service.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].budget, Some(300.0));
        assert_eq!(requests[0].hotels[0].price_per_night, 150.0);
        assert_eq!(requests[0].attractions[0].name, "Marienplatz");
    }

    #[tokio::test]
    async fn test_check_plan_surfaces_service_errors() {
        let service = MockFeasibilityService::unavailable("connection refused");
        let (plan, entries) = munich();

        let err = check_plan(&service, &plan, &entries).await.unwrap_err();
        assert!(matches!(err, FeasibilityError::Unavailable(msg) if msg == "connection refused"));
    }
}
