//! Ordering error types

use thiserror::Error;

/// A mutation that was rejected; the entry list is unchanged
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidOperation {
    #[error("Entry not found: {entry_id}")]
    NotFound { entry_id: String },

    #[error("Day {day} is outside 1..={duration_days}")]
    OutOfRange { day: u32, duration_days: u32 },

    #[error("Entry id already in use: {entry_id}")]
    DuplicateId { entry_id: String },

    #[error("Entry name must not be empty")]
    EmptyName,
}

impl InvalidOperation {
    /// Short machine-readable kind for callers that surface the outcome
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not-found",
            Self::OutOfRange { .. } => "out-of-range",
            Self::DuplicateId { .. } => "duplicate-id",
            Self::EmptyName => "empty-name",
        }
    }
}

/// A broken itinerary invariant found by [`super::check_invariants`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvariantViolation {
    #[error("Entry {entry_id} has day {day} outside 1..={duration_days}")]
    DayOutOfRange {
        entry_id: String,
        day: u32,
        duration_days: u32,
    },

    #[error("Day {day} orders are not 0..{count}: {orders:?}")]
    NonContiguousOrder { day: u32, count: usize, orders: Vec<u32> },

    #[error("Duplicate entry id: {0}")]
    DuplicateId(String),

    #[error("Entry {0} has an empty name")]
    EmptyName(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        assert_eq!(
            InvalidOperation::NotFound {
                entry_id: "x".to_string()
            }
            .kind(),
            "not-found"
        );
        assert_eq!(
            InvalidOperation::OutOfRange {
                day: 9,
                duration_days: 3
            }
            .kind(),
            "out-of-range"
        );
    }

    #[test]
    fn test_out_of_range_message() {
        let err = InvalidOperation::OutOfRange {
            day: 9,
            duration_days: 3,
        };
        let msg = err.to_string();
        assert!(msg.contains('9'));
        assert!(msg.contains("1..=3"));
    }
}
