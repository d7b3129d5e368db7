//! Sync boundary errors

use thiserror::Error;

/// A store call that failed; the editor keeps its local state
#[derive(Debug, Clone, Error)]
pub enum PersistenceFailure {
    #[error("Store error: {0}")]
    Store(String),

    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    #[error("Channel error")]
    ChannelError,
}

/// The generation service could not produce a document
#[derive(Debug, Clone, Error)]
pub enum GenerationError {
    #[error("Generation request rejected: {0}")]
    Rejected(String),

    #[error("Generation service unavailable: {0}")]
    Unavailable(String),
}
