//! Planning error types.

use thiserror::Error;

/// Result type for timeline planning.
pub type PlanResult<T> = Result<T, PlanError>;

/// Errors raised before any external call is made.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl PlanError {
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}
