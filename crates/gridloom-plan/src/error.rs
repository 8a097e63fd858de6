//! Error types for plan elements.

use thiserror::Error;

use crate::status::Status;

/// Result type alias for plan operations.
pub type PlanResult<T> = Result<T, PlanError>;

/// Errors that can occur while mutating plan elements.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("illegal status transition: {from:?} -> {to:?}")]
    IllegalTransition { from: Status, to: Status },
}
