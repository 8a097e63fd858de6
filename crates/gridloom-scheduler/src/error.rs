//! Error types for offer evaluation.

use thiserror::Error;

/// Result type alias for evaluation operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// Errors that can occur during an offer-evaluation pass.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("offer error: {0}")]
    Offer(#[from] gridloom_offer::OfferError),

    #[error("plan error: {0}")]
    Plan(#[from] gridloom_plan::PlanError),
}
