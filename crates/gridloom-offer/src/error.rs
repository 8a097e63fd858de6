//! Error types for offer resource matching.

use thiserror::Error;

use crate::value::ValueKind;

/// Result type alias for offer pool operations.
pub type OfferResult<T> = Result<T, OfferError>;

/// Errors from the resource value algebra.
///
/// Both variants signal caller bugs or malformed input, never routine
/// "this offer is too small" conditions — those are absent results.
#[derive(Debug, Error)]
pub enum ValueError {
    #[error("value kind mismatch: have {have}, want {want}")]
    KindMismatch { have: ValueKind, want: ValueKind },

    #[error("cannot subtract: subtrahend exceeds the available value")]
    Insufficient,
}

/// Errors that can occur while building or consuming an offer pool.
#[derive(Debug, Error)]
pub enum OfferError {
    #[error("duplicate reserved resource id in offer: {0}")]
    DuplicateResourceId(String),

    #[error("value error: {0}")]
    Value(#[from] ValueError),
}
