//! Execution status model.
//!
//! Two enums split what an element may *store* from what a query may
//! *observe*:
//!
//! - [`Status`] — the storable lifecycle states. Normal progression is
//!   `Pending -> Prepared -> Starting -> Started -> Complete`, with
//!   restart edges back to `Pending` and a `Pending <-> Delayed` backoff
//!   loop after launch failures. `Complete` is terminal for the current
//!   processing of an element; `Error` is set only at construction time
//!   and needs operator intervention, not a retry.
//! - [`ObservedStatus`] — everything [`Status`] can hold plus `Waiting`
//!   (interruption somewhere in the subtree) and `InProgress` (composite
//!   with partial completion). These two exist only as query results; the
//!   type split makes storing them impossible.

use serde::{Deserialize, Serialize};

/// Lifecycle state an execution element stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Construction from the specification failed; operator must fix it.
    Error,
    /// Waiting for a suitable offer.
    Pending,
    /// Evaluated against an offer; resources set aside.
    Prepared,
    /// Operations submitted; awaiting feedback.
    Starting,
    /// Feedback received, readiness not yet confirmed.
    Started,
    /// Done for this processing instance. Terminal.
    Complete,
    /// Launch failed; waiting out an exponential backoff before retrying.
    Delayed,
}

/// Status as seen through an aggregation query.
///
/// Superset of [`Status`]: `Waiting` and `InProgress` are derived-only
/// and never stored on an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservedStatus {
    Error,
    /// This element or a descendant is interrupted.
    Waiting,
    Pending,
    Prepared,
    Starting,
    Started,
    /// Composite with at least one child complete and at least one still
    /// advancing.
    InProgress,
    Complete,
    Delayed,
}

impl From<Status> for ObservedStatus {
    fn from(status: Status) -> Self {
        match status {
            Status::Error => ObservedStatus::Error,
            Status::Pending => ObservedStatus::Pending,
            Status::Prepared => ObservedStatus::Prepared,
            Status::Starting => ObservedStatus::Starting,
            Status::Started => ObservedStatus::Started,
            Status::Complete => ObservedStatus::Complete,
            Status::Delayed => ObservedStatus::Delayed,
        }
    }
}

impl Status {
    /// Whether the transition table permits `self -> next`.
    ///
    /// Same-state writes are allowed (idempotent). `Complete` accepts no
    /// other target, and `Error` neither enters nor leaves the cycle.
    pub fn can_transition_to(self, next: Status) -> bool {
        use Status::*;
        if self == next {
            return true;
        }
        matches!(
            (self, next),
            // Forward path.
            (Pending, Prepared)
                | (Prepared, Starting)
                | (Starting, Started)
                | (Started, Complete)
                // Restart: the underlying allocation was invalidated.
                | (Prepared, Pending)
                | (Starting, Pending)
                | (Started, Pending)
                // Backoff after a launch failure.
                | (Pending, Delayed)
                | (Delayed, Pending)
        )
    }

    /// Status is in one of the running states.
    pub fn is_running(self) -> bool {
        ObservedStatus::from(self).is_running()
    }
}

impl ObservedStatus {
    /// Status is in one of the running states.
    pub fn is_running(self) -> bool {
        matches!(
            self,
            ObservedStatus::Prepared
                | ObservedStatus::Starting
                | ObservedStatus::Started
                | ObservedStatus::InProgress
        )
    }
}
