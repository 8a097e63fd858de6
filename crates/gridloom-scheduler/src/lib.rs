//! gridloom-scheduler — drives one offer-evaluation pass.
//!
//! Bridges `gridloom-offer` and `gridloom-plan`: a fresh pool is built
//! for each incoming offer, pending steps consume from it in plan order,
//! and each outcome feeds the step's status transition.
//!
//! # Architecture
//!
//! ```text
//! evaluate_offer
//!   ├── OfferPool (built fresh per offer, single owner)
//!   └── Plan tree walk (deterministic order)
//!       ├── consume per RequirementKind
//!       └── Pending -> Prepared on a satisfied step
//! ```

pub mod error;
pub mod evaluator;

pub use error::{SchedulerError, SchedulerResult};
pub use evaluator::{StepOutcome, evaluate_offer};
