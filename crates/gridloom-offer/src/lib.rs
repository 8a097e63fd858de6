//! gridloom-offer — per-offer resource classification and consumption.
//!
//! Given one offer from the cluster manager, this crate:
//!
//! - Classifies every resource as reserved, atomic, or mergeable
//! - Aggregates mergeable resources into per-name totals
//! - Exposes consume operations that either succeed exactly or leave the
//!   pool untouched (no double-spend, no partial consumption)
//!
//! # Components
//!
//! - **`value`** — typed value algebra (scalar, ranges, set)
//! - **`resource`** — offer/resource records and classification
//! - **`pool`** — the per-offer consumable pool

pub mod error;
pub mod pool;
pub mod resource;
pub mod value;

pub use error::{OfferError, OfferResult, ValueError};
pub use pool::OfferPool;
pub use resource::{DiskInfo, Offer, Reservation, Resource, ResourceClass, UNRESERVED_ROLE};
pub use value::{Interval, Value, ValueKind};
