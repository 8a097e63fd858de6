//! Per-offer resource pool — classifies, aggregates, and consumes the
//! resources of a single offer.
//!
//! A pool is built once per incoming offer, mutated in place by the one
//! evaluation pass that owns it, and discarded when the pass ends. The
//! three maps partition the offer: every resource lands in exactly one.
//! Consume operations mutate the pool only on success; an absent result
//! leaves it untouched.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{OfferError, OfferResult};
use crate::resource::{Offer, Resource, ResourceClass};
use crate::value::{self, Value};

/// Consumable view over one offer's resources.
#[derive(Debug, Clone, PartialEq)]
pub struct OfferPool {
    /// Name → atomic, unreserved candidates in offer order.
    unreserved_atomic: HashMap<String, Vec<Resource>>,
    /// Resource-id → reserved resource (atomic or mergeable).
    reserved: HashMap<String, Resource>,
    /// Name → aggregate of all unreserved mergeable resources.
    unreserved_merged: HashMap<String, Value>,
}

impl OfferPool {
    /// Build a pool by classifying each resource of the offer in order.
    ///
    /// A duplicate reserved resource-id fails construction outright and
    /// rejects the whole offer for matching; reserved entries are never
    /// silently overwritten.
    pub fn from_offer(offer: &Offer) -> OfferResult<Self> {
        let mut pool = Self {
            unreserved_atomic: HashMap::new(),
            reserved: HashMap::new(),
            unreserved_merged: HashMap::new(),
        };

        for resource in &offer.resources {
            match resource.classify() {
                ResourceClass::Reserved { resource_id } => {
                    if pool.reserved.contains_key(&resource_id) {
                        return Err(OfferError::DuplicateResourceId(resource_id));
                    }
                    pool.reserved.insert(resource_id, resource.clone());
                }
                ResourceClass::Atomic => {
                    pool.unreserved_atomic
                        .entry(resource.name.clone())
                        .or_default()
                        .push(resource.clone());
                }
                ResourceClass::Mergeable => {
                    let aggregate = match pool.unreserved_merged.get(&resource.name) {
                        Some(existing) => value::add(existing, &resource.value)?,
                        None => resource.value.clone(),
                    };
                    pool.unreserved_merged.insert(resource.name.clone(), aggregate);
                }
            }
        }

        debug!(
            offer_id = %offer.id,
            atomic = pool.unreserved_atomic.len(),
            reserved = pool.reserved.len(),
            merged = pool.unreserved_merged.len(),
            "offer pool built"
        );
        Ok(pool)
    }

    /// Consume an unreserved atomic resource whole.
    ///
    /// Among the candidates under `name`, the smallest value that still
    /// satisfies `want` wins (policy: minimize surplus waste; offer
    /// order breaks exact ties). Atomic resources are indivisible: the
    /// chosen candidate is removed entirely.
    pub fn consume_atomic(&mut self, name: &str, want: &Value) -> OfferResult<Option<Resource>> {
        let Some(bucket) = self.unreserved_atomic.get(name) else {
            debug!(%name, "no atomic resources under this name");
            return Ok(None);
        };

        let mut best: Option<usize> = None;
        for (index, candidate) in bucket.iter().enumerate() {
            if !value::sufficient(&candidate.value, want)? {
                continue;
            }
            match best {
                Some(current) if bucket[current].value.quantity() <= candidate.value.quantity() => {}
                _ => best = Some(index),
            }
        }

        let Some(index) = best else {
            debug!(%name, "no sufficient atomic candidate");
            return Ok(None);
        };

        let Some(bucket) = self.unreserved_atomic.get_mut(name) else {
            return Ok(None);
        };
        let resource = bucket.remove(index);
        if bucket.is_empty() {
            self.unreserved_atomic.remove(name);
        }
        debug!(%name, "atomic resource consumed");
        Ok(Some(resource))
    }

    /// Consume a reserved resource by its resource-id.
    ///
    /// The entry must exist, carry the expected name, and hold a
    /// sufficient value; any mismatch is an absent result with the pool
    /// unchanged.
    pub fn consume_reserved(
        &mut self,
        name: &str,
        want: &Value,
        resource_id: &str,
    ) -> OfferResult<Option<Resource>> {
        let sufficient = match self.reserved.get(resource_id) {
            None => {
                debug!(%resource_id, "no reserved resource with this id");
                return Ok(None);
            }
            Some(entry) if entry.name != name => {
                debug!(%resource_id, expected = %name, found = %entry.name, "reserved name mismatch");
                return Ok(None);
            }
            Some(entry) => value::sufficient(&entry.value, want)?,
        };

        if !sufficient {
            debug!(%name, %resource_id, "insufficient reserved value");
            return Ok(None);
        }

        debug!(%name, %resource_id, "reserved resource consumed");
        Ok(self.reserved.remove(resource_id))
    }

    /// Carve `want` out of the merged unreserved aggregate for `name`.
    ///
    /// On success the remainder is stored back — or the key removed when
    /// the remainder is the kind's zero — and a fresh unreserved resource
    /// carrying exactly `want` is returned.
    pub fn consume_unreserved_merged(
        &mut self,
        name: &str,
        want: &Value,
    ) -> OfferResult<Option<Resource>> {
        let Some(aggregate) = self.unreserved_merged.get(name) else {
            debug!(%name, "no merged resources under this name");
            return Ok(None);
        };

        if !value::sufficient(aggregate, want)? {
            debug!(%name, "insufficient merged aggregate");
            return Ok(None);
        }

        let remainder = value::subtract(aggregate, want)?;
        if remainder.is_zero() {
            self.unreserved_merged.remove(name);
        } else {
            self.unreserved_merged.insert(name.to_string(), remainder);
        }

        debug!(%name, "merged resource consumed");
        Ok(Some(Resource::unreserved(name, want.clone())))
    }

    // ── Read accessors ─────────────────────────────────────────────

    /// Name → atomic unreserved candidates. Read-only view.
    pub fn unreserved_atomic_pool(&self) -> &HashMap<String, Vec<Resource>> {
        &self.unreserved_atomic
    }

    /// Resource-id → reserved resource. Read-only view.
    pub fn reserved_pool(&self) -> &HashMap<String, Resource> {
        &self.reserved
    }

    /// Name → merged unreserved aggregate. Read-only view.
    pub fn unreserved_merged_pool(&self) -> &HashMap<String, Value> {
        &self.unreserved_merged
    }
}
