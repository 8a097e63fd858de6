//! Offer evaluation pass — matches pending steps against one offer.
//!
//! Builds a fresh [`OfferPool`] per offer, walks the plan tree in order,
//! and lets each pending step consume what it needs. First come, first
//! served: a resource consumed by an earlier step is unavailable to later
//! steps in the same pass, with no rollback.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use gridloom_offer::{Offer, OfferPool, Resource};
use gridloom_plan::{Element, Plan, RequirementKind, Status, Step};

use crate::error::SchedulerResult;

/// What one step got out of an offer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepOutcome {
    pub step_id: String,
    pub step_name: String,
    /// Resources consumed from the pool, in requirement order. May be
    /// non-empty even for an unsatisfied step: consumption is
    /// first-come-first-served with no rollback.
    pub consumed: Vec<Resource>,
    pub satisfied: bool,
}

/// Evaluate one offer against every pending step of a plan.
///
/// Satisfied steps transition `Pending -> Prepared`; unsatisfied steps
/// stay `Pending` and retry against a future offer. A malformed offer
/// fails the whole pass before any step is touched.
pub fn evaluate_offer(offer: &Offer, plan: &mut Plan) -> SchedulerResult<Vec<StepOutcome>> {
    let mut pool = OfferPool::from_offer(offer)?;
    let mut outcomes = Vec::new();

    for phase in plan.phases_mut() {
        for step in phase.steps_mut() {
            if step.status() != Status::Pending || step.is_interrupted() {
                continue;
            }

            let outcome = evaluate_step(step, &mut pool)?;
            if outcome.satisfied {
                step.transition(Status::Prepared)?;
                info!(step = %outcome.step_name, offer_id = %offer.id, "step matched offer");
            } else {
                debug!(step = %outcome.step_name, offer_id = %offer.id, "offer cannot satisfy step");
            }
            outcomes.push(outcome);
        }
    }

    Ok(outcomes)
}

/// Attempt every requirement of one step against the pool, stopping at
/// the first absence. Earlier consumptions stand either way.
fn evaluate_step(step: &Step, pool: &mut OfferPool) -> SchedulerResult<StepOutcome> {
    let mut consumed = Vec::new();
    let mut satisfied = true;

    for requirement in step.requirements() {
        let taken = match &requirement.kind {
            RequirementKind::Atomic => pool.consume_atomic(&requirement.name, &requirement.value)?,
            RequirementKind::Merged => {
                pool.consume_unreserved_merged(&requirement.name, &requirement.value)?
            }
            RequirementKind::Reserved { resource_id } => {
                pool.consume_reserved(&requirement.name, &requirement.value, resource_id)?
            }
        };

        match taken {
            Some(resource) => consumed.push(resource),
            None => {
                satisfied = false;
                break;
            }
        }
    }

    Ok(StepOutcome {
        step_id: step.id().to_string(),
        step_name: step.name().to_string(),
        consumed,
        satisfied,
    })
}
