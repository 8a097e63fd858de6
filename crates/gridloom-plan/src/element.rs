//! Plan element hierarchy — steps composed into phases composed into
//! plans.
//!
//! Every node stores a [`Status`] (leaves) or derives one (composites)
//! plus an orthogonal `interrupted` flag. Composite status is never
//! written anywhere: [`Element::observed_status`] recomputes it per query
//! with a recursive walk, so a transition on a leaf is immediately
//! visible at the phase and plan level.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use gridloom_offer::Value;

use crate::error::{PlanError, PlanResult};
use crate::status::{ObservedStatus, Status};

// ── Specs ──────────────────────────────────────────────────────────

/// How a requirement is satisfied from an offer pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RequirementKind {
    /// Consume an indivisible resource whole (e.g. a mount volume).
    Atomic,
    /// Carve the desired amount out of the merged unreserved aggregate.
    Merged,
    /// Consume a previously reserved resource by its id.
    Reserved { resource_id: String },
}

/// A desired value for one named resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceRequirement {
    pub name: String,
    pub value: Value,
    pub kind: RequirementKind,
}

/// Specification a step is built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepSpec {
    pub name: String,
    pub requirements: Vec<ResourceRequirement>,
}

// ── Element trait ──────────────────────────────────────────────────

/// Common queries over nodes of the plan tree.
pub trait Element {
    fn id(&self) -> &str;

    fn name(&self) -> &str;

    /// Whether this node itself carries the interruption flag.
    fn is_interrupted(&self) -> bool;

    /// Whether this node or any descendant is interrupted.
    fn any_interrupted(&self) -> bool;

    /// Status as seen by aggregation queries. Never writes back to any
    /// stored status.
    fn observed_status(&self) -> ObservedStatus;

    fn is_complete(&self) -> bool {
        self.observed_status() == ObservedStatus::Complete
    }
}

// ── Step ───────────────────────────────────────────────────────────

/// A leaf unit of work. The only node kind that stores a [`Status`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    id: String,
    name: String,
    status: Status,
    interrupted: bool,
    requirements: Vec<ResourceRequirement>,
    /// Construction-time errors; non-empty iff status is `Error`.
    errors: Vec<String>,
}

impl Step {
    /// Build a step from its spec, starting `Pending`.
    pub fn new(id: impl Into<String>, spec: StepSpec) -> Self {
        Self {
            id: id.into(),
            name: spec.name,
            status: Status::Pending,
            interrupted: false,
            requirements: spec.requirements,
            errors: Vec::new(),
        }
    }

    /// Rebuild a step against an updated spec.
    ///
    /// Changing an immutable requirement attribute — the value kind of a
    /// same-named requirement, its consumption kind, or the value of an
    /// atomic requirement — is illegal: the step is constructed in
    /// `Status::Error` with the violations listed in [`Step::errors`],
    /// and needs operator intervention rather than a scheduler retry.
    pub fn reconfigured(id: impl Into<String>, previous: &StepSpec, next: StepSpec) -> Self {
        let errors = immutable_violations(previous, &next);
        let status = if errors.is_empty() {
            Status::Pending
        } else {
            warn!(
                step = %next.name,
                violations = errors.len(),
                "illegal spec change, step constructed in error state"
            );
            Status::Error
        };
        Self {
            id: id.into(),
            name: next.name,
            status,
            interrupted: false,
            requirements: next.requirements,
            errors,
        }
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn requirements(&self) -> &[ResourceRequirement] {
        &self.requirements
    }

    /// Transition the stored status, enforcing the transition table.
    ///
    /// An illegal target is rejected and the stored value is untouched.
    pub fn transition(&mut self, next: Status) -> PlanResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(PlanError::IllegalTransition {
                from: self.status,
                to: next,
            });
        }
        debug!(step = %self.name, from = ?self.status, to = ?next, "status transition");
        self.status = next;
        Ok(())
    }

    pub fn interrupt(&mut self) {
        self.interrupted = true;
    }

    pub fn proceed(&mut self) {
        self.interrupted = false;
    }
}

impl Element for Step {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    fn any_interrupted(&self) -> bool {
        self.interrupted
    }

    fn observed_status(&self) -> ObservedStatus {
        if self.interrupted {
            ObservedStatus::Waiting
        } else {
            self.status.into()
        }
    }
}

// ── Phase ──────────────────────────────────────────────────────────

/// An ordered group of steps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    id: String,
    name: String,
    interrupted: bool,
    steps: Vec<Step>,
}

impl Phase {
    pub fn new(id: impl Into<String>, name: impl Into<String>, steps: Vec<Step>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            interrupted: false,
            steps,
        }
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn steps_mut(&mut self) -> &mut [Step] {
        &mut self.steps
    }

    pub fn interrupt(&mut self) {
        self.interrupted = true;
    }

    pub fn proceed(&mut self) {
        self.interrupted = false;
    }
}

impl Element for Phase {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    fn any_interrupted(&self) -> bool {
        self.interrupted || self.steps.iter().any(Element::any_interrupted)
    }

    fn observed_status(&self) -> ObservedStatus {
        aggregate(self.interrupted, &self.steps)
    }
}

// ── Plan ───────────────────────────────────────────────────────────

/// The root of the hierarchy: an ordered group of phases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    id: String,
    name: String,
    interrupted: bool,
    phases: Vec<Phase>,
}

impl Plan {
    pub fn new(id: impl Into<String>, name: impl Into<String>, phases: Vec<Phase>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            interrupted: false,
            phases,
        }
    }

    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    pub fn phases_mut(&mut self) -> &mut [Phase] {
        &mut self.phases
    }

    pub fn interrupt(&mut self) {
        self.interrupted = true;
    }

    pub fn proceed(&mut self) {
        self.interrupted = false;
    }
}

impl Element for Plan {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_interrupted(&self) -> bool {
        self.interrupted
    }

    fn any_interrupted(&self) -> bool {
        self.interrupted || self.phases.iter().any(Element::any_interrupted)
    }

    fn observed_status(&self) -> ObservedStatus {
        aggregate(self.interrupted, &self.phases)
    }
}

// ── Aggregation ────────────────────────────────────────────────────

/// Composite status over an ordered set of children. Query-only.
///
/// Precedence: interruption anywhere in the subtree observes `Waiting`;
/// partial completion observes `InProgress`; then all-complete, any
/// error, and finally the least-progressed live child.
fn aggregate<E: Element>(interrupted: bool, children: &[E]) -> ObservedStatus {
    if interrupted || children.iter().any(Element::any_interrupted) {
        return ObservedStatus::Waiting;
    }

    let observed: Vec<ObservedStatus> = children.iter().map(Element::observed_status).collect();
    if observed.is_empty() {
        return ObservedStatus::Complete;
    }

    let complete = observed
        .iter()
        .filter(|s| **s == ObservedStatus::Complete)
        .count();
    let advancing = observed
        .iter()
        .any(|s| !matches!(s, ObservedStatus::Complete | ObservedStatus::Error));

    if observed.contains(&ObservedStatus::InProgress) || (complete > 0 && advancing) {
        return ObservedStatus::InProgress;
    }
    if complete == observed.len() {
        return ObservedStatus::Complete;
    }
    if observed.contains(&ObservedStatus::Error) {
        return ObservedStatus::Error;
    }

    // Remaining children are all in live storable states; report the
    // least-progressed one.
    observed
        .into_iter()
        .min_by_key(|s| progress_rank(*s))
        .unwrap_or(ObservedStatus::Complete)
}

/// Progress ordering for the least-progressed-child fallback. `Delayed`
/// ranks below `Pending`: a delayed step still owes a launch retry.
fn progress_rank(status: ObservedStatus) -> u8 {
    match status {
        ObservedStatus::Delayed => 0,
        ObservedStatus::Pending => 1,
        ObservedStatus::Prepared => 2,
        ObservedStatus::Starting => 3,
        ObservedStatus::Started => 4,
        // Filtered out before ranking.
        _ => u8::MAX,
    }
}

/// Immutable-attribute violations between two specs, matched by
/// requirement name.
fn immutable_violations(previous: &StepSpec, next: &StepSpec) -> Vec<String> {
    let mut errors = Vec::new();
    for requirement in &next.requirements {
        let Some(prior) = previous
            .requirements
            .iter()
            .find(|p| p.name == requirement.name)
        else {
            continue;
        };
        if prior.value.kind() != requirement.value.kind() {
            errors.push(format!(
                "requirement '{}' changed value kind from {} to {}",
                requirement.name,
                prior.value.kind(),
                requirement.value.kind()
            ));
            continue;
        }
        if prior.kind != requirement.kind {
            errors.push(format!(
                "requirement '{}' changed consumption kind",
                requirement.name
            ));
            continue;
        }
        if matches!(prior.kind, RequirementKind::Atomic) && prior.value != requirement.value {
            errors.push(format!(
                "atomic requirement '{}' cannot change value",
                requirement.name
            ));
        }
    }
    errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridloom_offer::Value;

    fn cpu_spec(name: &str) -> StepSpec {
        StepSpec {
            name: name.to_string(),
            requirements: vec![ResourceRequirement {
                name: "cpus".to_string(),
                value: Value::scalar(1.0),
                kind: RequirementKind::Merged,
            }],
        }
    }

    /// Drive a fresh step to the given status through legal transitions.
    fn step_with(status: Status) -> Step {
        let mut step = Step::new("step-1", cpu_spec("node"));
        let path: &[Status] = match status {
            Status::Pending => &[],
            Status::Delayed => &[Status::Delayed],
            Status::Prepared => &[Status::Prepared],
            Status::Starting => &[Status::Prepared, Status::Starting],
            Status::Started => &[Status::Prepared, Status::Starting, Status::Started],
            Status::Complete => &[
                Status::Prepared,
                Status::Starting,
                Status::Started,
                Status::Complete,
            ],
            Status::Error => panic!("use reconfigured() for error steps"),
        };
        for next in path {
            step.transition(*next).unwrap();
        }
        step
    }

    fn error_step() -> Step {
        let previous = cpu_spec("node");
        let mut next = cpu_spec("node");
        next.requirements[0].value = Value::ranges([(1, 4)]);
        Step::reconfigured("step-1", &previous, next)
    }

    fn phase_of(steps: Vec<Step>) -> Phase {
        Phase::new("phase-1", "deploy", steps)
    }

    #[test]
    fn new_step_is_pending() {
        let step = Step::new("step-1", cpu_spec("node"));
        assert_eq!(step.status(), Status::Pending);
        assert!(step.errors().is_empty());
        assert!(!step.is_interrupted());
    }

    #[test]
    fn illegal_transition_is_rejected_and_state_kept() {
        let mut step = step_with(Status::Complete);

        let result = step.transition(Status::Pending);
        assert!(matches!(
            result,
            Err(PlanError::IllegalTransition {
                from: Status::Complete,
                to: Status::Pending,
            })
        ));
        assert_eq!(step.status(), Status::Complete);
    }

    #[test]
    fn launch_failure_backoff_round_trip() {
        let mut step = Step::new("step-1", cpu_spec("node"));

        step.transition(Status::Delayed).unwrap();
        assert_eq!(step.status(), Status::Delayed);
        assert!(!step.status().is_running());

        step.transition(Status::Pending).unwrap();
        assert_eq!(step.status(), Status::Pending);
    }

    #[test]
    fn interrupted_step_observes_waiting_without_touching_stored_status() {
        let mut step = step_with(Status::Starting);

        step.interrupt();
        assert_eq!(step.observed_status(), ObservedStatus::Waiting);
        assert_eq!(step.status(), Status::Starting);

        step.proceed();
        assert_eq!(step.observed_status(), ObservedStatus::Starting);
    }

    #[test]
    fn reconfigured_with_kind_change_is_an_error_step() {
        let step = error_step();

        assert_eq!(step.status(), Status::Error);
        assert_eq!(step.errors().len(), 1);
        assert!(step.errors()[0].contains("cpus"));
    }

    #[test]
    fn reconfigured_atomic_value_change_is_an_error_step() {
        let previous = StepSpec {
            name: "node".to_string(),
            requirements: vec![ResourceRequirement {
                name: "disk".to_string(),
                value: Value::scalar(1000.0),
                kind: RequirementKind::Atomic,
            }],
        };
        let mut next = previous.clone();
        next.requirements[0].value = Value::scalar(2000.0);

        let step = Step::reconfigured("step-1", &previous, next);
        assert_eq!(step.status(), Status::Error);
    }

    #[test]
    fn reconfigured_merged_value_change_is_legal() {
        let previous = cpu_spec("node");
        let mut next = cpu_spec("node");
        next.requirements[0].value = Value::scalar(2.0);

        let step = Step::reconfigured("step-1", &previous, next);
        assert_eq!(step.status(), Status::Pending);
        assert!(step.errors().is_empty());
    }

    #[test]
    fn reconfigured_consumption_kind_change_is_an_error_step() {
        let previous = cpu_spec("node");
        let mut next = cpu_spec("node");
        next.requirements[0].kind = RequirementKind::Reserved {
            resource_id: "res-1".to_string(),
        };

        let step = Step::reconfigured("step-1", &previous, next);
        assert_eq!(step.status(), Status::Error);
    }

    #[test]
    fn empty_phase_observes_complete() {
        let phase = phase_of(Vec::new());
        assert_eq!(phase.observed_status(), ObservedStatus::Complete);
    }

    #[test]
    fn all_complete_observes_complete() {
        let phase = phase_of(vec![step_with(Status::Complete), step_with(Status::Complete)]);
        assert_eq!(phase.observed_status(), ObservedStatus::Complete);
        assert!(phase.is_complete());
    }

    #[test]
    fn partial_completion_observes_in_progress() {
        let phase = phase_of(vec![step_with(Status::Complete), step_with(Status::Pending)]);
        assert_eq!(phase.observed_status(), ObservedStatus::InProgress);
        assert!(phase.observed_status().is_running());
    }

    #[test]
    fn error_child_with_rest_complete_observes_error() {
        let phase = phase_of(vec![step_with(Status::Complete), error_step()]);
        assert_eq!(phase.observed_status(), ObservedStatus::Error);
    }

    #[test]
    fn least_progressed_child_wins_without_completion() {
        let phase = phase_of(vec![step_with(Status::Started), step_with(Status::Starting)]);
        assert_eq!(phase.observed_status(), ObservedStatus::Starting);
    }

    #[test]
    fn delayed_ranks_below_pending() {
        let phase = phase_of(vec![step_with(Status::Pending), step_with(Status::Delayed)]);
        assert_eq!(phase.observed_status(), ObservedStatus::Delayed);
    }

    #[test]
    fn interruption_anywhere_overlays_waiting() {
        let mut interrupted = step_with(Status::Started);
        interrupted.interrupt();

        let plan = Plan::new(
            "plan-1",
            "deploy",
            vec![
                phase_of(vec![step_with(Status::Complete)]),
                Phase::new("phase-2", "rollout", vec![step_with(Status::Pending), interrupted]),
            ],
        );

        assert_eq!(plan.observed_status(), ObservedStatus::Waiting);
        // Stored statuses are untouched by the overlay.
        assert_eq!(plan.phases()[1].steps()[1].status(), Status::Started);
    }

    #[test]
    fn phase_level_interruption_overlays_waiting() {
        let mut phase = phase_of(vec![step_with(Status::Pending)]);
        phase.interrupt();

        let plan = Plan::new("plan-1", "deploy", vec![phase]);
        assert_eq!(plan.observed_status(), ObservedStatus::Waiting);

        let plan_phase = &plan.phases()[0];
        assert!(plan_phase.is_interrupted());
    }

    #[test]
    fn plan_aggregates_phase_observations() {
        let plan = Plan::new(
            "plan-1",
            "deploy",
            vec![
                phase_of(vec![step_with(Status::Complete)]),
                Phase::new("phase-2", "rollout", vec![step_with(Status::Pending)]),
            ],
        );

        // One phase observes Complete, the other Pending.
        assert_eq!(plan.observed_status(), ObservedStatus::InProgress);
    }

    #[test]
    fn all_pending_plan_observes_pending() {
        let plan = Plan::new(
            "plan-1",
            "deploy",
            vec![
                phase_of(vec![step_with(Status::Pending)]),
                Phase::new("phase-2", "rollout", vec![step_with(Status::Pending)]),
            ],
        );

        assert_eq!(plan.observed_status(), ObservedStatus::Pending);
    }

    #[test]
    fn step_serializes_roundtrip() {
        let step = step_with(Status::Prepared);
        let json = serde_json::to_string(&step).unwrap();
        let back: Step = serde_json::from_str(&json).unwrap();
        assert_eq!(back, step);
    }
}
