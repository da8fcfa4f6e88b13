//! Step gating: which wizard steps are reachable from the active one.
//!
//! Completed steps can always be revisited and the wizard may move exactly
//! one step past the active step, never further. The rule is recomputed from
//! the active step on every call.

use crate::model::PipelineStep;

pub fn can_enter(active: PipelineStep, requested: PipelineStep) -> bool {
    requested.index() <= active.index() + 1
}

pub fn enterable_steps(active: PipelineStep) -> Vec<PipelineStep> {
    PipelineStep::ALL
        .into_iter()
        .filter(|s| can_enter(active, *s))
        .collect()
}
