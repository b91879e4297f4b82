//! Workflow progress port.
//!
//! [`WorkflowProgressNotifier`] is an **output port** that the presentation
//! layer implements to display a run as it happens. All callback argument
//! types come from the domain layer.
//!
//! All methods have default no-op implementations, so implementers only need
//! to override the callbacks they care about.

use stepwise_domain::{
    PlanDecision, StepRecord, ThinkingJudgment, WorkflowResult, WorkflowState,
};

pub trait WorkflowProgressNotifier: Send + Sync {
    /// Called on every controller state transition
    fn on_state_change(&self, _state: WorkflowState) {}

    /// Called after the thinking pass (neutral judgment on failure)
    fn on_thinking(&self, _judgment: &ThinkingJudgment) {}

    /// Called when the planner settles on a decision
    fn on_decision(&self, _decision: &PlanDecision) {}

    /// Called when the oracle decision was unusable and a fallback rule fired
    fn on_fallback(&self, _rule: &str, _reason: &str) {}

    /// Called after parameter refinement
    fn on_refined(&self, _decision: &PlanDecision, _rationale: &str) {}

    /// Called right before a tool call goes out
    fn on_dispatch_start(&self, _step: usize, _service: &str, _tool: &str) {}

    /// Called once a step record has been appended
    fn on_step_recorded(&self, _record: &StepRecord) {}

    /// Called once with the terminal result
    fn on_finished(&self, _result: &WorkflowResult) {}
}

/// No-op implementation
pub struct NoWorkflowProgress;

impl WorkflowProgressNotifier for NoWorkflowProgress {}
