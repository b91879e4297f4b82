//! Type definitions for the RunWorkflow use case.

use crate::use_cases::dispatch_tool::DispatchOutcome;
use crate::use_cases::refine_parameters::RefinedDecision;
use stepwise_domain::{PlanDecision, TerminationReason, WorkflowError, WorkflowState};
use thiserror::Error;

/// Errors raised before a run starts or when its task dies.
///
/// Everything that happens during a run ends up in the
/// [`WorkflowResult`](stepwise_domain::WorkflowResult) instead.
#[derive(Error, Debug)]
pub enum RunWorkflowError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Workflow task failed: {0}")]
    TaskFailed(String),
}

/// Input for one workflow run
#[derive(Debug, Clone)]
pub struct RunWorkflowInput {
    pub query: String,
    /// Overrides the configured step budget for this run
    pub max_steps: Option<usize>,
}

impl RunWorkflowInput {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            max_steps: None,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}

/// Controller stage. Each variant carries what the next transition needs.
pub(super) enum Stage {
    Planning,
    Refining(PlanDecision),
    Dispatching(RefinedDecision),
    Evaluating {
        refined: RefinedDecision,
        outcome: DispatchOutcome,
    },
    Finished {
        reason: TerminationReason,
        cause: Option<WorkflowError>,
    },
}

impl Stage {
    pub(super) fn finished(reason: TerminationReason, cause: Option<WorkflowError>) -> Self {
        Stage::Finished { reason, cause }
    }

    pub(super) fn failed(cause: WorkflowError) -> Self {
        Stage::finished(TerminationReason::Failed, Some(cause))
    }

    pub(super) fn state(&self) -> WorkflowState {
        match self {
            Stage::Planning => WorkflowState::Planning,
            Stage::Refining(_) => WorkflowState::Refining,
            Stage::Dispatching(_) => WorkflowState::Dispatching,
            Stage::Evaluating { .. } => WorkflowState::Evaluating,
            Stage::Finished { reason, .. } => WorkflowState::Terminated(*reason),
        }
    }
}
