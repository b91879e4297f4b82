//! Workflow error kinds

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can stop or shape a workflow run.
///
/// `OracleUnavailable` and `MalformedPlan` are absorbed by the planner into a
/// fallback decision; the controller only terminates on the others.
/// `LoopDetected` and `BudgetExceeded` describe best-effort stops rather than
/// failures.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkflowError {
    #[error("Reasoning oracle unavailable: {message}")]
    OracleUnavailable { message: String },

    #[error("Oracle output could not be decoded: {reason}")]
    MalformedPlan { reason: String },

    #[error("No usable service: {message}")]
    UnknownService { message: String },

    #[error("Service '{service}' has no tool '{tool}'")]
    UnknownTool { service: String, tool: String },

    #[error("Step {step} failed: {message}")]
    ToolDispatchFailure { step: usize, message: String },

    #[error("Planner repeated {service}/{tool}")]
    LoopDetected { service: String, tool: String },

    #[error("Step budget of {max_steps} exhausted")]
    BudgetExceeded { max_steps: usize },

    #[error("Workflow cancelled")]
    Cancelled,
}

impl WorkflowError {
    pub fn unknown_service(message: impl Into<String>) -> Self {
        Self::UnknownService {
            message: message.into(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
