//! Workflow value objects: states, termination reasons, plan decisions and
//! the thinking-pass judgment.

use super::entities::StepRecord;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Terminal outcome of a workflow run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationReason {
    Done,
    Failed,
    LoopDetected,
    BudgetExceeded,
}

impl TerminationReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            TerminationReason::Done => "DONE",
            TerminationReason::Failed => "FAILED",
            TerminationReason::LoopDetected => "LOOP_DETECTED",
            TerminationReason::BudgetExceeded => "BUDGET_EXCEEDED",
        }
    }

    /// Best-effort stops that still count as success when every step succeeded
    pub fn is_best_effort(&self) -> bool {
        matches!(
            self,
            TerminationReason::LoopDetected | TerminationReason::BudgetExceeded
        )
    }
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Controller state, as reported to observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", content = "reason", rename_all = "snake_case")]
pub enum WorkflowState {
    Planning,
    Refining,
    Dispatching,
    Evaluating,
    Terminated(TerminationReason),
}

impl WorkflowState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkflowState::Terminated(_))
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowState::Planning => f.write_str("PLANNING"),
            WorkflowState::Refining => f.write_str("REFINING"),
            WorkflowState::Dispatching => f.write_str("DISPATCHING"),
            WorkflowState::Evaluating => f.write_str("EVALUATING"),
            WorkflowState::Terminated(reason) => write!(f, "{}", reason),
        }
    }
}

/// Where a plan decision came from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DecisionSource {
    Oracle,
    /// Produced by the named fallback rule
    Fallback { rule: String },
}

impl DecisionSource {
    pub fn is_fallback(&self) -> bool {
        matches!(self, DecisionSource::Fallback { .. })
    }
}

/// The next action chosen by the planner. Produced fresh each step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanDecision {
    pub service: String,
    pub tool: String,
    pub parameters: Map<String, Value>,
    pub reasoning: String,
    /// Oracle signal that no further steps are needed after this one
    pub completion: bool,
    /// Why the oracle decision was unusable, when this is a fallback
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_failure: Option<String>,
    pub source: DecisionSource,
}

impl PlanDecision {
    pub fn new(service: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            tool: tool.into(),
            parameters: Map::new(),
            reasoning: String::new(),
            completion: false,
            raw_failure: None,
            source: DecisionSource::Oracle,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }

    pub fn with_completion(mut self, completion: bool) -> Self {
        self.completion = completion;
        self
    }

    pub fn with_raw_failure(mut self, failure: impl Into<String>) -> Self {
        self.raw_failure = Some(failure.into());
        self
    }

    pub fn from_rule(mut self, rule: impl Into<String>) -> Self {
        self.source = DecisionSource::Fallback { rule: rule.into() };
        self
    }

    /// Same decision with a different parameter mapping.
    ///
    /// This is the only way refinement touches a decision, so service, tool
    /// and completion survive it unchanged.
    pub fn with_parameters(&self, parameters: Map<String, Value>) -> Self {
        Self {
            parameters,
            ..self.clone()
        }
    }

    /// True when this decision targets the same (service, tool) as `step`
    pub fn repeats(&self, step: &StepRecord) -> bool {
        self.service == step.service && self.tool == step.tool
    }
}

/// Query category reported by the thinking pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", from = "String")]
pub enum QueryCategory {
    PersonalRecommendation,
    GeneralSearch,
    UpdateRequest,
    #[default]
    Unknown,
}

impl QueryCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryCategory::PersonalRecommendation => "personal_recommendation",
            QueryCategory::GeneralSearch => "general_search",
            QueryCategory::UpdateRequest => "update_request",
            QueryCategory::Unknown => "unknown",
        }
    }
}

impl From<String> for QueryCategory {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "personal_recommendation" => QueryCategory::PersonalRecommendation,
            "general_search" => QueryCategory::GeneralSearch,
            "update_request" => QueryCategory::UpdateRequest,
            _ => QueryCategory::Unknown,
        }
    }
}

/// Structured output of the thinking pass
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ThinkingJudgment {
    #[serde(alias = "query_type")]
    pub query_category: QueryCategory,
    pub user_mentioned: Option<String>,
    pub needs_user_context: bool,
    pub thought_process: String,
    pub recommended_approach: String,
}

impl ThinkingJudgment {
    /// Judgment used when the thinking pass fails
    pub fn neutral(reason: impl Into<String>) -> Self {
        Self {
            thought_process: reason.into(),
            ..Default::default()
        }
    }
}
