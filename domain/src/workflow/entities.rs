//! Workflow entities: step records, the per-run context and the final result

use super::error::WorkflowError;
use super::summary::StepSummary;
use super::value_objects::{PlanDecision, TerminationReason, ThinkingJudgment};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Normalized result of one tool dispatch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepOutcome {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StepOutcome {
    pub fn success(payload: Value) -> Self {
        Self {
            success: true,
            payload: Some(payload),
            error: None,
        }
    }

    /// A failure, keeping whatever body the service returned
    pub fn failure(error: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            success: false,
            payload,
            error: Some(error.into()),
        }
    }
}

/// One executed action and its outcome. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// 1-based position in the run
    pub index: usize,
    pub service: String,
    pub tool: String,
    /// Parameters actually sent (post-refinement, post-coercion)
    pub parameters: Map<String, Value>,
    pub outcome: StepOutcome,
    pub reasoning: String,
    #[serde(default)]
    pub refinement: String,
    pub duration_ms: u64,
}

impl StepRecord {
    pub fn succeeded(&self) -> bool {
        self.outcome.success
    }

    pub fn summary(&self) -> StepSummary {
        StepSummary::of(self)
    }
}

/// Per-query state: the original query and an append-only step list.
///
/// Steps are private so the only way to grow the history is
/// [`WorkflowContext::record_step`], which assigns indices in order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowContext {
    query: String,
    steps: Vec<StepRecord>,
}

impl WorkflowContext {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            steps: Vec::new(),
        }
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn last(&self) -> Option<&StepRecord> {
        self.steps.last()
    }

    /// Append the record for an executed decision and return it
    pub fn record_step(
        &mut self,
        decision: &PlanDecision,
        outcome: StepOutcome,
        refinement: impl Into<String>,
        duration_ms: u64,
    ) -> &StepRecord {
        let record = StepRecord {
            index: self.steps.len() + 1,
            service: decision.service.clone(),
            tool: decision.tool.clone(),
            parameters: decision.parameters.clone(),
            outcome,
            reasoning: decision.reasoning.clone(),
            refinement: refinement.into(),
            duration_ms,
        };
        self.steps.push(record);
        &self.steps[self.steps.len() - 1]
    }

    /// Bounded per-step summaries for planning prompts
    pub fn summaries(&self) -> Vec<StepSummary> {
        self.steps.iter().map(StepSummary::of).collect()
    }

    /// Full payload history, reserved for parameter refinement
    pub fn full_history(&self) -> Value {
        Value::Array(
            self.steps
                .iter()
                .map(|step| {
                    json!({
                        "step": step.index,
                        "service": step.service,
                        "tool": step.tool,
                        "parameters": step.parameters,
                        "success": step.outcome.success,
                        "result": step.outcome.payload,
                        "error": step.outcome.error,
                    })
                })
                .collect(),
        )
    }

    pub fn all_succeeded(&self) -> bool {
        self.steps.iter().all(StepRecord::succeeded)
    }

    pub fn into_steps(self) -> Vec<StepRecord> {
        self.steps
    }
}

/// What the caller gets back: one terminal status plus the full trace
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowResult {
    pub query: String,
    pub success: bool,
    pub termination: TerminationReason,
    pub steps: Vec<StepRecord>,
    /// Typed cause for `FAILED` runs and best-effort stops
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_cause: Option<WorkflowError>,
    /// Last thinking-pass judgment, for diagnostics
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thinking: Option<ThinkingJudgment>,
}

impl WorkflowResult {
    pub fn from_context(
        context: WorkflowContext,
        termination: TerminationReason,
        stop_cause: Option<WorkflowError>,
        thinking: Option<ThinkingJudgment>,
    ) -> Self {
        let success = termination != TerminationReason::Failed && context.all_succeeded();
        let query = context.query.clone();
        Self {
            query,
            success,
            termination,
            steps: context.into_steps(),
            stop_cause,
            thinking,
        }
    }

    /// Payload of the last successful step, if any
    pub fn final_payload(&self) -> Option<&Value> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.succeeded())
            .and_then(|s| s.outcome.payload.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(service: &str, tool: &str) -> PlanDecision {
        PlanDecision::new(service, tool).with_param("query", "sql")
    }

    #[test]
    fn test_record_step_assigns_sequential_indices() {
        let mut context = WorkflowContext::new("List database workshops");
        context.record_step(
            &decision("nl_query", "query_database_nl"),
            StepOutcome::success(json!({"success": true})),
            "",
            12,
        );
        let second = context.record_step(
            &decision("semantic_search", "search_livelabs_workshops"),
            StepOutcome::success(json!({"results": []})),
            "kept",
            30,
        );
        assert_eq!(second.index, 2);
        assert_eq!(context.len(), 2);
        assert_eq!(context.steps()[0].index, 1);
        assert_eq!(context.last().unwrap().refinement, "kept");
    }

    #[test]
    fn test_full_history_carries_payloads() {
        let mut context = WorkflowContext::new("q");
        context.record_step(
            &decision("nl_query", "query_database_nl"),
            StepOutcome::success(json!({"results": [{"skills": ["SQL"]}]})),
            "",
            5,
        );
        let history = context.full_history();
        assert_eq!(history[0]["result"]["results"][0]["skills"][0], "SQL");
        assert_eq!(history[0]["step"], 1);
    }

    #[test]
    fn test_result_success_rules() {
        let mut context = WorkflowContext::new("q");
        context.record_step(
            &decision("a", "t"),
            StepOutcome::success(json!({})),
            "",
            1,
        );
        let result = WorkflowResult::from_context(
            context.clone(),
            TerminationReason::LoopDetected,
            None,
            None,
        );
        assert!(result.success);

        let result =
            WorkflowResult::from_context(context, TerminationReason::Failed, None, None);
        assert!(!result.success);
    }

    #[test]
    fn test_failed_step_makes_best_effort_stop_unsuccessful() {
        let mut context = WorkflowContext::new("q");
        context.record_step(
            &decision("a", "t"),
            StepOutcome::failure("HTTP 500: boom", None),
            "",
            1,
        );
        let result = WorkflowResult::from_context(
            context,
            TerminationReason::BudgetExceeded,
            None,
            None,
        );
        assert!(!result.success);
        assert!(result.final_payload().is_none());
    }
}
