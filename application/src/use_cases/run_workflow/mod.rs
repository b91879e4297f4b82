//! Run Workflow use case
//!
//! Drives one query through the controller state machine:
//!
//! | State       | Next                                                        |
//! |-------------|-------------------------------------------------------------|
//! | Planning    | Refining, or LoopDetected / Failed                          |
//! | Refining    | Dispatching, or Failed (cancellation only)                  |
//! | Dispatching | Evaluating, or Failed (cancellation only)                   |
//! | Evaluating  | Planning, or Done / Failed / BudgetExceeded                 |
//!
//! Steps run strictly one after another; independent runs share nothing but
//! the capability catalog.

mod runner;
mod types;

pub use runner::{WorkflowHandle, WorkflowRunner};
pub use types::{RunWorkflowError, RunWorkflowInput};

use types::Stage;

use crate::catalog::CapabilityCatalog;
use crate::config::WorkflowParams;
use crate::oracle::OracleClient;
use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use crate::ports::oracle_gateway::OracleGateway;
use crate::ports::service_transport::ServiceTransport;
use crate::ports::workflow_progress::{NoWorkflowProgress, WorkflowProgressNotifier};
use crate::use_cases::dispatch_tool::{DispatchOutcome, ToolDispatcher};
use crate::use_cases::plan_step::{PlannedStep, StepPlanner};
use crate::use_cases::refine_parameters::{ParameterRefiner, RefinedDecision};
use serde_json::json;
use std::sync::Arc;
use stepwise_domain::{
    PlanDecision, TerminationReason, ThinkingJudgment, WorkflowContext, WorkflowError,
    WorkflowResult,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Use case for resolving one query as a sequence of tool calls
#[derive(Clone)]
pub struct RunWorkflowUseCase {
    planner: Arc<StepPlanner>,
    refiner: Arc<ParameterRefiner>,
    dispatcher: Arc<ToolDispatcher>,
    conversation_logger: Arc<dyn ConversationLogger>,
    max_steps: usize,
    cancellation_token: Option<CancellationToken>,
}

impl RunWorkflowUseCase {
    pub fn new(
        catalog: Arc<CapabilityCatalog>,
        gateway: Arc<dyn OracleGateway>,
        transport: Arc<dyn ServiceTransport>,
        conversation_logger: Arc<dyn ConversationLogger>,
        params: WorkflowParams,
    ) -> Self {
        let oracle = Arc::new(
            OracleClient::new(gateway, conversation_logger.clone())
                .with_max_repair_attempts(params.max_repair_attempts)
                .with_repair_max_tokens(params.repair_max_tokens),
        );
        let planner = StepPlanner::new(
            catalog.clone(),
            oracle.clone(),
            conversation_logger.clone(),
            params.clone(),
        );
        let refiner = ParameterRefiner::new(catalog.clone(), oracle, params.clone());
        let dispatcher =
            ToolDispatcher::new(catalog, transport).with_tool_timeout(params.tool_timeout);

        Self {
            planner: Arc::new(planner),
            refiner: Arc::new(refiner),
            dispatcher: Arc::new(dispatcher),
            conversation_logger,
            max_steps: params.max_steps,
            cancellation_token: None,
        }
    }

    /// Set a cancellation token for graceful interruption
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    pub async fn execute(&self, input: RunWorkflowInput) -> Result<WorkflowResult, RunWorkflowError> {
        self.execute_with_progress(input, &NoWorkflowProgress).await
    }

    pub async fn execute_with_progress(
        &self,
        input: RunWorkflowInput,
        progress: &dyn WorkflowProgressNotifier,
    ) -> Result<WorkflowResult, RunWorkflowError> {
        let query = input.query.trim();
        if query.is_empty() {
            return Err(RunWorkflowError::InvalidInput("query is empty".to_string()));
        }
        let max_steps = input.max_steps.unwrap_or(self.max_steps);
        if max_steps == 0 {
            return Err(RunWorkflowError::InvalidInput(
                "max_steps must be at least 1".to_string(),
            ));
        }

        let cancel = self.cancellation_token.clone().unwrap_or_default();
        info!("Starting workflow (max {} steps): {}", max_steps, query);
        self.conversation_logger.log(ConversationEvent::new(
            "workflow_started",
            json!({"query": query, "max_steps": max_steps}),
        ));

        let mut context = WorkflowContext::new(query);
        let mut thinking: Option<ThinkingJudgment> = None;
        let mut stage = Stage::Planning;

        let (reason, cause) = loop {
            let state = stage.state();
            debug!("Workflow state: {} (steps so far: {})", state, context.len());
            progress.on_state_change(state);
            self.conversation_logger.log(ConversationEvent::new(
                "state_transition",
                json!({"state": state, "steps": context.len()}),
            ));

            stage = match stage {
                Stage::Planning => self.plan(&context, progress, &cancel, &mut thinking).await,
                Stage::Refining(decision) => self.refine(decision, &context, progress, &cancel).await,
                Stage::Dispatching(refined) => {
                    self.dispatch(refined, context.len() + 1, progress, &cancel)
                        .await
                }
                Stage::Evaluating { refined, outcome } => {
                    self.evaluate(&mut context, refined, outcome, max_steps, progress)
                }
                Stage::Finished { reason, cause } => break (reason, cause),
            };
        };

        let result = WorkflowResult::from_context(context, reason, cause, thinking);
        match &result.stop_cause {
            Some(cause) if result.termination == TerminationReason::Failed => {
                warn!("Workflow failed after {} steps: {}", result.steps.len(), cause)
            }
            _ => info!(
                "Workflow finished: {} after {} steps (success: {})",
                result.termination,
                result.steps.len(),
                result.success
            ),
        }
        self.conversation_logger.log(ConversationEvent::new(
            "workflow_finished",
            json!({
                "success": result.success,
                "termination": result.termination,
                "steps": result.steps.len(),
                "stop_cause": result.stop_cause,
            }),
        ));
        progress.on_finished(&result);

        Ok(result)
    }

    async fn plan(
        &self,
        context: &WorkflowContext,
        progress: &dyn WorkflowProgressNotifier,
        cancel: &CancellationToken,
        thinking: &mut Option<ThinkingJudgment>,
    ) -> Stage {
        let PlannedStep {
            decision,
            thinking: judgment,
        } = match self.planner.plan(context, progress, cancel).await {
            Ok(planned) => planned,
            Err(e) => return Stage::failed(e),
        };
        *thinking = Some(judgment);

        if let Some(last) = context.last()
            && decision.repeats(last)
        {
            warn!(
                "Planner repeated {}/{} from step {}, stopping",
                decision.service, decision.tool, last.index
            );
            return Stage::finished(
                TerminationReason::LoopDetected,
                Some(WorkflowError::LoopDetected {
                    service: decision.service,
                    tool: decision.tool,
                }),
            );
        }
        Stage::Refining(decision)
    }

    async fn refine(
        &self,
        decision: PlanDecision,
        context: &WorkflowContext,
        progress: &dyn WorkflowProgressNotifier,
        cancel: &CancellationToken,
    ) -> Stage {
        match self.refiner.refine(&decision, context, cancel).await {
            Ok(refined) => {
                progress.on_refined(&refined.decision, &refined.rationale);
                Stage::Dispatching(refined)
            }
            Err(e) => Stage::failed(e),
        }
    }

    async fn dispatch(
        &self,
        refined: RefinedDecision,
        step: usize,
        progress: &dyn WorkflowProgressNotifier,
        cancel: &CancellationToken,
    ) -> Stage {
        let decision = &refined.decision;
        progress.on_dispatch_start(step, &decision.service, &decision.tool);

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            outcome = self.dispatcher.invoke(&decision.service, &decision.tool, &decision.parameters) => Some(outcome),
        };
        match outcome {
            Some(outcome) => Stage::Evaluating { refined, outcome },
            None => Stage::failed(WorkflowError::Cancelled),
        }
    }

    fn evaluate(
        &self,
        context: &mut WorkflowContext,
        refined: RefinedDecision,
        outcome: DispatchOutcome,
        max_steps: usize,
        progress: &dyn WorkflowProgressNotifier,
    ) -> Stage {
        // The record keeps what was actually sent
        let decision = refined
            .decision
            .with_parameters(outcome.sent_parameters.clone());
        let record = context.record_step(
            &decision,
            outcome.to_step_outcome(),
            refined.rationale,
            outcome.duration_ms,
        );
        progress.on_step_recorded(record);
        self.conversation_logger
            .log(ConversationEvent::new("step_recorded", json!(record)));

        if !record.succeeded() {
            return Stage::failed(WorkflowError::ToolDispatchFailure {
                step: record.index,
                message: record
                    .outcome
                    .error
                    .clone()
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        if decision.completion {
            return Stage::finished(TerminationReason::Done, None);
        }
        if context.len() >= max_steps {
            return Stage::finished(
                TerminationReason::BudgetExceeded,
                Some(WorkflowError::BudgetExceeded { max_steps }),
            );
        }
        Stage::Planning
    }
}
