//! Step planning: thinking pass, decision pass, fallback.
//!
//! Oracle failures (unavailable, timeout, malformed output) never escape this
//! module. They turn into a [`ThinkingJudgment::neutral`] for the thinking
//! pass and into a fallback-table decision for the decision pass. The only
//! errors returned are `UnknownService` (nothing to route to) and `Cancelled`.

use crate::catalog::CapabilityCatalog;
use crate::config::WorkflowParams;
use crate::oracle::{OracleClient, OracleError};
use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use crate::ports::oracle_gateway::InferenceRequest;
use crate::ports::workflow_progress::WorkflowProgressNotifier;
use crate::use_cases::shared::{Bounded, check_cancelled, run_bounded};
use serde_json::json;
use std::sync::Arc;
use stepwise_domain::{
    FallbackRuleTable, PlanDecision, PlannerPromptTemplate, RawDecision, ServiceDescriptor,
    StepSummary, ThinkingJudgment, WorkflowContext, WorkflowError,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// A planned step together with the judgment that led to it
#[derive(Debug, Clone)]
pub struct PlannedStep {
    pub decision: PlanDecision,
    pub thinking: ThinkingJudgment,
}

pub struct StepPlanner {
    catalog: Arc<CapabilityCatalog>,
    oracle: Arc<OracleClient>,
    conversation_logger: Arc<dyn ConversationLogger>,
    fallback: FallbackRuleTable,
    params: WorkflowParams,
}

impl StepPlanner {
    pub fn new(
        catalog: Arc<CapabilityCatalog>,
        oracle: Arc<OracleClient>,
        conversation_logger: Arc<dyn ConversationLogger>,
        params: WorkflowParams,
    ) -> Self {
        Self {
            catalog,
            oracle,
            conversation_logger,
            fallback: FallbackRuleTable::default(),
            params,
        }
    }

    pub fn with_fallback(mut self, fallback: FallbackRuleTable) -> Self {
        self.fallback = fallback;
        self
    }

    /// Propose the next step for `context`
    pub async fn plan(
        &self,
        context: &WorkflowContext,
        progress: &dyn WorkflowProgressNotifier,
        cancel: &CancellationToken,
    ) -> Result<PlannedStep, WorkflowError> {
        check_cancelled(cancel)?;

        // Lazy discovery; a slow service only delays this pass by the discovery timeout
        let refresh = self.catalog.ensure_all_fresh(self.params.tool_cache_ttl);
        if let Bounded::Cancelled =
            run_bounded(refresh, self.params.discovery_timeout, cancel).await
        {
            return Err(WorkflowError::Cancelled);
        }

        let services = self.catalog.snapshot().await;
        if services.is_empty() {
            warn!("Planning aborted: no enabled services in the catalog");
            return Err(WorkflowError::unknown_service(
                "the capability catalog has no enabled services",
            ));
        }

        let summaries = context.summaries();
        let thinking = self.think(context.query(), &summaries, cancel).await?;
        progress.on_thinking(&thinking);

        let decision = match self
            .decide(context.query(), &thinking, &services, &summaries, cancel)
            .await?
        {
            Ok(decision) => decision,
            Err(reason) => self.fall_back(context, &services, reason, progress)?,
        };

        info!(
            "Step {} planned: {}/{} (completion: {}, source: {:?})",
            context.len() + 1,
            decision.service,
            decision.tool,
            decision.completion,
            decision.source
        );
        self.conversation_logger.log(ConversationEvent::new(
            "plan_decision",
            json!({
                "step": context.len() + 1,
                "decision": decision,
                "thinking": thinking,
            }),
        ));
        progress.on_decision(&decision);

        Ok(PlannedStep { decision, thinking })
    }

    async fn think(
        &self,
        query: &str,
        summaries: &[StepSummary],
        cancel: &CancellationToken,
    ) -> Result<ThinkingJudgment, WorkflowError> {
        let request = InferenceRequest::new(
            self.params.reasoning_model.clone(),
            PlannerPromptTemplate::thinking(query, summaries),
        )
        .with_temperature(self.params.temperature)
        .with_max_output_tokens(self.params.thinking_max_tokens);

        match self
            .oracle
            .infer_structured::<ThinkingJudgment>(&request, self.params.planning_timeout, cancel)
            .await
        {
            Ok(judgment) => {
                debug!("Thinking pass: {:?}", judgment.query_category);
                Ok(judgment)
            }
            Err(OracleError::Cancelled) => Err(WorkflowError::Cancelled),
            Err(e) => {
                warn!("Thinking pass failed, continuing with a neutral judgment: {}", e);
                Ok(ThinkingJudgment::neutral(format!("thinking pass failed: {}", e)))
            }
        }
    }

    /// Outer error: cancellation. Inner error: why the oracle decision is unusable.
    async fn decide(
        &self,
        query: &str,
        thinking: &ThinkingJudgment,
        services: &[ServiceDescriptor],
        summaries: &[StepSummary],
        cancel: &CancellationToken,
    ) -> Result<Result<PlanDecision, String>, WorkflowError> {
        let request = InferenceRequest::new(
            self.params.reasoning_model.clone(),
            PlannerPromptTemplate::decision(query, thinking, services, summaries),
        )
        .with_temperature(self.params.temperature)
        .with_max_output_tokens(self.params.decision_max_tokens);

        let raw = match self
            .oracle
            .infer_structured::<RawDecision>(&request, self.params.planning_timeout, cancel)
            .await
        {
            Ok(raw) => raw,
            Err(OracleError::Cancelled) => return Err(WorkflowError::Cancelled),
            Err(e) => return Ok(Err(WorkflowError::from(e).to_string())),
        };

        let Some(decision) = raw.into_decision() else {
            return Ok(Err("decision is missing a service or tool".to_string()));
        };
        Ok(validate_decision(decision, services))
    }

    fn fall_back(
        &self,
        context: &WorkflowContext,
        services: &[ServiceDescriptor],
        reason: String,
        progress: &dyn WorkflowProgressNotifier,
    ) -> Result<PlanDecision, WorkflowError> {
        let Some(decision) = self.fallback.evaluate(context.query(), context, services) else {
            return Err(WorkflowError::unknown_service(format!(
                "no fallback rule resolved ({})",
                reason
            )));
        };
        let rule = match &decision.source {
            stepwise_domain::DecisionSource::Fallback { rule } => rule.clone(),
            stepwise_domain::DecisionSource::Oracle => String::new(),
        };
        warn!("Using fallback rule '{}': {}", rule, reason);
        progress.on_fallback(&rule, &reason);
        Ok(decision.with_raw_failure(reason))
    }
}

/// The service must be enabled in the snapshot and know the tool.
/// The tool comes back under its canonical name.
fn validate_decision(
    mut decision: PlanDecision,
    services: &[ServiceDescriptor],
) -> Result<PlanDecision, String> {
    let Some(service) = services.iter().find(|s| s.key == decision.service) else {
        return Err(WorkflowError::unknown_service(format!(
            "oracle chose unknown service '{}'",
            decision.service
        ))
        .to_string());
    };
    let Some(tool) = service.canonical_tool_name(&decision.tool) else {
        return Err(WorkflowError::UnknownTool {
            service: decision.service.clone(),
            tool: decision.tool.clone(),
        }
        .to_string());
    };
    decision.tool = tool;
    Ok(decision)
}
