//! Parameter refinement against the full payloads of earlier steps.

use crate::catalog::CapabilityCatalog;
use crate::config::WorkflowParams;
use crate::oracle::{OracleClient, OracleError};
use crate::ports::oracle_gateway::InferenceRequest;
use crate::use_cases::shared::check_cancelled;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use stepwise_domain::{
    PlanDecision, PlannerPromptTemplate, ToolDescriptor, WorkflowContext, WorkflowError,
    coerce_parameters,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Deserialize)]
struct RefinementReply {
    #[serde(default, alias = "params")]
    parameters: Option<Value>,
    #[serde(default)]
    rationale: String,
}

/// Decision after refinement. Service and tool are those of the input.
#[derive(Debug, Clone)]
pub struct RefinedDecision {
    pub decision: PlanDecision,
    pub rationale: String,
}

pub struct ParameterRefiner {
    catalog: Arc<CapabilityCatalog>,
    oracle: Arc<OracleClient>,
    params: WorkflowParams,
}

impl ParameterRefiner {
    pub fn new(
        catalog: Arc<CapabilityCatalog>,
        oracle: Arc<OracleClient>,
        params: WorkflowParams,
    ) -> Self {
        Self {
            catalog,
            oracle,
            params,
        }
    }

    /// Refine `decision` against `context`. Only cancellation is an error.
    pub async fn refine(
        &self,
        decision: &PlanDecision,
        context: &WorkflowContext,
        cancel: &CancellationToken,
    ) -> Result<RefinedDecision, WorkflowError> {
        check_cancelled(cancel)?;

        let tool = self.catalog.tool(&decision.service, &decision.tool).await;
        let aliases = self
            .catalog
            .get(&decision.service)
            .await
            .map(|s| s.parameter_aliases)
            .unwrap_or_default();

        let (proposed, mut rationale) = if context.is_empty() {
            (
                decision.parameters.clone(),
                "no earlier results to draw on; parameters kept".to_string(),
            )
        } else {
            self.ask_oracle(decision, tool.as_ref(), context, cancel)
                .await?
        };

        let parameters = match &tool {
            Some(tool) if tool.has_schema() => {
                let (parameters, note) =
                    coerce_with_fallback(&proposed, &decision.parameters, tool, &aliases);
                if let Some(note) = note {
                    rationale = format!("{}; {}", rationale, note);
                }
                parameters
            }
            _ => proposed,
        };

        debug!(
            "Refined {}/{}: {}",
            decision.service, decision.tool, rationale
        );
        Ok(RefinedDecision {
            decision: decision.with_parameters(parameters),
            rationale,
        })
    }

    async fn ask_oracle(
        &self,
        decision: &PlanDecision,
        tool: Option<&ToolDescriptor>,
        context: &WorkflowContext,
        cancel: &CancellationToken,
    ) -> Result<(Map<String, Value>, String), WorkflowError> {
        let request = InferenceRequest::new(
            self.params.refinement_model.clone(),
            PlannerPromptTemplate::refinement(
                context.query(),
                decision,
                tool,
                &context.full_history(),
            ),
        )
        .with_temperature(self.params.temperature)
        .with_max_output_tokens(self.params.refinement_max_tokens);

        match self
            .oracle
            .infer_structured::<RefinementReply>(&request, self.params.refinement_timeout, cancel)
            .await
        {
            Ok(RefinementReply {
                parameters: Some(Value::Object(parameters)),
                rationale,
            }) => {
                let rationale = if rationale.trim().is_empty() {
                    "parameters refined".to_string()
                } else {
                    rationale
                };
                Ok((parameters, rationale))
            }
            Ok(_) => Ok((
                decision.parameters.clone(),
                "refinement returned no parameter object; parameters kept".to_string(),
            )),
            Err(OracleError::Cancelled) => Err(WorkflowError::Cancelled),
            Err(e) => {
                warn!("Parameter refinement failed, keeping planned parameters: {}", e);
                Ok((
                    decision.parameters.clone(),
                    format!("refinement failed ({}); parameters kept", e),
                ))
            }
        }
    }
}

/// Coerce the proposed parameters; if they do not fit the schema but the
/// planned ones do, use the planned ones. Otherwise keep the proposal as is
/// and let the dispatcher reject it.
fn coerce_with_fallback(
    proposed: &Map<String, Value>,
    planned: &Map<String, Value>,
    tool: &ToolDescriptor,
    aliases: &BTreeMap<String, String>,
) -> (Map<String, Value>, Option<String>) {
    match coerce_parameters(proposed, tool, aliases) {
        Ok(coerced) => (coerced, None),
        Err(proposed_err) if proposed != planned => match coerce_parameters(planned, tool, aliases) {
            Ok(coerced) => (
                coerced,
                Some(format!("refined parameters rejected ({}), planned ones used", proposed_err)),
            ),
            Err(_) => (proposed.clone(), Some(proposed_err.to_string())),
        },
        Err(err) => (proposed.clone(), Some(err.to_string())),
    }
}
