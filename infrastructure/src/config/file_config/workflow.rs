//! Workflow configuration from TOML (`[workflow]` section)

use serde::{Deserialize, Serialize};
use std::time::Duration;
use stepwise_application::WorkflowParams;
use stepwise_domain::{ConfigIssue, ConfigIssueCode, ModelId};

/// Raw workflow configuration from TOML
///
/// # Example
///
/// ```toml
/// [workflow]
/// max_steps = 5
/// max_repair_attempts = 1
/// planning_timeout_secs = 8
/// tool_timeout_secs = 30
/// tool_cache_ttl_secs = 1800
/// reasoning_model = "cohere.command-r-plus-08-2024"
/// refinement_model = "xai.grok-4"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileWorkflowConfig {
    pub max_steps: usize,
    pub max_repair_attempts: usize,
    pub planning_timeout_secs: u64,
    pub refinement_timeout_secs: u64,
    pub tool_timeout_secs: u64,
    pub discovery_timeout_secs: u64,
    pub tool_cache_ttl_secs: u64,
    pub discovery_retry_backoff_secs: u64,
    pub reasoning_model: String,
    pub refinement_model: String,
    pub temperature: f32,
    pub thinking_max_tokens: u32,
    pub decision_max_tokens: u32,
    pub refinement_max_tokens: u32,
    pub repair_max_tokens: u32,
}

impl Default for FileWorkflowConfig {
    fn default() -> Self {
        let params = WorkflowParams::default();
        Self {
            max_steps: params.max_steps,
            max_repair_attempts: params.max_repair_attempts,
            planning_timeout_secs: params.planning_timeout.as_secs(),
            refinement_timeout_secs: params.refinement_timeout.as_secs(),
            tool_timeout_secs: params.tool_timeout.as_secs(),
            discovery_timeout_secs: params.discovery_timeout.as_secs(),
            tool_cache_ttl_secs: params.tool_cache_ttl.as_secs(),
            discovery_retry_backoff_secs: params.discovery_retry_backoff.as_secs(),
            reasoning_model: params.reasoning_model.to_string(),
            refinement_model: params.refinement_model.to_string(),
            temperature: params.temperature,
            thinking_max_tokens: params.thinking_max_tokens,
            decision_max_tokens: params.decision_max_tokens,
            refinement_max_tokens: params.refinement_max_tokens,
            repair_max_tokens: params.repair_max_tokens,
        }
    }
}

impl FileWorkflowConfig {
    /// Convert to [`WorkflowParams`], collecting issues.
    ///
    /// Invalid model ids fall back to the defaults; the other issues are
    /// reported and the values passed through unchanged.
    pub fn to_workflow_params(&self) -> (WorkflowParams, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let defaults = WorkflowParams::default();

        if self.max_steps == 0 {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::ZeroStepBudget,
                "workflow.max_steps must be at least 1",
            ));
        }

        for (field, secs) in [
            ("planning_timeout_secs", self.planning_timeout_secs),
            ("refinement_timeout_secs", self.refinement_timeout_secs),
            ("tool_timeout_secs", self.tool_timeout_secs),
            ("discovery_timeout_secs", self.discovery_timeout_secs),
        ] {
            if secs == 0 {
                issues.push(ConfigIssue::error(
                    ConfigIssueCode::ZeroTimeout,
                    format!("workflow.{}: timeout must be greater than zero", field),
                ));
            }
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::TemperatureOutOfRange,
                format!(
                    "workflow.temperature: {} is outside 0.0..=2.0",
                    self.temperature
                ),
            ));
        }

        let reasoning_model =
            parse_model("reasoning_model", &self.reasoning_model, &mut issues)
                .unwrap_or(defaults.reasoning_model);
        let refinement_model =
            parse_model("refinement_model", &self.refinement_model, &mut issues)
                .unwrap_or(defaults.refinement_model);

        let params = WorkflowParams {
            max_steps: self.max_steps,
            max_repair_attempts: self.max_repair_attempts,
            planning_timeout: Duration::from_secs(self.planning_timeout_secs),
            refinement_timeout: Duration::from_secs(self.refinement_timeout_secs),
            tool_timeout: Duration::from_secs(self.tool_timeout_secs),
            discovery_timeout: Duration::from_secs(self.discovery_timeout_secs),
            tool_cache_ttl: Duration::from_secs(self.tool_cache_ttl_secs),
            discovery_retry_backoff: Duration::from_secs(self.discovery_retry_backoff_secs),
            reasoning_model,
            refinement_model,
            temperature: self.temperature,
            thinking_max_tokens: self.thinking_max_tokens,
            decision_max_tokens: self.decision_max_tokens,
            refinement_max_tokens: self.refinement_max_tokens,
            repair_max_tokens: self.repair_max_tokens,
        };
        (params, issues)
    }
}

fn parse_model(field: &str, value: &str, issues: &mut Vec<ConfigIssue>) -> Option<ModelId> {
    match value.parse::<ModelId>() {
        Ok(model) => Some(model),
        Err(e) => {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidModel,
                format!("workflow.{}: {}, using the default", field, e),
            ));
            None
        }
    }
}
