//! Workflow parameters: use case loop control.
//!
//! [`WorkflowParams`] groups the static parameters that control a run of
//! [`RunWorkflowUseCase`](crate::use_cases::run_workflow::RunWorkflowUseCase):
//! the step budget, per-call timeouts, oracle models and token limits.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use stepwise_domain::ModelId;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowParams {
    /// Maximum number of executed steps per run.
    pub max_steps: usize,
    /// Repair calls allowed after an unparsable oracle reply.
    pub max_repair_attempts: usize,
    /// Timeout for each thinking/decision oracle call.
    pub planning_timeout: Duration,
    /// Timeout for the refinement oracle call.
    pub refinement_timeout: Duration,
    /// Timeout for each tool dispatch call.
    pub tool_timeout: Duration,
    /// Timeout for a tool discovery call.
    pub discovery_timeout: Duration,
    /// Age after which discovered tools are refreshed.
    pub tool_cache_ttl: Duration,
    /// Minimum wait before retrying a failed discovery.
    pub discovery_retry_backoff: Duration,
    /// Model for the thinking and decision passes.
    pub reasoning_model: ModelId,
    /// Model for parameter refinement.
    pub refinement_model: ModelId,
    pub temperature: f32,
    pub thinking_max_tokens: u32,
    pub decision_max_tokens: u32,
    pub refinement_max_tokens: u32,
    pub repair_max_tokens: u32,
}

impl Default for WorkflowParams {
    fn default() -> Self {
        Self {
            max_steps: 5,
            max_repair_attempts: 1,
            planning_timeout: Duration::from_secs(8),
            refinement_timeout: Duration::from_secs(8),
            tool_timeout: Duration::from_secs(30),
            discovery_timeout: Duration::from_secs(10),
            tool_cache_ttl: Duration::from_secs(30 * 60),
            discovery_retry_backoff: Duration::from_secs(60),
            reasoning_model: ModelId::reasoning_default(),
            refinement_model: ModelId::refinement_default(),
            temperature: 0.0,
            thinking_max_tokens: 400,
            decision_max_tokens: 300,
            refinement_max_tokens: 400,
            repair_max_tokens: 200,
        }
    }
}

impl WorkflowParams {
    // ==================== Builder Methods ====================

    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max;
        self
    }

    pub fn with_max_repair_attempts(mut self, attempts: usize) -> Self {
        self.max_repair_attempts = attempts;
        self
    }

    pub fn with_planning_timeout(mut self, timeout: Duration) -> Self {
        self.planning_timeout = timeout;
        self
    }

    pub fn with_refinement_timeout(mut self, timeout: Duration) -> Self {
        self.refinement_timeout = timeout;
        self
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn with_discovery_timeout(mut self, timeout: Duration) -> Self {
        self.discovery_timeout = timeout;
        self
    }

    pub fn with_tool_cache_ttl(mut self, ttl: Duration) -> Self {
        self.tool_cache_ttl = ttl;
        self
    }

    pub fn with_reasoning_model(mut self, model: ModelId) -> Self {
        self.reasoning_model = model;
        self
    }

    pub fn with_refinement_model(mut self, model: ModelId) -> Self {
        self.refinement_model = model;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let params = WorkflowParams::default();
        assert_eq!(params.max_steps, 5);
        assert_eq!(params.max_repair_attempts, 1);
        assert_eq!(params.planning_timeout, Duration::from_secs(8));
        assert_eq!(params.tool_timeout, Duration::from_secs(30));
        assert_eq!(params.tool_cache_ttl, Duration::from_secs(1800));
        assert_eq!(params.reasoning_model.as_str(), "cohere.command-r-plus-08-2024");
        assert_eq!(params.refinement_model.as_str(), "xai.grok-4");
    }

    #[test]
    fn test_builder() {
        let params = WorkflowParams::default()
            .with_max_steps(3)
            .with_max_repair_attempts(0)
            .with_reasoning_model(ModelId::new("meta.llama-3.3-70b-instruct"));

        assert_eq!(params.max_steps, 3);
        assert_eq!(params.max_repair_attempts, 0);
        assert_eq!(params.reasoning_model.vendor(), "meta");
    }
}
