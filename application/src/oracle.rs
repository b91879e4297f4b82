//! Reasoning oracle client.
//!
//! Wraps the [`OracleGateway`] port with a per-call timeout, cancellation,
//! conversation logging and bounded structured decoding. Components above this
//! boundary only ever see typed values or an [`OracleError`].

use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use crate::ports::oracle_gateway::{GatewayError, InferenceRequest, OracleGateway};
use crate::use_cases::shared::{Bounded, run_bounded};
use serde::de::DeserializeOwned;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use stepwise_domain::core::string::truncate;
use stepwise_domain::{PlannerPromptTemplate, WorkflowError, decode_structured};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OracleError {
    #[error("Oracle unavailable: {0}")]
    Unavailable(String),

    #[error("Oracle call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Malformed oracle output: {reason}")]
    MalformedPlan { raw: String, reason: String },

    #[error("Oracle call cancelled")]
    Cancelled,
}

impl OracleError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OracleError::Cancelled)
    }
}

impl From<OracleError> for WorkflowError {
    fn from(err: OracleError) -> Self {
        match err {
            OracleError::Unavailable(message) => WorkflowError::OracleUnavailable { message },
            OracleError::Timeout(after) => WorkflowError::OracleUnavailable {
                message: format!("timed out after {:?}", after),
            },
            OracleError::MalformedPlan { reason, .. } => WorkflowError::MalformedPlan { reason },
            OracleError::Cancelled => WorkflowError::Cancelled,
        }
    }
}

pub struct OracleClient {
    gateway: Arc<dyn OracleGateway>,
    conversation_logger: Arc<dyn ConversationLogger>,
    max_repair_attempts: usize,
    repair_max_tokens: u32,
}

impl OracleClient {
    pub fn new(
        gateway: Arc<dyn OracleGateway>,
        conversation_logger: Arc<dyn ConversationLogger>,
    ) -> Self {
        Self {
            gateway,
            conversation_logger,
            max_repair_attempts: 1,
            repair_max_tokens: 200,
        }
    }

    pub fn with_max_repair_attempts(mut self, attempts: usize) -> Self {
        self.max_repair_attempts = attempts;
        self
    }

    pub fn with_repair_max_tokens(mut self, tokens: u32) -> Self {
        self.repair_max_tokens = tokens;
        self
    }

    /// One free-text inference call
    pub async fn infer(
        &self,
        request: &InferenceRequest,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<String, OracleError> {
        self.conversation_logger.log(ConversationEvent::new(
            "oracle_request",
            json!({
                "model": request.model.as_str(),
                "prompt": request.prompt,
                "max_output_tokens": request.max_output_tokens,
            }),
        ));

        let outcome = run_bounded(self.gateway.infer(request), timeout, cancel).await;
        let result = match outcome {
            Bounded::Completed(Ok(text)) if text.trim().is_empty() => {
                Err(OracleError::Unavailable(GatewayError::EmptyCompletion.to_string()))
            }
            Bounded::Completed(Ok(text)) => Ok(text),
            Bounded::Completed(Err(e)) => Err(OracleError::Unavailable(e.to_string())),
            Bounded::TimedOut => Err(OracleError::Timeout(timeout)),
            Bounded::Cancelled => Err(OracleError::Cancelled),
        };

        match &result {
            Ok(text) => {
                debug!(
                    "Oracle {} replied: {}",
                    request.model,
                    truncate(text, 200)
                );
                self.conversation_logger.log(ConversationEvent::new(
                    "oracle_reply",
                    json!({"model": request.model.as_str(), "text": text}),
                ));
            }
            Err(e) => {
                warn!("Oracle {} call failed: {}", request.model, e);
                self.conversation_logger.log(ConversationEvent::new(
                    "oracle_error",
                    json!({"model": request.model.as_str(), "error": e.to_string()}),
                ));
            }
        }
        result
    }

    /// Inference decoded as `T`, with at most `max_repair_attempts` repair calls.
    ///
    /// Each repair call resends the latest malformed text with an instruction to
    /// reformat it as one JSON object. Cancellation is returned as-is; any other
    /// failure of a repair call ends decoding with `MalformedPlan`.
    pub async fn infer_structured<T: DeserializeOwned>(
        &self,
        request: &InferenceRequest,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<T, OracleError> {
        let mut raw = self.infer(request, timeout, cancel).await?;
        let mut reason = match decode_structured::<T>(&raw) {
            Ok(value) => return Ok(value),
            Err(reason) => reason,
        };

        for attempt in 1..=self.max_repair_attempts {
            warn!(
                "Oracle output not decodable ({}), repair attempt {}/{}",
                reason, attempt, self.max_repair_attempts
            );
            let repair = InferenceRequest::new(request.model.clone(), PlannerPromptTemplate::repair(&raw))
                .with_temperature(request.temperature)
                .with_max_output_tokens(self.repair_max_tokens);

            match self.infer(&repair, timeout, cancel).await {
                Ok(text) => match decode_structured::<T>(&text) {
                    Ok(value) => return Ok(value),
                    Err(e) => {
                        reason = e;
                        raw = text;
                    }
                },
                Err(OracleError::Cancelled) => return Err(OracleError::Cancelled),
                Err(e) => {
                    return Err(OracleError::MalformedPlan {
                        raw,
                        reason: format!("repair call failed: {}", e),
                    });
                }
            }
        }

        Err(OracleError::MalformedPlan { raw, reason })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::conversation_logger::NoConversationLogger;
    use crate::test_support::{PromptKind, ScriptedOracle};
    use serde::Deserialize;
    use stepwise_domain::ModelId;

    #[derive(Debug, Deserialize, PartialEq)]
    struct Answer {
        service: String,
    }

    const TIMEOUT: Duration = Duration::from_secs(2);

    fn request() -> InferenceRequest {
        InferenceRequest::new(
            ModelId::reasoning_default(),
            PlannerPromptTemplate::thinking("List database workshops", &[]),
        )
    }

    fn client(oracle: Arc<ScriptedOracle>) -> OracleClient {
        OracleClient::new(oracle, Arc::new(NoConversationLogger))
    }

    #[tokio::test]
    async fn test_structured_decode_direct_and_fenced() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .thinking(r#"{"service": "semantic_search"}"#)
                .thinking("```json\n{\"service\": \"nl_query\"}\n```"),
        );
        let client = client(oracle.clone());
        let token = CancellationToken::new();

        let first: Answer = client.infer_structured(&request(), TIMEOUT, &token).await.unwrap();
        let second: Answer = client.infer_structured(&request(), TIMEOUT, &token).await.unwrap();
        assert_eq!(first.service, "semantic_search");
        assert_eq!(second.service, "nl_query");
        assert_eq!(oracle.calls(PromptKind::Repair), 0);
    }

    #[tokio::test]
    async fn test_single_repair_recovers() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .thinking("service is semantic_search")
                .reply(PromptKind::Repair, r#"{"service": "semantic_search"}"#),
        );
        let client = client(oracle.clone());

        let answer: Answer = client
            .infer_structured(&request(), TIMEOUT, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(answer.service, "semantic_search");
        let repairs = oracle.prompts(PromptKind::Repair);
        assert_eq!(repairs.len(), 1);
        assert!(repairs[0].contains("service is semantic_search"));
    }

    #[tokio::test]
    async fn test_repair_bound_is_respected() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .thinking("not json")
                .reply(PromptKind::Repair, "still not json")
                .reply(PromptKind::Repair, "nope")
                .reply(PromptKind::Repair, r#"{"service": "never reached"}"#),
        );
        let client = client(oracle.clone()).with_max_repair_attempts(2);

        let result = client
            .infer_structured::<Answer>(&request(), TIMEOUT, &CancellationToken::new())
            .await;
        match result {
            Err(OracleError::MalformedPlan { raw, .. }) => assert_eq!(raw, "nope"),
            other => panic!("expected MalformedPlan, got {:?}", other),
        }
        assert_eq!(oracle.calls(PromptKind::Repair), 2);
    }

    #[tokio::test]
    async fn test_zero_repairs_fails_immediately() {
        let oracle = Arc::new(ScriptedOracle::new().thinking("prose"));
        let client = client(oracle.clone()).with_max_repair_attempts(0);

        let result = client
            .infer_structured::<Answer>(&request(), TIMEOUT, &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(OracleError::MalformedPlan { .. })));
        assert_eq!(oracle.calls(PromptKind::Repair), 0);
    }

    #[tokio::test]
    async fn test_failures_are_values() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .fail(
                    PromptKind::Thinking,
                    GatewayError::RequestFailed("HTTP 401".to_string()),
                )
                .thinking("   "),
        );
        let client = client(oracle);
        let token = CancellationToken::new();

        let err = client.infer(&request(), TIMEOUT, &token).await.unwrap_err();
        assert_eq!(err, OracleError::Unavailable("Request failed: HTTP 401".to_string()));
        let err = client.infer(&request(), TIMEOUT, &token).await.unwrap_err();
        assert_eq!(err, OracleError::Unavailable("Empty completion".to_string()));
    }

    #[tokio::test]
    async fn test_timeout_and_cancellation() {
        let oracle = Arc::new(
            ScriptedOracle::new()
                .thinking("{}")
                .thinking("{}")
                .with_delay(Duration::from_secs(5)),
        );
        let client = client(oracle);

        let err = client
            .infer(&request(), Duration::from_millis(20), &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err, OracleError::Timeout(Duration::from_millis(20)));

        let token = CancellationToken::new();
        let cancel = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });
        let err = client.infer(&request(), TIMEOUT, &token).await.unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_maps_into_workflow_error() {
        let err: WorkflowError = OracleError::Timeout(Duration::from_secs(8)).into();
        assert!(matches!(err, WorkflowError::OracleUnavailable { .. }));
        let err: WorkflowError = OracleError::Cancelled.into();
        assert!(err.is_cancelled());
    }
}
