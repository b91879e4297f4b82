//! Scripted port implementations shared by the use case tests.

use crate::catalog::CapabilityCatalog;
use crate::ports::oracle_gateway::{GatewayError, InferenceRequest, OracleGateway};
use crate::ports::service_transport::{
    ServiceTransport, TransportError, TransportRequest, TransportResponse,
};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use stepwise_domain::prompt::planner::{
    DECISION_MARKER, REFINEMENT_MARKER, REPAIR_MARKER, THINKING_MARKER,
};
use stepwise_domain::{
    ParameterType, ServiceDescriptor, ServiceRole, ToolDescriptor, ToolParameter,
};

// ==================== Oracle ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum PromptKind {
    Thinking,
    Decision,
    Refinement,
    Repair,
}

impl PromptKind {
    fn of(prompt: &str) -> Option<Self> {
        if prompt.contains(REPAIR_MARKER) {
            Some(PromptKind::Repair)
        } else if prompt.contains(REFINEMENT_MARKER) {
            Some(PromptKind::Refinement)
        } else if prompt.contains(DECISION_MARKER) {
            Some(PromptKind::Decision)
        } else if prompt.contains(THINKING_MARKER) {
            Some(PromptKind::Thinking)
        } else {
            None
        }
    }
}

/// Oracle that answers each prompt kind from its own reply queue.
///
/// An exhausted queue answers with a gateway error.
#[derive(Default)]
pub(crate) struct ScriptedOracle {
    replies: Mutex<HashMap<PromptKind, VecDeque<Result<String, GatewayError>>>>,
    prompts: Mutex<Vec<(PromptKind, String)>>,
    delay: Option<Duration>,
    /// Extra delay for prompts containing the given text
    slow_prompts: Option<(String, Duration)>,
}

impl ScriptedOracle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, kind: PromptKind, text: impl Into<String>) -> Self {
        self.push(kind, Ok(text.into()))
    }

    pub(crate) fn fail(self, kind: PromptKind, error: GatewayError) -> Self {
        self.push(kind, Err(error))
    }

    pub(crate) fn thinking(self, text: impl Into<String>) -> Self {
        self.reply(PromptKind::Thinking, text)
    }

    pub(crate) fn decision(self, text: impl Into<String>) -> Self {
        self.reply(PromptKind::Decision, text)
    }

    pub(crate) fn refinement(self, text: impl Into<String>) -> Self {
        self.reply(PromptKind::Refinement, text)
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub(crate) fn with_delay_for(mut self, needle: impl Into<String>, delay: Duration) -> Self {
        self.slow_prompts = Some((needle.into(), delay));
        self
    }

    fn push(self, kind: PromptKind, reply: Result<String, GatewayError>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .entry(kind)
            .or_default()
            .push_back(reply);
        self
    }

    pub(crate) fn prompts(&self, kind: PromptKind) -> Vec<String> {
        self.prompts
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub(crate) fn calls(&self, kind: PromptKind) -> usize {
        self.prompts(kind).len()
    }
}

#[async_trait]
impl OracleGateway for ScriptedOracle {
    async fn infer(&self, request: &InferenceRequest) -> Result<String, GatewayError> {
        let kind = PromptKind::of(&request.prompt)
            .ok_or_else(|| GatewayError::Other("unrecognised prompt".to_string()))?;
        self.prompts
            .lock()
            .unwrap()
            .push((kind, request.prompt.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some((needle, delay)) = &self.slow_prompts
            && request.prompt.contains(needle.as_str())
        {
            tokio::time::sleep(*delay).await;
        }

        self.replies
            .lock()
            .unwrap()
            .get_mut(&kind)
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Err(GatewayError::Other(format!("no scripted {:?} reply", kind))))
    }
}

// ==================== Transport ====================

type Handler =
    Box<dyn Fn(&TransportRequest) -> Result<TransportResponse, TransportError> + Send + Sync>;

/// Transport answering through a closure and recording every request
pub(crate) struct MockTransport {
    handler: Handler,
    requests: Mutex<Vec<TransportRequest>>,
}

impl MockTransport {
    pub(crate) fn new(
        handler: impl Fn(&TransportRequest) -> Result<TransportResponse, TransportError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every request answered with `status` and the JSON `body`
    pub(crate) fn always(status: u16, body: Value) -> Self {
        Self::new(move |_| Ok(TransportResponse::new(status, body.to_string())))
    }

    pub(crate) fn requests(&self) -> Vec<TransportRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Requests other than tool discovery
    pub(crate) fn dispatches(&self) -> Vec<TransportRequest> {
        self.requests()
            .into_iter()
            .filter(|r| !r.url.ends_with("/tools"))
            .collect()
    }
}

#[async_trait]
impl ServiceTransport for MockTransport {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(request.clone());
        (self.handler)(request)
    }
}

// ==================== Catalog ====================

pub(crate) fn profile_service() -> ServiceDescriptor {
    ServiceDescriptor::new("nl_query", "User Profiles", "http://profiles.test")
        .with_description("Natural-language lookup of users, their skills and progress")
        .with_use_when("the query names a person")
        .with_role(ServiceRole::ProfileLookup)
        .with_endpoint("query", "/users/search/nl")
        .with_tool_endpoint("query_database_nl", "query")
        .with_parameter_alias("query", "natural_language_query")
        .with_static_tool(
            ToolDescriptor::new("query_database_nl", "Look up users in natural language")
                .with_parameter(
                    ToolParameter::new("natural_language_query")
                        .with_type(ParameterType::String)
                        .required(),
                ),
        )
}

pub(crate) fn search_service() -> ServiceDescriptor {
    ServiceDescriptor::new("semantic_search", "Semantic Search", "http://search.test")
        .with_description("Vector search over workshops")
        .with_use_when("finding workshops")
        .with_role(ServiceRole::ContentSearch)
        .with_endpoint("search", "/search")
        .with_tool_endpoint("search_livelabs_workshops", "search")
        .with_static_tool(
            ToolDescriptor::new("search_livelabs_workshops", "Search workshops by topic")
                .with_parameter(
                    ToolParameter::new("query")
                        .with_type(ParameterType::String)
                        .required(),
                )
                .with_parameter(ToolParameter::new("top_k").with_type(ParameterType::Integer)),
        )
}

pub(crate) fn two_service_catalog(transport: Arc<MockTransport>) -> Arc<CapabilityCatalog> {
    Arc::new(
        CapabilityCatalog::new(vec![profile_service(), search_service()], transport)
            .expect("unique service keys"),
    )
}
