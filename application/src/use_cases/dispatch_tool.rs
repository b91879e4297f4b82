//! Tool dispatch: (service, tool, parameters) → normalized outcome.
//!
//! Resolution, schema coercion, alias translation, the write→read fallback
//! and response classification all happen here. [`ToolDispatcher::invoke`]
//! never returns an error; every problem becomes `success = false`.

use crate::catalog::CapabilityCatalog;
use crate::ports::service_transport::{
    ServiceTransport, TransportError, TransportMethod, TransportRequest, TransportResponse,
};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::{Duration, Instant};
use stepwise_domain::core::string::truncate;
use stepwise_domain::{ServiceDescriptor, StepOutcome, WorkflowError, coerce_parameters};
use tracing::{debug, info, warn};

/// Statuses that mean "this endpoint does not take a write-style call"
const READ_FALLBACK_STATUSES: &[u16] = &[404, 405, 501];

/// Characters of a failing response body kept in the error message
const ERROR_BODY_LIMIT: usize = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct DispatchOutcome {
    pub success: bool,
    pub payload: Option<Value>,
    pub error: Option<String>,
    /// Parameters as sent to the service (coerced, aliased)
    pub sent_parameters: Map<String, Value>,
    pub duration_ms: u64,
}

impl DispatchOutcome {
    fn rejected(error: impl Into<String>, params: &Map<String, Value>, started: Instant) -> Self {
        Self {
            success: false,
            payload: None,
            error: Some(error.into()),
            sent_parameters: params.clone(),
            duration_ms: elapsed_ms(started),
        }
    }

    pub fn to_step_outcome(&self) -> StepOutcome {
        if self.success {
            StepOutcome::success(self.payload.clone().unwrap_or(Value::Null))
        } else {
            StepOutcome::failure(
                self.error.clone().unwrap_or_else(|| "unknown error".to_string()),
                self.payload.clone(),
            )
        }
    }
}

pub struct ToolDispatcher {
    catalog: Arc<CapabilityCatalog>,
    transport: Arc<dyn ServiceTransport>,
    tool_timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(catalog: Arc<CapabilityCatalog>, transport: Arc<dyn ServiceTransport>) -> Self {
        Self {
            catalog,
            transport,
            tool_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub async fn invoke(
        &self,
        service_key: &str,
        tool_name: &str,
        parameters: &Map<String, Value>,
    ) -> DispatchOutcome {
        let started = Instant::now();

        let Some(service) = self.catalog.enabled(service_key).await else {
            let err = WorkflowError::unknown_service(format!("'{}' is not in the catalog", service_key));
            return DispatchOutcome::rejected(err.to_string(), parameters, started);
        };
        let Some(url) = service.resolve_endpoint(tool_name) else {
            let err = WorkflowError::UnknownTool {
                service: service_key.to_string(),
                tool: tool_name.to_string(),
            };
            return DispatchOutcome::rejected(err.to_string(), parameters, started);
        };

        let checked = match service.find_tool(tool_name) {
            Some(tool) if tool.has_schema() => {
                match coerce_parameters(parameters, tool, &service.parameter_aliases) {
                    Ok(coerced) => coerced,
                    Err(e) => {
                        warn!("Rejected parameters for {}/{}: {}", service_key, tool_name, e);
                        return DispatchOutcome::rejected(
                            format!("Parameter rejected: {}", e),
                            parameters,
                            started,
                        );
                    }
                }
            }
            _ => parameters.clone(),
        };
        let params = translate_aliases(&service, checked);

        info!("Dispatching {}/{} to {}", service_key, tool_name, url);
        let exchange = if params.is_empty() {
            self.send(TransportRequest::read(url.clone(), self.tool_timeout))
                .await
        } else {
            let first = self
                .send(TransportRequest::write(url.clone(), params.clone(), self.tool_timeout))
                .await;
            if needs_read_fallback(&first) {
                debug!(
                    "Write-style call to {} rejected ({}), retrying read-style",
                    url,
                    describe(&first)
                );
                self.send(TransportRequest::read(url.clone(), self.tool_timeout).with_params(params.clone()))
                    .await
            } else {
                first
            }
        };

        let (success, payload, error) = classify(exchange);
        if let Some(error) = &error {
            warn!("{}/{} failed: {}", service_key, tool_name, error);
        }
        DispatchOutcome {
            success,
            payload,
            error,
            sent_parameters: params,
            duration_ms: elapsed_ms(started),
        }
    }

    async fn send(&self, request: TransportRequest) -> Result<TransportResponse, TransportError> {
        match tokio::time::timeout(self.tool_timeout, self.transport.send(&request)).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout(self.tool_timeout)),
        }
    }
}

/// Canonical names → the service's own field names, unless the field is already set
fn translate_aliases(service: &ServiceDescriptor, params: Map<String, Value>) -> Map<String, Value> {
    let (direct, aliased): (Vec<_>, Vec<_>) = params
        .into_iter()
        .partition(|(key, _)| service.field_name(key) == key.as_str());

    let mut out: Map<String, Value> = direct.into_iter().collect();
    for (key, value) in aliased {
        let field = service.field_name(&key).to_string();
        out.entry(field).or_insert(value);
    }
    out
}

fn needs_read_fallback(result: &Result<TransportResponse, TransportError>) -> bool {
    match result {
        Ok(response) => READ_FALLBACK_STATUSES.contains(&response.status),
        Err(_) => true,
    }
}

fn describe(result: &Result<TransportResponse, TransportError>) -> String {
    match result {
        Ok(response) => format!("HTTP {}", response.status),
        Err(e) => e.to_string(),
    }
}

/// (success, payload, error) for a finished exchange
fn classify(
    result: Result<TransportResponse, TransportError>,
) -> (bool, Option<Value>, Option<String>) {
    let response = match result {
        Ok(response) => response,
        Err(e) => return (false, None, Some(e.to_string())),
    };

    if !response.is_success() {
        let payload = serde_json::from_str::<Value>(&response.body).ok();
        return (
            false,
            payload,
            Some(format!(
                "HTTP {}: {}",
                response.status,
                truncate(response.body.trim(), ERROR_BODY_LIMIT)
            )),
        );
    }

    let payload = match serde_json::from_str::<Value>(&response.body) {
        Ok(payload) => payload,
        Err(e) => return (false, None, Some(format!("Invalid JSON response: {}", e))),
    };

    match payload.get("success") {
        Some(Value::Bool(false)) => {
            let message = payload
                .get("error")
                .or_else(|| payload.get("message"))
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .unwrap_or_else(|| "service reported failure".to_string());
            (false, Some(payload), Some(message))
        }
        // A missing success field on a 2xx body counts as success
        _ => (true, Some(payload), None),
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
