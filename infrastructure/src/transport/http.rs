//! reqwest implementation of the [`ServiceTransport`] port.

use async_trait::async_trait;
use serde_json::{Map, Value};
use stepwise_application::ports::service_transport::{
    ServiceTransport, TransportError, TransportMethod, TransportRequest, TransportResponse,
};
use tracing::debug;

pub struct HttpServiceTransport {
    client: reqwest::Client,
}

impl HttpServiceTransport {
    pub fn new() -> Self {
        Self::with_client(reqwest::Client::new())
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

impl Default for HttpServiceTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ServiceTransport for HttpServiceTransport {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError> {
        debug!("{} {}", request.method, request.url);

        let builder = match request.method {
            TransportMethod::Write => self.client.post(&request.url).json(&request.params),
            TransportMethod::Read => self
                .client
                .get(&request.url)
                .query(&query_pairs(&request.params)),
        };

        let response = builder
            .timeout(request.timeout)
            .send()
            .await
            .map_err(|e| classify_error(e, request))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| classify_error(e, request))?;

        Ok(TransportResponse::new(status, body))
    }
}

fn classify_error(error: reqwest::Error, request: &TransportRequest) -> TransportError {
    if error.is_timeout() {
        TransportError::Timeout(request.timeout)
    } else if error.is_connect() {
        TransportError::Connection(error.to_string())
    } else {
        TransportError::Other(error.to_string())
    }
}

/// Query-string form of a parameter map. Arrays repeat the key; nulls are dropped.
pub(crate) fn query_pairs(params: &Map<String, Value>) -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (key, value) in params {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    if let Some(text) = scalar_text(item) {
                        pairs.push((key.clone(), text));
                    }
                }
            }
            other => {
                if let Some(text) = scalar_text(other) {
                    pairs.push((key.clone(), text));
                }
            }
        }
    }
    pairs
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
