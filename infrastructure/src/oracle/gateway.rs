//! HTTP adapter for the [`OracleGateway`] port.

use super::request::{ChatDetails, ChatResult};
use async_trait::async_trait;
use stepwise_application::ports::oracle_gateway::{GatewayError, InferenceRequest, OracleGateway};
use stepwise_domain::core::string::truncate;
use tracing::{debug, trace};

/// Path of the chat action, relative to the inference endpoint
pub const CHAT_PATH: &str = "/20231130/actions/chat";

/// Connection settings for the inference service
#[derive(Debug, Clone)]
pub struct OracleSettings {
    pub endpoint: String,
    pub compartment_id: String,
    /// Sent as a bearer token when present
    pub auth_token: Option<String>,
}

pub struct HttpOracleGateway {
    client: reqwest::Client,
    settings: OracleSettings,
}

impl HttpOracleGateway {
    pub fn new(settings: OracleSettings) -> Self {
        Self::with_client(reqwest::Client::new(), settings)
    }

    pub fn with_client(client: reqwest::Client, settings: OracleSettings) -> Self {
        Self { client, settings }
    }

    pub fn chat_url(&self) -> String {
        format!("{}{}", self.settings.endpoint.trim_end_matches('/'), CHAT_PATH)
    }
}

#[async_trait]
impl OracleGateway for HttpOracleGateway {
    async fn infer(&self, request: &InferenceRequest) -> Result<String, GatewayError> {
        let body = ChatDetails::for_request(&self.settings.compartment_id, request);
        debug!(
            "Oracle request: model={} family={} max_tokens={}",
            request.model,
            request.model.family().as_str(),
            request.max_output_tokens
        );
        trace!("Oracle prompt: {}", request.prompt);

        let mut call = self.client.post(self.chat_url()).json(&body);
        if let Some(token) = &self.settings.auth_token {
            call = call.bearer_auth(token);
        }

        let response = call.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout
            } else {
                GatewayError::ConnectionError(e.to_string())
            }
        })?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| GatewayError::ConnectionError(e.to_string()))?;
        if !status.is_success() {
            return Err(GatewayError::RequestFailed(format!(
                "HTTP {}: {}",
                status.as_u16(),
                truncate(text.trim(), 200)
            )));
        }

        parse_completion(&text)
    }
}

/// Completion text of a successful chat reply
fn parse_completion(body: &str) -> Result<String, GatewayError> {
    let result: ChatResult = serde_json::from_str(body)
        .map_err(|e| GatewayError::Other(format!("Unexpected oracle reply: {}", e)))?;
    match result.chat_response.into_text() {
        Some(text) if !text.trim().is_empty() => Ok(text),
        _ => Err(GatewayError::EmptyCompletion),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gateway(endpoint: &str) -> HttpOracleGateway {
        HttpOracleGateway::new(OracleSettings {
            endpoint: endpoint.to_string(),
            compartment_id: "ocid1.tenancy.oc1..example".to_string(),
            auth_token: None,
        })
    }

    #[test]
    fn test_chat_url() {
        assert_eq!(
            gateway("https://inference.generativeai.us-chicago-1.oci.oraclecloud.com/").chat_url(),
            "https://inference.generativeai.us-chicago-1.oci.oraclecloud.com/20231130/actions/chat"
        );
    }

    #[test]
    fn test_parse_completion() {
        assert_eq!(
            parse_completion(r#"{"chatResponse": {"text": "hello"}}"#).unwrap(),
            "hello"
        );
        assert_eq!(
            parse_completion(r#"{"chatResponse": {"text": "  "}}"#).unwrap_err(),
            GatewayError::EmptyCompletion
        );
        assert!(matches!(
            parse_completion("<html>gateway timeout</html>"),
            Err(GatewayError::Other(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_connection_error() {
        let gateway = gateway("http://127.0.0.1:9");
        let request = InferenceRequest::new(stepwise_domain::ModelId::reasoning_default(), "hi");
        let err = gateway.infer(&request).await.unwrap_err();
        assert!(matches!(
            err,
            GatewayError::ConnectionError(_) | GatewayError::Timeout
        ));
    }
}
