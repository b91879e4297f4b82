//! Oracle gateway port
//!
//! Defines the interface for a single inference call to the reasoning oracle.
//! The request shape of each model family is an adapter concern.

use async_trait::async_trait;
use stepwise_domain::ModelId;
use thiserror::Error;

/// Errors that can occur during an inference call
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Connection error: {0}")]
    ConnectionError(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Timeout")]
    Timeout,

    #[error("Empty completion")]
    EmptyCompletion,

    #[error("Other error: {0}")]
    Other(String),
}

/// One inference request
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceRequest {
    pub model: ModelId,
    pub prompt: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

impl InferenceRequest {
    pub fn new(model: ModelId, prompt: impl Into<String>) -> Self {
        Self {
            model,
            prompt: prompt.into(),
            temperature: 0.0,
            max_output_tokens: 400,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = max_output_tokens;
        self
    }
}

/// Gateway for the reasoning oracle
///
/// Implementations (adapters) live in the infrastructure layer. A successful
/// call returns the free-text completion; every failure is a [`GatewayError`].
#[async_trait]
pub trait OracleGateway: Send + Sync {
    async fn infer(&self, request: &InferenceRequest) -> Result<String, GatewayError>;
}
