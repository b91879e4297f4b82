//! Service transport port
//!
//! Raw request/response exchange with backend services. Status
//! classification and the write→read fallback live in the dispatcher; the
//! transport only moves bytes and reports transport-level faults.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

/// Call style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportMethod {
    /// Parameters as a JSON body (POST)
    Write,
    /// Parameters as a query string (GET)
    Read,
}

impl std::fmt::Display for TransportMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportMethod::Write => f.write_str("POST"),
            TransportMethod::Read => f.write_str("GET"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransportRequest {
    pub url: String,
    pub method: TransportMethod,
    pub params: Map<String, Value>,
    pub timeout: Duration,
}

impl TransportRequest {
    pub fn read(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            method: TransportMethod::Read,
            params: Map::new(),
            timeout,
        }
    }

    pub fn write(url: impl Into<String>, params: Map<String, Value>, timeout: Duration) -> Self {
        Self {
            url: url.into(),
            method: TransportMethod::Write,
            params,
            timeout,
        }
    }

    pub fn with_params(mut self, params: Map<String, Value>) -> Self {
        self.params = params;
        self
    }
}

/// Status and raw body of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Transport error: {0}")]
    Other(String),
}

#[async_trait]
pub trait ServiceTransport: Send + Sync {
    async fn send(&self, request: &TransportRequest) -> Result<TransportResponse, TransportError>;
}
