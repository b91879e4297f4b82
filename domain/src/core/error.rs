//! Domain error types

use thiserror::Error;

/// Domain-level errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid model: {0}")]
    InvalidModel(String),

    #[error("Invalid service descriptor '{key}': {reason}")]
    InvalidService { key: String, reason: String },
}
