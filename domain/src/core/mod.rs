//! Core domain concepts shared across all subdomains.
//!
//! - [`model::ModelId`]: oracle model identifiers and their request family
//! - [`error::DomainError`]: domain-level errors

pub mod error;
pub mod model;
pub mod string;
