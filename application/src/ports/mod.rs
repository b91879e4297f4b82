//! Ports (interfaces) for the application layer
//!
//! These traits define the boundaries between the application layer
//! and the infrastructure/presentation layers.

pub mod conversation_logger;
pub mod oracle_gateway;
pub mod service_transport;
pub mod workflow_progress;
