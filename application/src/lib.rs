//! Application layer for stepwise
//!
//! This crate contains use cases, port definitions, the capability catalog
//! registry and application configuration. It depends only on the domain layer.

pub mod catalog;
pub mod config;
pub mod oracle;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use catalog::CapabilityCatalog;
pub use config::WorkflowParams;
pub use oracle::{OracleClient, OracleError};
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    oracle_gateway::{GatewayError, InferenceRequest, OracleGateway},
    service_transport::{
        ServiceTransport, TransportError, TransportMethod, TransportRequest, TransportResponse,
    },
    workflow_progress::{NoWorkflowProgress, WorkflowProgressNotifier},
};
pub use use_cases::dispatch_tool::{DispatchOutcome, ToolDispatcher};
pub use use_cases::plan_step::{PlannedStep, StepPlanner};
pub use use_cases::refine_parameters::{ParameterRefiner, RefinedDecision};
pub use use_cases::run_workflow::{
    RunWorkflowError, RunWorkflowInput, RunWorkflowUseCase, WorkflowHandle, WorkflowRunner,
};
