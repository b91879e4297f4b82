//! Application-level configuration.
//!
//! - [`WorkflowParams`]: workflow loop control (step budget, timeouts, models)

pub mod workflow_params;

pub use workflow_params::WorkflowParams;
