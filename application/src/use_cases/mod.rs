//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod dispatch_tool;
pub mod plan_step;
pub mod refine_parameters;
pub mod run_workflow;
pub(crate) mod shared;
