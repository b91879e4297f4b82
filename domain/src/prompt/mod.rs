//! Prompt domain
//!
//! Templates for the oracle prompts issued during a workflow run.

pub mod planner;

pub use planner::PlannerPromptTemplate;
