//! Domain layer for stepwise
//!
//! This crate contains the core entities, value objects and pure rules of the
//! reasoning-and-dispatch loop. It has no dependencies on infrastructure,
//! network I/O or an async runtime.
//!
//! # Core Concepts
//!
//! ## Capability catalog
//!
//! [`ServiceDescriptor`]s describe backend services, how to reach them and
//! which tools they expose. Tool parameters are coerced against the declared
//! schema before anything is sent.
//!
//! ## Workflow
//!
//! A [`WorkflowContext`] holds the query and the append-only list of
//! [`StepRecord`]s for one run. Each step starts as a [`PlanDecision`],
//! either from the reasoning oracle or from the [`FallbackRuleTable`].

pub mod catalog;
pub mod config;
pub mod core;
pub mod planning;
pub mod prompt;
pub mod workflow;

// Re-export commonly used types
pub use catalog::{
    entities::{
        ParameterType, ServiceDescriptor, ServiceRole, ToolCache, ToolDescriptor, ToolParameter,
        join_url,
    },
    parsing::{ToolListingError, parse_tool_listing},
    validation::{ParameterError, ParameterValidator, SchemaValidator, coerce_parameters},
};
pub use config::{
    OutputFormat,
    validation::{ConfigIssue, ConfigIssueCode, Severity},
};
pub use core::{
    error::DomainError,
    model::{ModelFamily, ModelId},
};
pub use planning::{
    fallback::{FallbackRule, FallbackRuleTable, FallbackTarget, QueryPredicate},
    parsing::{RawDecision, decode_structured},
};
pub use prompt::PlannerPromptTemplate;
pub use workflow::{
    entities::{StepOutcome, StepRecord, WorkflowContext, WorkflowResult},
    error::WorkflowError,
    summary::StepSummary,
    value_objects::{
        DecisionSource, PlanDecision, QueryCategory, TerminationReason, ThinkingJudgment,
        WorkflowState,
    },
};
