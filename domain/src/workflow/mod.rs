//! Workflow domain: the per-run context, step records, plan decisions and
//! the terminal result.

pub mod entities;
pub mod error;
pub mod summary;
pub mod value_objects;
