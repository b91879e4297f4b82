//! Capability catalog data: service descriptors, their tools, and the
//! parameter schema helpers used before dispatch.

pub mod entities;
pub mod parsing;
pub mod validation;
