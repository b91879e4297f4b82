//! Presentation layer for stepwise
//!
//! This crate contains the CLI definition, console output formatting
//! and progress display for workflow runs.

pub mod cli;
pub mod output;
pub mod progress;

pub use cli::commands::{Cli, OutputMode};
pub use output::{console::ConsoleFormatter, formatter::OutputFormatter};
pub use progress::reporter::{ProgressReporter, SimpleProgress};
