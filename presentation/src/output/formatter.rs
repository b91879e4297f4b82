//! Output formatter trait

use stepwise_domain::{OutputFormat, WorkflowResult};

/// Trait for formatting workflow results
pub trait OutputFormatter {
    /// Format the step trace and the final payload
    fn format(&self, result: &WorkflowResult) -> String;

    /// Format as JSON
    fn format_json(&self, result: &WorkflowResult) -> String;

    /// Format one line per step (concise output)
    fn format_steps(&self, result: &WorkflowResult) -> String;

    /// Dispatch on the configured output format
    fn render(&self, result: &WorkflowResult, format: OutputFormat) -> String {
        match format {
            OutputFormat::Full => self.format(result),
            OutputFormat::Steps => self.format_steps(result),
            OutputFormat::Json => self.format_json(result),
        }
    }
}
