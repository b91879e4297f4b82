//! Console output formatter for workflow results

use crate::output::formatter::OutputFormatter;
use colored::{ColoredString, Colorize};
use serde_json::Value;
use stepwise_domain::{StepRecord, TerminationReason, WorkflowResult};

/// Longest rendered payload in full output before it is cut
const MAX_PAYLOAD_CHARS: usize = 4000;

/// Formats workflow results for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Turn ANSI colors off for everything rendered afterwards
    pub fn disable_color() {
        colored::control::set_override(false);
    }

    /// Format the complete workflow result
    pub fn format(result: &WorkflowResult) -> String {
        let mut output = String::new();

        output.push_str(&Self::header("Stepwise Results"));
        output.push('\n');

        output.push_str(&format!("{} {}\n", "Query:".cyan().bold(), result.query));
        output.push_str(&format!("{} {}\n", "Status:".cyan().bold(), Self::status(result)));
        if let Some(cause) = &result.stop_cause {
            output.push_str(&format!("{} {}\n", "Cause:".cyan().bold(), cause));
        }
        if let Some(thinking) = &result.thinking {
            output.push_str(&format!(
                "{} {}\n",
                "Category:".cyan().bold(),
                thinking.query_category.as_str()
            ));
        }

        output.push_str(&Self::section_header(&format!("Steps ({})", result.steps.len())));
        if result.steps.is_empty() {
            output.push_str(&format!("\n{}\n", "No steps were executed.".dimmed()));
        }
        for step in &result.steps {
            output.push_str(&Self::format_step(step));
        }

        output.push_str(&Self::section_header("Final Result"));
        match result.final_payload() {
            Some(payload) => {
                output.push('\n');
                output.push_str(&Self::pretty_payload(payload));
                output.push('\n');
            }
            None => output.push_str(&format!("\n{}\n", "(no successful step)".dimmed())),
        }

        output.push_str(&Self::footer());

        output
    }

    /// Format as JSON
    pub fn format_json(result: &WorkflowResult) -> String {
        serde_json::to_string_pretty(result).unwrap_or_else(|_| "{}".to_string())
    }

    /// Format one line per step plus the terminal status
    pub fn format_steps(result: &WorkflowResult) -> String {
        let mut output = String::new();

        for step in &result.steps {
            let mark = if step.succeeded() { "v".green() } else { "x".red() };
            output.push_str(&format!(
                "{} {} {}/{} ({} ms)",
                mark,
                format!("Step {}:", step.index).bold(),
                step.service,
                step.tool,
                step.duration_ms
            ));
            if let Some(error) = &step.outcome.error {
                output.push_str(&format!(" {}", error.red()));
            }
            output.push('\n');
        }

        output.push_str(&format!("{} {}", "=>".cyan(), Self::status(result)));
        if let Some(cause) = &result.stop_cause {
            output.push_str(&format!(" ({})", cause));
        }
        output.push('\n');

        output
    }

    fn format_step(step: &StepRecord) -> String {
        let title = format!(
            "── Step {}: {}/{} ({} ms) ──",
            step.index, step.service, step.tool, step.duration_ms
        );
        let mut output = if step.succeeded() {
            format!("\n{}\n", title.yellow().bold())
        } else {
            format!("\n{}\n", title.red().bold())
        };

        if !step.reasoning.is_empty() {
            output.push_str(&format!("{} {}\n", "Reasoning:".dimmed(), step.reasoning));
        }
        if !step.refinement.is_empty() {
            output.push_str(&format!("{} {}\n", "Refinement:".dimmed(), step.refinement));
        }
        if !step.parameters.is_empty() {
            let params = serde_json::to_string(&step.parameters).unwrap_or_default();
            output.push_str(&format!("{} {}\n", "Parameters:".dimmed(), params));
        }
        if let Some(error) = &step.outcome.error {
            output.push_str(&format!("{} {}\n", "Error:".red().bold(), error));
        }

        output
    }

    fn status(result: &WorkflowResult) -> ColoredString {
        let label = result.termination.as_str();
        match (result.termination, result.success) {
            (TerminationReason::Done, true) => label.green().bold(),
            (_, false) => label.red().bold(),
            (_, true) => format!("{} (best effort)", label).yellow().bold(),
        }
    }

    fn pretty_payload(payload: &Value) -> String {
        let text = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
        if text.chars().count() <= MAX_PAYLOAD_CHARS {
            return text;
        }
        let cut: String = text.chars().take(MAX_PAYLOAD_CHARS).collect();
        format!("{}\n{}", cut, "... (truncated, use --output json for everything)".dimmed())
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, result: &WorkflowResult) -> String {
        Self::format(result)
    }

    fn format_json(&self, result: &WorkflowResult) -> String {
        Self::format_json(result)
    }

    fn format_steps(&self, result: &WorkflowResult) -> String {
        Self::format_steps(result)
    }
}
