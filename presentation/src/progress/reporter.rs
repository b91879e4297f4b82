//! Progress reporting for workflow runs

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;
use stepwise_application::ports::workflow_progress::WorkflowProgressNotifier;
use stepwise_domain::{PlanDecision, StepRecord, ThinkingJudgment, WorkflowResult, WorkflowState};

/// Reports progress with a spinner that follows the controller state
pub struct ProgressReporter {
    spinner: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self {
            spinner: Mutex::new(None),
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }

    fn state_display_name(state: WorkflowState) -> &'static str {
        match state {
            WorkflowState::Planning => "Planning",
            WorkflowState::Refining => "Refining",
            WorkflowState::Dispatching => "Dispatching",
            WorkflowState::Evaluating => "Evaluating",
            WorkflowState::Terminated(_) => "Finished",
        }
    }

    /// Run `f` against the spinner, creating it on first use
    fn with_spinner(&self, f: impl FnOnce(&ProgressBar)) {
        let Ok(mut guard) = self.spinner.lock() else {
            return;
        };
        let pb = guard.get_or_insert_with(|| {
            let pb = ProgressBar::new_spinner();
            pb.set_style(Self::spinner_style());
            pb.enable_steady_tick(Duration::from_millis(100));
            pb
        });
        f(pb);
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowProgressNotifier for ProgressReporter {
    fn on_state_change(&self, state: WorkflowState) {
        if state.is_terminal() {
            return;
        }
        self.with_spinner(|pb| pb.set_prefix(Self::state_display_name(state)));
    }

    fn on_thinking(&self, judgment: &ThinkingJudgment) {
        self.with_spinner(|pb| {
            pb.set_message(format!("query looks like {}", judgment.query_category.as_str()))
        });
    }

    fn on_decision(&self, decision: &PlanDecision) {
        self.with_spinner(|pb| pb.set_message(format!("{}/{}", decision.service, decision.tool)));
    }

    fn on_fallback(&self, rule: &str, reason: &str) {
        self.with_spinner(|pb| {
            pb.println(format!("  {} fallback rule {}: {}", "!".yellow(), rule.bold(), reason))
        });
    }

    fn on_dispatch_start(&self, step: usize, service: &str, tool: &str) {
        self.with_spinner(|pb| pb.set_message(format!("step {} -> {}/{}", step, service, tool)));
    }

    fn on_step_recorded(&self, record: &StepRecord) {
        let line = if record.succeeded() {
            format!(
                "  {} Step {}: {}/{} ({} ms)",
                "v".green(),
                record.index,
                record.service,
                record.tool,
                record.duration_ms
            )
        } else {
            format!(
                "  {} Step {}: {}/{} {}",
                "x".red(),
                record.index,
                record.service,
                record.tool,
                record.outcome.error.as_deref().unwrap_or("failed").red()
            )
        };
        self.with_spinner(|pb| pb.println(line));
    }

    fn on_finished(&self, _result: &WorkflowResult) {
        if let Ok(mut guard) = self.spinner.lock()
            && let Some(pb) = guard.take()
        {
            pb.finish_and_clear();
        }
    }
}

/// Simple text-based progress on stderr (no fancy UI)
pub struct SimpleProgress;

impl WorkflowProgressNotifier for SimpleProgress {
    fn on_fallback(&self, rule: &str, reason: &str) {
        eprintln!("  {} fallback rule {}: {}", "!".yellow(), rule.bold(), reason);
    }

    fn on_dispatch_start(&self, step: usize, service: &str, tool: &str) {
        eprintln!("{} {} {}/{}", "->".cyan(), format!("Step {}", step).bold(), service, tool);
    }

    fn on_step_recorded(&self, record: &StepRecord) {
        if record.succeeded() {
            eprintln!("  {} {} ms", "v".green(), record.duration_ms);
        } else {
            eprintln!(
                "  {} {}",
                "x".red(),
                record.outcome.error.as_deref().unwrap_or("failed")
            );
        }
    }

    fn on_finished(&self, result: &WorkflowResult) {
        eprintln!("{} {}", "=>".cyan(), result.termination);
        eprintln!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use stepwise_domain::{StepOutcome, TerminationReason, WorkflowContext};

    #[test]
    fn test_reporter_spinner_lifecycle() {
        let reporter = ProgressReporter::new();
        reporter.on_state_change(WorkflowState::Planning);
        reporter.on_decision(&PlanDecision::new("semantic_search", "search_workshops"));
        assert!(reporter.spinner.lock().unwrap().is_some());

        let mut context = WorkflowContext::new("q");
        context.record_step(
            &PlanDecision::new("semantic_search", "search_workshops"),
            StepOutcome::success(json!({"results": []})),
            "",
            3,
        );
        let result = WorkflowResult::from_context(context, TerminationReason::Done, None, None);
        reporter.on_step_recorded(&result.steps[0]);
        reporter.on_state_change(WorkflowState::Terminated(TerminationReason::Done));
        reporter.on_finished(&result);

        assert!(reporter.spinner.lock().unwrap().is_none());
    }

    #[test]
    fn test_finish_without_spinner_is_noop() {
        let reporter = ProgressReporter::default();
        let result = WorkflowResult::from_context(
            WorkflowContext::new("q"),
            TerminationReason::Failed,
            None,
            None,
        );
        reporter.on_finished(&result);
        assert!(reporter.spinner.lock().unwrap().is_none());
    }
}
