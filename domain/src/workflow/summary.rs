//! Size-bounded step summaries for planning prompts.
//!
//! A summary carries a fixed set of fields per step (no payload values), so
//! prompt size grows linearly with the number of steps and never with the
//! size of a service response.

use super::entities::StepRecord;
use serde::Serialize;
use serde_json::Value;

/// Maximum result key names listed per step
pub const MAX_SUMMARY_KEYS: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepSummary {
    pub index: usize,
    pub service: String,
    pub tool: String,
    pub success: bool,
    pub result_keys: Vec<String>,
    /// Number of keys left out after the cap
    pub omitted_keys: usize,
}

impl StepSummary {
    pub fn of(step: &StepRecord) -> Self {
        let mut keys: Vec<String> = match &step.outcome.payload {
            Some(Value::Object(map)) => map
                .keys()
                .filter(|k| k.as_str() != "success")
                .cloned()
                .collect(),
            _ => Vec::new(),
        };
        let omitted_keys = keys.len().saturating_sub(MAX_SUMMARY_KEYS);
        keys.truncate(MAX_SUMMARY_KEYS);

        Self {
            index: step.index,
            service: step.service.clone(),
            tool: step.tool.clone(),
            success: step.outcome.success,
            result_keys: keys,
            omitted_keys,
        }
    }

    /// One prompt line, e.g. `Step 1: nl_query/query_database_nl -> success (keys: results)`
    pub fn render_line(&self) -> String {
        let status = if self.success { "success" } else { "failure" };
        let mut line = format!(
            "Step {}: {}/{} -> {}",
            self.index, self.service, self.tool, status
        );
        if !self.result_keys.is_empty() {
            line.push_str(&format!(" (keys: {}", self.result_keys.join(", ")));
            if self.omitted_keys > 0 {
                line.push_str(&format!(", +{} more", self.omitted_keys));
            }
            line.push(')');
        }
        line
    }
}
