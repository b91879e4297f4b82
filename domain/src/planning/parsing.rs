//! Decoding of oracle text into typed values.
//!
//! Accepts either the whole (trimmed) text as JSON or the body of a single
//! fenced code block (` ```json ... ``` ` or a bare ` ``` ` fence). Nothing
//! else is scanned for: partial objects are left to the repair pass.

use crate::workflow::value_objects::PlanDecision;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Parse `text` as `T`, returning a human-readable reason on failure
pub fn decode_structured<T: DeserializeOwned>(text: &str) -> Result<T, String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err("empty completion".to_string());
    }

    let whole_err = match serde_json::from_str::<T>(trimmed) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    match fenced_block(trimmed) {
        Some(body) => serde_json::from_str::<T>(body.trim())
            .map_err(|e| format!("fenced block is not valid: {}", e)),
        None => Err(whole_err.to_string()),
    }
}

/// Body of the single fenced code block in `text`, if there is exactly one
fn fenced_block(text: &str) -> Option<&str> {
    let mut fences = text.match_indices("```").map(|(i, _)| i);
    let open = fences.next()?;
    let close = fences.next()?;
    if fences.next().is_some() {
        return None;
    }
    let inner = &text[open + 3..close];
    // Drop the info string (`json`, `JSON`, ...) on the opening line
    match inner.find('\n') {
        Some(newline) if !inner[..newline].trim_start().starts_with('{') => {
            Some(&inner[newline + 1..])
        }
        _ => Some(inner),
    }
}

/// Decision as the oracle writes it, with the accepted field spellings
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawDecision {
    pub service: Option<String>,
    #[serde(alias = "action")]
    pub tool: Option<String>,
    #[serde(alias = "params")]
    pub parameters: Option<Value>,
    pub reasoning: Option<String>,
    #[serde(alias = "workflow_complete")]
    pub completion: Option<Value>,
}

impl RawDecision {
    /// A decision with non-empty service and tool, or `None`
    pub fn into_decision(self) -> Option<PlanDecision> {
        let service = self.service.map(|s| s.trim().to_string())?;
        let tool = self.tool.map(|t| t.trim().to_string())?;
        if service.is_empty() || tool.is_empty() {
            return None;
        }

        let parameters = match self.parameters {
            Some(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let completion = match self.completion {
            Some(Value::Bool(b)) => b,
            Some(Value::String(s)) => matches!(s.trim().to_ascii_lowercase().as_str(), "true" | "yes"),
            _ => false,
        };

        let mut decision = PlanDecision::new(service, tool)
            .with_reasoning(self.reasoning.unwrap_or_default())
            .with_completion(completion);
        decision.parameters = parameters;
        Some(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_whole_text() {
        let raw: RawDecision = decode_structured(
            r#"  {"service": "semantic_search", "tool": "search", "parameters": {"query": "sql"}, "completion": true} "#,
        )
        .unwrap();
        let decision = raw.into_decision().unwrap();
        assert_eq!(decision.service, "semantic_search");
        assert!(decision.completion);
        assert_eq!(decision.parameters["query"], json!("sql"));
    }

    #[test]
    fn test_decode_fenced_block() {
        let text = "Here you go:\n```json\n{\"service\": \"nl_query\", \"action\": \"query_database_nl\", \"workflow_complete\": \"false\"}\n```\nThanks";
        let decision = decode_structured::<RawDecision>(text)
            .unwrap()
            .into_decision()
            .unwrap();
        assert_eq!(decision.tool, "query_database_nl");
        assert!(!decision.completion);
    }

    #[test]
    fn test_decode_rejects_prose_and_multiple_blocks() {
        assert!(decode_structured::<RawDecision>("I would search for workshops").is_err());
        assert!(decode_structured::<RawDecision>("").is_err());
        let two = "```\n{}\n```\n```\n{}\n```";
        assert!(decode_structured::<RawDecision>(two).is_err());
    }

    #[test]
    fn test_into_decision_requires_service_and_tool() {
        let raw: RawDecision = serde_json::from_value(json!({"service": "x"})).unwrap();
        assert!(raw.into_decision().is_none());
        let raw: RawDecision =
            serde_json::from_value(json!({"service": " ", "tool": "t"})).unwrap();
        assert!(raw.into_decision().is_none());
    }

    #[test]
    fn test_non_object_parameters_become_empty() {
        let raw: RawDecision = serde_json::from_value(
            json!({"service": "s", "tool": "t", "parameters": "query=sql"}),
        )
        .unwrap();
        assert!(raw.into_decision().unwrap().parameters.is_empty());
    }
}
