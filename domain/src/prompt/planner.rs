//! Prompt templates for the planning and refinement passes

use crate::catalog::entities::{ServiceDescriptor, ToolDescriptor};
use crate::workflow::summary::StepSummary;
use crate::workflow::value_objects::{PlanDecision, ThinkingJudgment};
use serde_json::Value;

/// Section headers identifying each prompt kind
pub const THINKING_MARKER: &str = "## Thinking Pass";
pub const DECISION_MARKER: &str = "## Decision Pass";
pub const REFINEMENT_MARKER: &str = "## Parameter Refinement";
pub const REPAIR_MARKER: &str = "## Output Repair";

const OUTPUT_RULES: &str = "OUTPUT RULES (MANDATORY):
- Return ONLY a single JSON object on one line. No markdown, no prose, no code fences.
- Use only double quotes for all keys and strings.";

/// Templates for the oracle prompts used by a workflow run
pub struct PlannerPromptTemplate;

impl PlannerPromptTemplate {
    /// First pass: a small judgment about what the query needs
    pub fn thinking(query: &str, summaries: &[StepSummary]) -> String {
        let schema = r#"{"query_category":"personal_recommendation|general_search|update_request","user_mentioned":"string|null","needs_user_context":true,"thought_process":"string","recommended_approach":"string"}"#;

        format!(
            r#"{THINKING_MARKER}

You are analyzing a user's query to understand what information is needed to give the best possible answer.

User Query: "{query}"
{history}
Think about this query:
1. What is the user asking for?
2. Is the answer specific to a person whose profile must be looked up first?
3. What is the best next approach?

{OUTPUT_RULES}

JSON Schema: {schema}"#,
            history = Self::history_section(summaries),
        )
    }

    /// Second pass: a concrete decision against the full catalog
    pub fn decision(
        query: &str,
        thinking: &ThinkingJudgment,
        services: &[ServiceDescriptor],
        summaries: &[StepSummary],
    ) -> String {
        let thinking_json = serde_json::to_string(thinking).unwrap_or_default();

        format!(
            r#"{DECISION_MARKER}

You select the next service and tool to call for the user's query.

# Available services and tools

{catalog}

# User query: "{query}"
{history}
# Prior analysis
{thinking_json}

# Decision rules
- Personalised queries that name a person: look the person up first, then use what was found.
- General queries: call the search service directly.
- Progress or skill updates: call the update service.
- If earlier steps already succeeded, decide whether another step is still needed.

# Required output
{{"service": "service-key", "tool": "tool-name", "parameters": {{"key": "value"}}, "reasoning": "short explanation", "completion": true}}

- "tool" is a tool or endpoint name of the chosen service, never the service name.
- "completion" is false when this step only gathers context for a later step, true when it answers the request.

{OUTPUT_RULES}"#,
            catalog = Self::catalog_section(services),
            history = Self::history_section(summaries),
        )
    }

    /// Refinement pass: re-derive parameters against the full prior payloads
    pub fn refinement(
        query: &str,
        decision: &PlanDecision,
        tool: Option<&ToolDescriptor>,
        history: &Value,
    ) -> String {
        let params_json = serde_json::to_string(&decision.parameters).unwrap_or_default();
        let history_json = serde_json::to_string_pretty(history).unwrap_or_default();
        let schema = match tool {
            Some(tool) if tool.has_schema() => Self::parameter_lines(tool),
            _ => "    (no declared parameters)".to_string(),
        };

        format!(
            r#"{REFINEMENT_MARKER}

Improve the parameters of the next tool call using the results of previous steps.

User query: "{query}"
Next call: {service}/{tool_name}
Planner reasoning: {reasoning}
Proposed parameters: {params_json}

Declared parameters:
{schema}

Previous step results:
{history_json}

Replace raw references with resolved values where that serves the tool. For example, when a previous step returned a user's skills, search with those skills instead of the user's name. Keep parameters that are already right.

{OUTPUT_RULES}

JSON Schema: {{"parameters": {{"key": "value"}}, "rationale": "string"}}"#,
            service = decision.service,
            tool_name = decision.tool,
            reasoning = decision.reasoning,
        )
    }

    /// Ask the oracle to reformat its own malformed output
    pub fn repair(raw: &str) -> String {
        format!(
            r#"{REPAIR_MARKER}

The following text was supposed to be a single JSON object but could not be parsed.
Reformat it as a single-line valid JSON object. Keep the same fields and values.

{OUTPUT_RULES}

Text:
{raw}"#
        )
    }

    fn history_section(summaries: &[StepSummary]) -> String {
        if summaries.is_empty() {
            return String::new();
        }
        let lines: Vec<String> = summaries.iter().map(StepSummary::render_line).collect();
        format!("\nPrevious steps completed:\n{}\n", lines.join("\n"))
    }

    fn catalog_section(services: &[ServiceDescriptor]) -> String {
        services
            .iter()
            .map(|service| {
                let hints = if service.use_when.is_empty() {
                    String::new()
                } else {
                    format!(" (Use when: {})", service.use_when.join(", "))
                };
                let tools = service
                    .tools()
                    .iter()
                    .map(|tool| {
                        let params = tool.parameter_names().join(", ");
                        format!("   - {}({}): {}", tool.name, params, tool.description)
                    })
                    .chain(
                        // Endpoint keys the tool list does not already cover
                        service
                            .operation_names()
                            .filter(|op| {
                                service.find_tool(op).is_none()
                                    && !service.tool_endpoints.contains_key(*op)
                            })
                            .map(|op| format!("   - {}", op)),
                    )
                    .collect::<Vec<_>>()
                    .join("\n");

                format!(
                    "{}{}: {}\n{}",
                    service.key, hints, service.description, tools
                )
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn parameter_lines(tool: &ToolDescriptor) -> String {
        tool.parameters
            .iter()
            .map(|p| {
                let ty = p.param_type.map(|t| t.as_str()).unwrap_or("any");
                let required = if p.required { ", required" } else { "" };
                format!("    - {} ({}{}): {}", p.name, ty, required, p.description)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::entities::{ParameterType, ServiceRole, ToolParameter};
    use crate::workflow::entities::{StepOutcome, WorkflowContext};
    use serde_json::json;

    fn services() -> Vec<ServiceDescriptor> {
        vec![
            ServiceDescriptor::new("semantic_search", "Semantic Search", "http://search")
                .with_description("Vector search over workshops")
                .with_use_when("finding workshops")
                .with_role(ServiceRole::ContentSearch)
                .with_endpoint("search", "/search")
                .with_endpoint("health", "/health")
                .with_tool_endpoint("search_livelabs_workshops", "search")
                .with_static_tool(
                    ToolDescriptor::new("search_livelabs_workshops", "Search workshops")
                        .with_parameter(
                            ToolParameter::new("query")
                                .with_type(ParameterType::String)
                                .required(),
                        ),
                ),
        ]
    }

    #[test]
    fn test_each_prompt_carries_only_its_marker() {
        let thinking = PlannerPromptTemplate::thinking("q", &[]);
        let decision = PlannerPromptTemplate::decision(
            "q",
            &ThinkingJudgment::default(),
            &services(),
            &[],
        );
        let refinement = PlannerPromptTemplate::refinement(
            "q",
            &PlanDecision::new("semantic_search", "search_livelabs_workshops"),
            None,
            &json!([]),
        );
        let repair = PlannerPromptTemplate::repair("not json");

        let markers = [THINKING_MARKER, DECISION_MARKER, REFINEMENT_MARKER, REPAIR_MARKER];
        for (prompt, own) in [
            (&thinking, THINKING_MARKER),
            (&decision, DECISION_MARKER),
            (&refinement, REFINEMENT_MARKER),
            (&repair, REPAIR_MARKER),
        ] {
            for marker in markers {
                assert_eq!(prompt.contains(marker), marker == own, "{}", marker);
            }
        }
    }

    #[test]
    fn test_decision_lists_tools_and_hides_utility_endpoints() {
        let prompt = PlannerPromptTemplate::decision(
            "List database workshops",
            &ThinkingJudgment::default(),
            &services(),
            &[],
        );
        assert!(prompt.contains("semantic_search (Use when: finding workshops)"));
        assert!(prompt.contains("search_livelabs_workshops(query): Search workshops"));
        assert!(!prompt.contains("health"));
        assert!(!prompt.contains("Previous steps"));
    }

    #[test]
    fn test_history_uses_summaries_not_payloads() {
        let mut context = WorkflowContext::new("Find user Jane");
        context.record_step(
            &PlanDecision::new("nl_query", "query_database_nl"),
            StepOutcome::success(json!({"results": [{"name": "Jane", "skills": ["SQL"]}]})),
            "",
            3,
        );
        let prompt = PlannerPromptTemplate::thinking(context.query(), &context.summaries());
        assert!(prompt.contains("Step 1: nl_query/query_database_nl -> success (keys: results)"));
        assert!(!prompt.contains("SQL"));

        let refinement = PlannerPromptTemplate::refinement(
            context.query(),
            &PlanDecision::new("semantic_search", "search_livelabs_workshops"),
            services()[0].find_tool("search_livelabs_workshops"),
            &context.full_history(),
        );
        assert!(refinement.contains("\"SQL\""));
        assert!(refinement.contains("- query (string, required)"));
    }

    #[test]
    fn test_repair_resends_raw_text() {
        let prompt = PlannerPromptTemplate::repair("service: search");
        assert!(prompt.ends_with("service: search"));
        assert!(prompt.contains("single-line valid JSON object"));
    }
}
