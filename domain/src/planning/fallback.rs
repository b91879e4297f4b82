//! Deterministic fallback rule table
//!
//! Used when the oracle cannot produce a usable decision. Rules are evaluated
//! top-down; the first rule whose predicate holds and whose target resolves to
//! an enabled service with at least one tool wins. This is the only place in
//! the workspace where the query text is keyword-matched.

use crate::catalog::entities::{ServiceDescriptor, ServiceRole};
use crate::workflow::entities::WorkflowContext;
use crate::workflow::value_objects::PlanDecision;

const IDENTITY_WORDS: &[&str] = &["my", "me", "i'm", "im", "mine"];
const IDENTITY_PHRASES: &[&str] = &["i am", "what should i", "who is", "my name"];
const UPDATE_WORDS: &[&str] = &[
    "completed", "complete", "finished", "finish", "update", "updated", "mark",
];

/// Condition on the query and the run so far
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryPredicate {
    /// Identity or possessive language, and no profile has been resolved yet
    IdentityWithoutProfile,
    /// The user asks to record progress or skills
    UpdateLanguage,
    Always,
}

impl QueryPredicate {
    pub fn holds(
        &self,
        query: &str,
        context: &WorkflowContext,
        services: &[ServiceDescriptor],
    ) -> bool {
        match self {
            QueryPredicate::IdentityWithoutProfile => {
                has_identity_language(query) && !has_resolved_profile(context, services)
            }
            QueryPredicate::UpdateLanguage => has_update_language(query),
            QueryPredicate::Always => true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackTarget {
    Role(ServiceRole),
    /// First enabled service by key
    AnyService,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackRule {
    pub name: &'static str,
    pub predicate: QueryPredicate,
    pub target: FallbackTarget,
    pub completion: bool,
}

/// Ordered predicate → target table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FallbackRuleTable {
    rules: Vec<FallbackRule>,
}

impl Default for FallbackRuleTable {
    fn default() -> Self {
        Self::new(vec![
            FallbackRule {
                name: "identity_first",
                predicate: QueryPredicate::IdentityWithoutProfile,
                target: FallbackTarget::Role(ServiceRole::ProfileLookup),
                completion: false,
            },
            FallbackRule {
                name: "update_request",
                predicate: QueryPredicate::UpdateLanguage,
                target: FallbackTarget::Role(ServiceRole::DataUpdate),
                completion: true,
            },
            FallbackRule {
                name: "general_search",
                predicate: QueryPredicate::Always,
                target: FallbackTarget::Role(ServiceRole::ContentSearch),
                completion: true,
            },
            FallbackRule {
                name: "any_service",
                predicate: QueryPredicate::Always,
                target: FallbackTarget::AnyService,
                completion: true,
            },
        ])
    }
}

impl FallbackRuleTable {
    pub fn new(rules: Vec<FallbackRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[FallbackRule] {
        &self.rules
    }

    /// First matching rule's decision, or `None` when nothing resolves
    /// (in practice: no enabled service with a tool).
    pub fn evaluate(
        &self,
        query: &str,
        context: &WorkflowContext,
        services: &[ServiceDescriptor],
    ) -> Option<PlanDecision> {
        let mut candidates: Vec<&ServiceDescriptor> =
            services.iter().filter(|s| s.enabled).collect();
        candidates.sort_by(|a, b| a.key.cmp(&b.key));

        self.rules.iter().find_map(|rule| {
            if !rule.predicate.holds(query, context, services) {
                return None;
            }
            let (service, tool) = candidates
                .iter()
                .filter(|s| match rule.target {
                    FallbackTarget::Role(role) => s.role == role,
                    FallbackTarget::AnyService => true,
                })
                .find_map(|s| s.default_tool().map(|tool| (*s, tool)))?;

            Some(
                PlanDecision::new(service.key.clone(), tool)
                    .with_param("query", query)
                    .with_completion(rule.completion)
                    .with_reasoning(format!(
                        "Fallback rule '{}' routed the query to {}",
                        rule.name, service.name
                    ))
                    .from_rule(rule.name),
            )
        })
    }
}

/// Lowercased words with surrounding punctuation stripped
fn words(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|w| {
            w.trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_lowercase()
                .replace('\u{2019}', "'")
        })
        .filter(|w| !w.is_empty())
        .collect()
}

pub fn has_identity_language(query: &str) -> bool {
    let words = words(query);
    if words.iter().any(|w| IDENTITY_WORDS.contains(&w.as_str())) {
        return true;
    }
    let padded = format!(" {} ", words.join(" "));
    if IDENTITY_PHRASES
        .iter()
        .any(|phrase| padded.contains(&format!(" {} ", phrase)))
    {
        return true;
    }
    has_proper_name(query)
}

/// A capitalised word (not all-caps) anywhere after the first word
fn has_proper_name(query: &str) -> bool {
    query.split_whitespace().skip(1).any(|raw| {
        let word = raw.trim_matches(|c: char| !c.is_alphanumeric());
        let mut chars = word.chars();
        match chars.next() {
            Some(first) if first.is_uppercase() => chars.any(char::is_lowercase),
            _ => false,
        }
    })
}

pub fn has_update_language(query: &str) -> bool {
    let words = words(query);
    if words.iter().any(|w| UPDATE_WORDS.contains(&w.as_str())) {
        return true;
    }
    let adds = words.iter().any(|w| w == "add" || w == "added");
    let skill = words.iter().any(|w| w.starts_with("skill"));
    adds && skill
}

fn has_resolved_profile(context: &WorkflowContext, services: &[ServiceDescriptor]) -> bool {
    context.steps().iter().any(|step| {
        step.succeeded()
            && services
                .iter()
                .any(|s| s.key == step.service && s.role == ServiceRole::ProfileLookup)
    })
}
