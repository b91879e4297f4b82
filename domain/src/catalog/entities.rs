//! Catalog entities: services, their tools, and the tool cache

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Endpoint keys that are plumbing rather than callable operations.
pub const UTILITY_ENDPOINTS: &[&str] = &["health", "tools"];

/// Discovery address used when a service has no `tools` endpoint entry.
pub const DEFAULT_DISCOVERY_SUFFIX: &str = "/tools";

/// Coarse role of a service, consulted only by the fallback rule table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceRole {
    /// Resolves people to their profile (skills, history)
    ProfileLookup,
    /// General content search
    ContentSearch,
    /// Writes records (progress, skills)
    DataUpdate,
    #[default]
    General,
}

impl ServiceRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceRole::ProfileLookup => "profile_lookup",
            ServiceRole::ContentSearch => "content_search",
            ServiceRole::DataUpdate => "data_update",
            ServiceRole::General => "general",
        }
    }
}

impl std::fmt::Display for ServiceRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declared type of a tool parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParameterType {
    /// Parse a loosely spelled type name (`str`, `int`, `list`, ...)
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "string" | "str" | "text" => Some(ParameterType::String),
            "integer" | "int" => Some(ParameterType::Integer),
            "number" | "float" | "double" => Some(ParameterType::Number),
            "boolean" | "bool" => Some(ParameterType::Boolean),
            "array" | "list" => Some(ParameterType::Array),
            "object" | "dict" | "map" => Some(ParameterType::Object),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "string",
            ParameterType::Integer => "integer",
            ParameterType::Number => "number",
            ParameterType::Boolean => "boolean",
            ParameterType::Array => "array",
            ParameterType::Object => "object",
        }
    }
}

impl std::fmt::Display for ParameterType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter of a tool. The type is absent when the service did not publish one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub param_type: Option<ParameterType>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub description: String,
}

impl ToolParameter {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type: None,
            required: false,
            description: String::new(),
        }
    }

    pub fn with_type(mut self, param_type: ParameterType) -> Self {
        self.param_type = Some(param_type);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A callable tool exposed by a service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Ordered parameters (best effort; may be empty when no schema is known)
    #[serde(default)]
    pub parameters: Vec<ToolParameter>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, param: ToolParameter) -> Self {
        self.parameters.push(param);
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&ToolParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn parameter_names(&self) -> Vec<&str> {
        self.parameters.iter().map(|p| p.name.as_str()).collect()
    }

    pub fn has_schema(&self) -> bool {
        !self.parameters.is_empty()
    }
}

/// Tools discovered from a service, stamped with the refresh time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCache {
    pub tools: Vec<ToolDescriptor>,
    pub refreshed_at: DateTime<Utc>,
}

/// Everything needed to describe and reach one backend service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub key: String,
    pub name: String,
    pub description: String,
    pub base_url: String,
    /// Logical operation → address suffix (e.g. `search` → `/search`)
    pub endpoints: BTreeMap<String, String>,
    pub use_when: Vec<String>,
    pub role: ServiceRole,
    /// Tool name → endpoint key (e.g. `search_livelabs_workshops` → `search`)
    pub tool_endpoints: BTreeMap<String, String>,
    /// Canonical parameter name → the field name this service expects
    pub parameter_aliases: BTreeMap<String, String>,
    /// Tools declared in configuration, used until discovery yields some
    pub static_tools: Vec<ToolDescriptor>,
    pub enabled: bool,
    pub tool_cache: Option<ToolCache>,
    /// Last discovery attempt, successful or not
    pub discovery_attempted_at: Option<DateTime<Utc>>,
}

impl ServiceDescriptor {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: String::new(),
            base_url: base_url.into(),
            endpoints: BTreeMap::new(),
            use_when: Vec::new(),
            role: ServiceRole::General,
            tool_endpoints: BTreeMap::new(),
            parameter_aliases: BTreeMap::new(),
            static_tools: Vec::new(),
            enabled: true,
            tool_cache: None,
            discovery_attempted_at: None,
        }
    }

    // ==================== Builder Methods ====================

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_endpoint(mut self, operation: impl Into<String>, suffix: impl Into<String>) -> Self {
        self.endpoints.insert(operation.into(), suffix.into());
        self
    }

    pub fn with_use_when(mut self, hint: impl Into<String>) -> Self {
        self.use_when.push(hint.into());
        self
    }

    pub fn with_role(mut self, role: ServiceRole) -> Self {
        self.role = role;
        self
    }

    pub fn with_tool_endpoint(mut self, tool: impl Into<String>, endpoint: impl Into<String>) -> Self {
        self.tool_endpoints.insert(tool.into(), endpoint.into());
        self
    }

    pub fn with_parameter_alias(
        mut self,
        canonical: impl Into<String>,
        field: impl Into<String>,
    ) -> Self {
        self.parameter_aliases.insert(canonical.into(), field.into());
        self
    }

    pub fn with_static_tool(mut self, tool: ToolDescriptor) -> Self {
        self.static_tools.push(tool);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    // ==================== Tools ====================

    /// Discovered tools when discovery produced any, otherwise the configured ones
    pub fn tools(&self) -> &[ToolDescriptor] {
        match &self.tool_cache {
            Some(cache) if !cache.tools.is_empty() => &cache.tools,
            _ => &self.static_tools,
        }
    }

    pub fn find_tool(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools().iter().find(|t| t.name == name).or_else(|| {
            // An endpoint key may be used in place of the tool mapped onto it
            self.tool_endpoints
                .iter()
                .find(|(_, endpoint)| endpoint.as_str() == name)
                .and_then(|(tool, _)| self.tools().iter().find(|t| &t.name == tool))
        })
    }

    /// Callable operation keys (utility endpoints excluded)
    pub fn operation_names(&self) -> impl Iterator<Item = &str> {
        self.endpoints
            .keys()
            .map(|k| k.as_str())
            .filter(|k| !UTILITY_ENDPOINTS.contains(k))
    }

    /// Every name the planner may use to address a tool of this service
    pub fn known_tool_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let candidates = self
            .tools()
            .iter()
            .map(|t| t.name.as_str())
            .chain(self.tool_endpoints.keys().map(|k| k.as_str()))
            .chain(self.operation_names());
        for name in candidates {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    pub fn has_tool(&self, name: &str) -> bool {
        self.known_tool_names().contains(&name)
    }

    /// One name per callable tool, so that two spellings of the same call compare equal.
    ///
    /// Tool names and `tool_endpoints` keys are canonical already; an operation
    /// name maps to the tool routed onto it. Unknown names give `None`.
    pub fn canonical_tool_name(&self, name: &str) -> Option<String> {
        if !self.has_tool(name) {
            return None;
        }
        if self.tools().iter().any(|t| t.name == name) || self.tool_endpoints.contains_key(name)
        {
            return Some(name.to_string());
        }
        let routed = self
            .tool_endpoints
            .iter()
            .filter(|(_, endpoint)| endpoint.as_str() == name)
            .map(|(tool, _)| tool.as_str())
            .min_by_key(|tool| !self.tools().iter().any(|t| t.name == *tool));
        Some(routed.unwrap_or(name).to_string())
    }

    /// Tool used when a decision is produced without the oracle
    pub fn default_tool(&self) -> Option<&str> {
        self.known_tool_names().into_iter().next()
    }

    // ==================== Addresses ====================

    /// Full address for a tool, via `tool_endpoints` or the tool name as endpoint key
    pub fn resolve_endpoint(&self, tool: &str) -> Option<String> {
        let endpoint_key = self
            .tool_endpoints
            .get(tool)
            .map(|s| s.as_str())
            .unwrap_or(tool);
        if UTILITY_ENDPOINTS.contains(&endpoint_key) {
            return None;
        }
        self.endpoints
            .get(endpoint_key)
            .map(|suffix| join_url(&self.base_url, suffix))
    }

    pub fn discovery_url(&self) -> String {
        let suffix = self
            .endpoints
            .get("tools")
            .map(|s| s.as_str())
            .unwrap_or(DEFAULT_DISCOVERY_SUFFIX);
        join_url(&self.base_url, suffix)
    }

    /// Field name this service expects for a canonical parameter name
    pub fn field_name<'a>(&'a self, canonical: &'a str) -> &'a str {
        self.parameter_aliases
            .get(canonical)
            .map(|s| s.as_str())
            .unwrap_or(canonical)
    }

    // ==================== Cache ====================

    /// Pure time comparison of the cache stamp against `ttl`.
    pub fn is_cache_valid(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        match &self.tool_cache {
            Some(cache) => match (now - cache.refreshed_at).to_std() {
                Ok(age) => age < ttl,
                // Stamp lies in the future (clock adjustment): still fresh
                Err(_) => true,
            },
            None => false,
        }
    }

    pub fn attempted_within(&self, now: DateTime<Utc>, window: Duration) -> bool {
        self.discovery_attempted_at
            .and_then(|at| (now - at).to_std().ok())
            .is_some_and(|age| age < window)
    }

    pub fn replace_tools(&mut self, tools: Vec<ToolDescriptor>, now: DateTime<Utc>) {
        self.tool_cache = Some(ToolCache {
            tools,
            refreshed_at: now,
        });
        self.discovery_attempted_at = Some(now);
    }
}

/// Join a base address and a suffix with exactly one slash between them
pub fn join_url(base: &str, suffix: &str) -> String {
    let base = base.trim_end_matches('/');
    if suffix.is_empty() {
        base.to_string()
    } else if suffix.starts_with('/') {
        format!("{}{}", base, suffix)
    } else {
        format!("{}/{}", base, suffix)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn search_service() -> ServiceDescriptor {
        ServiceDescriptor::new("semantic_search", "Semantic Search", "http://localhost:8001/")
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
            )
    }

    #[test]
    fn test_resolve_endpoint_via_tool_mapping() {
        let service = search_service();
        assert_eq!(
            service.resolve_endpoint("search_livelabs_workshops"),
            Some("http://localhost:8001/search".to_string())
        );
        assert_eq!(
            service.resolve_endpoint("search"),
            Some("http://localhost:8001/search".to_string())
        );
        assert_eq!(service.resolve_endpoint("health"), None);
        assert_eq!(service.resolve_endpoint("unknown"), None);
    }

    #[test]
    fn test_known_tool_names_deduplicated_and_ordered() {
        let service = search_service();
        assert_eq!(
            service.known_tool_names(),
            vec!["search_livelabs_workshops", "search"]
        );
        assert_eq!(service.default_tool(), Some("search_livelabs_workshops"));
        assert!(service.has_tool("search"));
        assert!(!service.has_tool("health"));
    }

    #[test]
    fn test_find_tool_by_endpoint_key() {
        let service = search_service();
        assert_eq!(
            service.find_tool("search").map(|t| t.name.as_str()),
            Some("search_livelabs_workshops")
        );
    }

    #[test]
    fn test_canonical_tool_name_folds_endpoint_keys() {
        let service = search_service();
        assert_eq!(
            service.canonical_tool_name("search").as_deref(),
            Some("search_livelabs_workshops")
        );
        assert_eq!(
            service.canonical_tool_name("search_livelabs_workshops").as_deref(),
            Some("search_livelabs_workshops")
        );
        assert_eq!(service.canonical_tool_name("health"), None);
        assert_eq!(service.canonical_tool_name("unknown"), None);

        // An operation with no tool routed onto it keeps its own name
        let plain = ServiceDescriptor::new("nl_query", "Profiles", "http://localhost:8002")
            .with_endpoint("query", "/users/search/nl");
        assert_eq!(plain.canonical_tool_name("query").as_deref(), Some("query"));
    }

    #[test]
    fn test_discovered_tools_shadow_static_tools() {
        let mut service = search_service();
        let now = Utc::now();
        service.replace_tools(vec![ToolDescriptor::new("find_similar", "Similar")], now);
        assert_eq!(service.tools().len(), 1);
        assert_eq!(service.tools()[0].name, "find_similar");

        // An empty discovery result falls back to the static list
        service.replace_tools(Vec::new(), now);
        assert_eq!(service.tools()[0].name, "search_livelabs_workshops");
    }

    #[test]
    fn test_cache_validity_is_time_comparison() {
        let mut service = search_service();
        let refreshed = Utc.with_ymd_and_hms(2026, 1, 1, 12, 0, 0).unwrap();
        let ttl = Duration::from_secs(30 * 60);

        assert!(!service.is_cache_valid(refreshed, ttl));

        service.replace_tools(Vec::new(), refreshed);
        assert!(service.is_cache_valid(refreshed + chrono::Duration::minutes(29), ttl));
        assert!(!service.is_cache_valid(refreshed + chrono::Duration::minutes(30), ttl));
        assert!(service.is_cache_valid(refreshed - chrono::Duration::minutes(5), ttl));
    }

    #[test]
    fn test_discovery_url_default_and_override() {
        let service = search_service();
        assert_eq!(service.discovery_url(), "http://localhost:8001/tools");

        let service = service.with_endpoint("tools", "api/tools");
        assert_eq!(service.discovery_url(), "http://localhost:8001/api/tools");
    }

    #[test]
    fn test_field_name_alias() {
        let service = search_service().with_parameter_alias("query", "natural_language_query");
        assert_eq!(service.field_name("query"), "natural_language_query");
        assert_eq!(service.field_name("top_k"), "top_k");
    }

    #[test]
    fn test_parameter_type_parse() {
        assert_eq!(ParameterType::parse("str"), Some(ParameterType::String));
        assert_eq!(ParameterType::parse("List"), Some(ParameterType::Array));
        assert_eq!(ParameterType::parse("uuid"), None);
    }
}
