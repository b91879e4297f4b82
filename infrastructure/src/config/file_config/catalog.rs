//! Capability catalog configuration (`[catalog]` section and services file)
//!
//! Services come from two places: `[catalog.services.<key>]` tables in TOML,
//! and an optional JSON file in the `{"mcpServers": {...}}` shape named by
//! `catalog.services_file`. On a key clash the TOML table wins.

use super::logging::expand_home;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use stepwise_domain::{
    ConfigIssue, ConfigIssueCode, ServiceDescriptor, ServiceRole, ToolDescriptor,
    ToolListingError, parse_tool_listing,
};

/// Raw catalog configuration from TOML
///
/// # Example
///
/// ```toml
/// [catalog]
/// services_file = "config/services.json"
///
/// [catalog.services.semantic_search]
/// name = "Semantic Search"
/// base_url = "http://localhost:8001"
/// role = "content_search"
/// use_when = ["workshop search", "find courses"]
///
/// [catalog.services.semantic_search.endpoints]
/// search = "/search"
/// health = "/health"
///
/// [catalog.services.semantic_search.tool_endpoints]
/// search_livelabs_workshops = "search"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileCatalogConfig {
    pub services_file: Option<PathBuf>,
    pub services: BTreeMap<String, FileServiceConfig>,
}

/// One service entry, shared by the TOML tables and the JSON services file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileServiceConfig {
    /// Display name (defaults to the key)
    pub name: Option<String>,
    pub description: String,
    #[serde(alias = "baseUrl")]
    pub base_url: String,
    pub endpoints: BTreeMap<String, String>,
    pub use_when: UseWhen,
    pub role: ServiceRole,
    #[serde(alias = "toolEndpoints")]
    pub tool_endpoints: BTreeMap<String, String>,
    #[serde(alias = "parameterAliases")]
    pub parameter_aliases: BTreeMap<String, String>,
    /// Static tools: a list of tool objects, or a map of tool name → spec
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Value>,
    pub enabled: bool,
}

impl Default for FileServiceConfig {
    fn default() -> Self {
        Self {
            name: None,
            description: String::new(),
            base_url: String::new(),
            endpoints: BTreeMap::new(),
            use_when: UseWhen::default(),
            role: ServiceRole::default(),
            tool_endpoints: BTreeMap::new(),
            parameter_aliases: BTreeMap::new(),
            tools: None,
            enabled: true,
        }
    }
}

/// `use_when` as a single sentence or a list of hints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UseWhen {
    One(String),
    Many(Vec<String>),
}

impl Default for UseWhen {
    fn default() -> Self {
        UseWhen::Many(Vec::new())
    }
}

impl UseWhen {
    pub fn hints(&self) -> Vec<String> {
        match self {
            UseWhen::One(hint) if hint.trim().is_empty() => Vec::new(),
            UseWhen::One(hint) => vec![hint.clone()],
            UseWhen::Many(hints) => hints.clone(),
        }
    }
}

/// Top level of the JSON services file
#[derive(Debug, Deserialize)]
struct ServicesFile {
    #[serde(rename = "mcpServers", alias = "services", default)]
    servers: BTreeMap<String, FileServiceConfig>,
}

impl FileCatalogConfig {
    /// Merge both sources into descriptors, collecting issues.
    ///
    /// Services with problems that make them unreachable are left out; the
    /// rest are returned even when issues were reported.
    pub fn build_services(&self) -> (Vec<ServiceDescriptor>, Vec<ConfigIssue>) {
        let mut issues = Vec::new();
        let mut merged: BTreeMap<String, FileServiceConfig> = BTreeMap::new();

        if let Some(path) = &self.services_file {
            match load_services_file(&expand_home(path)) {
                Ok(servers) => merged.extend(servers),
                Err(reason) => issues.push(ConfigIssue::error(
                    ConfigIssueCode::ServicesFileUnreadable,
                    format!("catalog.services_file {}: {}", path.display(), reason),
                )),
            }
        }

        for (key, service) in &self.services {
            if merged.insert(key.clone(), service.clone()).is_some() {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::DuplicateService,
                    format!(
                        "service '{}' is defined in both the services file and [catalog.services]; using the TOML entry",
                        key
                    ),
                ));
            }
        }

        let mut services = Vec::new();
        for (key, service) in &merged {
            let (descriptor, service_issues) = service.to_descriptor(key);
            issues.extend(service_issues);
            services.extend(descriptor);
        }

        if !services.iter().any(|s| s.enabled) {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::EmptyCatalog,
                "no enabled services are configured",
            ));
        }

        (services, issues)
    }
}

impl FileServiceConfig {
    pub fn to_descriptor(&self, key: &str) -> (Option<ServiceDescriptor>, Vec<ConfigIssue>) {
        let mut issues = Vec::new();

        if self.base_url.trim().is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::MissingBaseAddress,
                format!("service '{}': base_url is empty", key),
            ));
            return (None, issues);
        }

        for (tool, endpoint) in &self.tool_endpoints {
            if !self.endpoints.contains_key(endpoint) {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::UnknownToolEndpoint,
                    format!(
                        "service '{}': tool '{}' maps to unknown endpoint '{}'",
                        key, tool, endpoint
                    ),
                ));
            }
        }

        let static_tools = match &self.tools {
            None => Vec::new(),
            Some(tools) => parse_static_tools(tools).unwrap_or_else(|e| {
                issues.push(ConfigIssue::warning(
                    ConfigIssueCode::InvalidToolSchema,
                    format!("service '{}': declared tools ignored: {}", key, e),
                ));
                Vec::new()
            }),
        };

        let mut descriptor = ServiceDescriptor::new(
            key,
            self.name.clone().unwrap_or_else(|| key.to_string()),
            self.base_url.trim(),
        )
        .with_description(self.description.clone())
        .with_role(self.role);
        descriptor.endpoints = self.endpoints.clone();
        descriptor.use_when = self.use_when.hints();
        descriptor.tool_endpoints = self.tool_endpoints.clone();
        descriptor.parameter_aliases = self.parameter_aliases.clone();
        descriptor.static_tools = static_tools;
        descriptor.enabled = self.enabled;

        (Some(descriptor), issues)
    }
}

fn load_services_file(path: &Path) -> Result<BTreeMap<String, FileServiceConfig>, String> {
    let content = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
    let file: ServicesFile = serde_json::from_str(&content).map_err(|e| e.to_string())?;
    Ok(file.servers)
}

/// Declared tools in either list or name → spec map form
fn parse_static_tools(tools: &Value) -> Result<Vec<ToolDescriptor>, ToolListingError> {
    let list = match tools {
        Value::Object(by_name) => Value::Array(
            by_name
                .iter()
                .map(|(name, spec)| {
                    let mut entry = match spec {
                        Value::Object(fields) => fields.clone(),
                        _ => Map::new(),
                    };
                    entry.insert("name".to_string(), Value::String(name.clone()));
                    Value::Object(entry)
                })
                .collect(),
        ),
        other => other.clone(),
    };
    parse_tool_listing(&json!({ "tools": list }))
}
