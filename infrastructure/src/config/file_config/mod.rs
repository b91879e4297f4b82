//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod catalog;
mod logging;
mod oracle;
mod output;
mod workflow;

pub use catalog::{FileCatalogConfig, FileServiceConfig, UseWhen};
pub use logging::FileLoggingConfig;
pub use oracle::{DEFAULT_AUTH_TOKEN_ENV, DEFAULT_ORACLE_ENDPOINT, FileOracleConfig};
pub use output::FileOutputConfig;
pub use workflow::FileWorkflowConfig;

use serde::{Deserialize, Serialize};
use stepwise_domain::ConfigIssue;

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Inference endpoint and credentials
    pub oracle: FileOracleConfig,
    /// Step budget, timeouts and models
    pub workflow: FileWorkflowConfig,
    /// Backend services
    pub catalog: FileCatalogConfig,
    /// Output settings
    pub output: FileOutputConfig,
    /// Diagnostic log and run transcript locations
    pub logging: FileLoggingConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    ///
    /// This is the single entry point for config validation. It checks:
    /// 1. Oracle endpoint and compartment
    /// 2. Step budget, timeouts, temperature and model ids
    /// 3. Every service definition, and that at least one is enabled
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = self.oracle.validate();
        issues.extend(self.workflow.to_workflow_params().1);
        issues.extend(self.catalog.build_services().1);
        issues
    }

    pub fn has_errors(issues: &[ConfigIssue]) -> bool {
        issues.iter().any(ConfigIssue::is_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stepwise_domain::{ConfigIssueCode, OutputFormat};

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[oracle]
compartment_id = "ocid1.compartment.oc1..example"

[workflow]
max_steps = 4
reasoning_model = "cohere.command-r-plus-08-2024"

[catalog.services.semantic_search]
name = "Semantic Search"
base_url = "http://localhost:8001"
role = "content_search"

[catalog.services.semantic_search.endpoints]
search = "/search"

[output]
format = "json"

[logging]
conversation_log = "runs/latest.jsonl"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.workflow.max_steps, 4);
        assert_eq!(config.output.format, Some(OutputFormat::Json));
        assert_eq!(config.catalog.services.len(), 1);
        assert!(config.logging.conversation_log.is_some());
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_default_config_reports_missing_pieces() {
        let issues = FileConfig::default().validate();
        let codes: Vec<_> = issues.iter().map(|i| i.code).collect();
        assert_eq!(
            codes,
            vec![ConfigIssueCode::MissingCompartment, ConfigIssueCode::EmptyCatalog]
        );
        assert!(FileConfig::has_errors(&issues));
    }
}
