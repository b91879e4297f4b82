//! Oracle connection configuration from TOML (`[oracle]` section)

use crate::oracle::OracleSettings;
use serde::{Deserialize, Serialize};
use stepwise_domain::{ConfigIssue, ConfigIssueCode};

/// Default regional inference endpoint
pub const DEFAULT_ORACLE_ENDPOINT: &str =
    "https://inference.generativeai.us-chicago-1.oci.oraclecloud.com";

/// Default environment variable holding the bearer token
pub const DEFAULT_AUTH_TOKEN_ENV: &str = "STEPWISE_ORACLE_TOKEN";

/// Raw oracle configuration from TOML
///
/// # Example
///
/// ```toml
/// [oracle]
/// endpoint = "https://inference.generativeai.us-chicago-1.oci.oraclecloud.com"
/// compartment_id = "ocid1.tenancy.oc1..aaaa"
/// auth_token_env = "STEPWISE_ORACLE_TOKEN"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOracleConfig {
    pub endpoint: String,
    pub compartment_id: Option<String>,
    /// Name of the environment variable holding the token (never the token itself)
    pub auth_token_env: String,
}

impl Default for FileOracleConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ORACLE_ENDPOINT.to_string(),
            compartment_id: None,
            auth_token_env: DEFAULT_AUTH_TOKEN_ENV.to_string(),
        }
    }
}

impl FileOracleConfig {
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        if self.endpoint.trim().is_empty() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::MissingOracleEndpoint,
                "oracle.endpoint is empty",
            ));
        }
        if self
            .compartment_id
            .as_deref()
            .is_none_or(|c| c.trim().is_empty())
        {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::MissingCompartment,
                "oracle.compartment_id is not set",
            ));
        }
        issues
    }

    /// Settings for the HTTP gateway. The token is read from the environment here.
    pub fn to_settings(&self) -> OracleSettings {
        OracleSettings {
            endpoint: self.endpoint.trim().to_string(),
            compartment_id: self.compartment_id.clone().unwrap_or_default(),
            auth_token: std::env::var(&self.auth_token_env)
                .ok()
                .filter(|t| !t.trim().is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_compartment_is_an_error() {
        let issues = FileOracleConfig::default().validate();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].code, ConfigIssueCode::MissingCompartment);
        assert!(issues[0].is_error());
    }

    #[test]
    fn test_settings_from_section() {
        let toml_str = r#"
[oracle]
endpoint = "https://inference.example.test/ "
compartment_id = "ocid1.compartment.oc1..example"
auth_token_env = "STEPWISE_TEST_TOKEN_THAT_IS_NOT_SET"
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        assert!(config.oracle.validate().is_empty());

        let settings = config.oracle.to_settings();
        assert_eq!(settings.endpoint, "https://inference.example.test/");
        assert_eq!(settings.compartment_id, "ocid1.compartment.oc1..example");
        assert!(settings.auth_token.is_none());
    }
}
