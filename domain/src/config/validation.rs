//! Structured configuration issues.
//!
//! Configuration is validated after loading; each problem becomes a
//! [`ConfigIssue`] so callers can print warnings and refuse to start on errors.

/// Severity level of a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Fatal: the configuration cannot work at all.
    Error,
    /// Non-fatal: the configuration works but may not behave as expected.
    Warning,
}

/// Identifies a specific configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigIssueCode {
    /// `workflow.max_steps` is zero.
    ZeroStepBudget,
    /// A timeout is configured as zero seconds.
    ZeroTimeout,
    /// Temperature outside `0.0..=2.0`.
    TemperatureOutOfRange,
    /// No oracle endpoint configured.
    MissingOracleEndpoint,
    /// No compartment configured for the oracle.
    MissingCompartment,
    /// A service has no base address.
    MissingBaseAddress,
    /// A `tool_endpoints` entry names an endpoint the service does not have.
    UnknownToolEndpoint,
    /// Declared tools of a service could not be parsed.
    InvalidToolSchema,
    /// Two sources define the same service key.
    DuplicateService,
    /// No enabled service is configured.
    EmptyCatalog,
    /// The services file could not be read or parsed.
    ServicesFileUnreadable,
    /// A model id is empty.
    InvalidModel,
}

/// A detected issue in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    pub severity: Severity,
    pub code: ConfigIssueCode,
    pub message: String,
}

impl ConfigIssue {
    pub fn error(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
        }
    }

    pub fn warning(code: ConfigIssueCode, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(f, "{}: {}", level, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_severity() {
        let issue = ConfigIssue::warning(ConfigIssueCode::EmptyCatalog, "no services configured");
        assert_eq!(issue.to_string(), "warning: no services configured");
        assert!(!issue.is_error());
        assert!(ConfigIssue::error(ConfigIssueCode::ZeroStepBudget, "x").is_error());
    }
}
