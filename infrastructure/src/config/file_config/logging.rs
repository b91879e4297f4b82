//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw logging configuration from TOML
///
/// # Example
///
/// ```toml
/// [logging]
/// log_dir = "~/.local/share/stepwise/logs"
/// conversation_log = "runs/latest.jsonl"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for the daily-rolling diagnostic log
    pub log_dir: Option<PathBuf>,
    /// JSONL transcript of oracle calls, decisions and steps
    pub conversation_log: Option<PathBuf>,
}

impl FileLoggingConfig {
    /// `log_dir` with a leading `~` expanded
    pub fn resolved_log_dir(&self) -> Option<PathBuf> {
        self.log_dir.as_ref().map(|p| expand_home(p))
    }

    pub fn resolved_conversation_log(&self) -> Option<PathBuf> {
        self.conversation_log.as_ref().map(|p| expand_home(p))
    }
}

pub(crate) fn expand_home(path: &std::path::Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_expansion() {
        let config = FileLoggingConfig {
            log_dir: Some(PathBuf::from("~/logs")),
            conversation_log: None,
        };
        let resolved = config.resolved_log_dir().unwrap();
        if let Some(home) = dirs::home_dir() {
            assert_eq!(resolved, home.join("logs"));
        }
        assert_eq!(expand_home(std::path::Path::new("/tmp/x")), PathBuf::from("/tmp/x"));
    }
}
