//! Configuration file loading for stepwise
//!
//! This module handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `STEPWISE_` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./stepwise.toml` or `./.stepwise.toml`
//! 4. Global: `~/.config/stepwise/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    DEFAULT_AUTH_TOKEN_ENV, DEFAULT_ORACLE_ENDPOINT, FileCatalogConfig, FileConfig,
    FileLoggingConfig, FileOracleConfig, FileOutputConfig, FileServiceConfig, FileWorkflowConfig,
    UseWhen,
};
pub use loader::{ConfigLoader, ENV_PREFIX};
