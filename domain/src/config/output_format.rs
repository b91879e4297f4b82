//! Output format value object

use serde::{Deserialize, Serialize};

/// How a workflow result is rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Step trace plus the final payload (default)
    #[default]
    Full,
    /// One line per step and the terminal status
    Steps,
    /// The whole result as JSON
    Json,
}
