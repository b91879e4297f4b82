//! CLI command definitions

use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use stepwise_domain::OutputFormat;

/// Output format for workflow results
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputMode {
    /// Step trace plus the final payload
    Full,
    /// One line per step and the terminal status
    Steps,
    /// The whole result as JSON
    Json,
}

impl From<OutputMode> for OutputFormat {
    fn from(mode: OutputMode) -> Self {
        match mode {
            OutputMode::Full => OutputFormat::Full,
            OutputMode::Steps => OutputFormat::Steps,
            OutputMode::Json => OutputFormat::Json,
        }
    }
}

/// CLI arguments for stepwise
#[derive(Parser, Debug)]
#[command(name = "stepwise")]
#[command(author, version, about = "Multi-step reasoning-and-dispatch orchestrator")]
#[command(long_about = r#"
Stepwise answers a query by asking a reasoning model which backend tool to
call next, refining the parameters, calling the tool and repeating until the
model reports completion or a step budget runs out.

Each step goes through four states:
  PLANNING     pick the next service/tool (falls back to fixed rules)
  REFINING     adjust parameters with the full history of earlier steps
  DISPATCHING  call the tool over HTTP (POST, then GET as fallback)
  EVALUATING   record the outcome and decide whether to continue

Configuration files are loaded from (in priority order):
1. STEPWISE_* environment variables (e.g. STEPWISE_WORKFLOW__MAX_STEPS=3)
2. --config <path>              Explicit config file
3. ./stepwise.toml              Project-level config
4. ~/.config/stepwise/config.toml   Global config

Example:
  stepwise "Find SQL workshops that match my profile"
  stepwise --max-steps 3 --output steps "List database workshops"
  stepwise --output json --conversation-log run.jsonl "Who teaches Python?"
"#)]
pub struct Cli {
    /// The query to resolve
    #[arg(required_unless_present = "show_config")]
    pub query: Option<String>,

    /// Maximum number of executed steps (overrides config)
    #[arg(long, value_name = "N")]
    pub max_steps: Option<usize>,

    /// Reasoning model for planning and refinement (overrides config)
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Output format (defaults to the configured format, then `full`)
    #[arg(short, long, value_enum)]
    pub output: Option<OutputMode>,

    /// Write a JSONL transcript of the run to this file
    #[arg(long, value_name = "PATH")]
    pub conversation_log: Option<PathBuf>,

    /// Directory for the daily diagnostic log file
    #[arg(long, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress indicators
    #[arg(short, long)]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,
}
