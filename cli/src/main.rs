//! CLI entrypoint for stepwise
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use std::io::IsTerminal;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;
use stepwise_application::{
    CapabilityCatalog, ConversationLogger, NoConversationLogger, NoWorkflowProgress,
    RunWorkflowInput, RunWorkflowUseCase, ServiceTransport, WorkflowProgressNotifier,
    WorkflowRunner,
};
use stepwise_domain::{OutputFormat, Severity};
use stepwise_infrastructure::{
    ConfigLoader, FileConfig, HttpOracleGateway, HttpServiceTransport, JsonlConversationLogger,
};
use stepwise_presentation::{
    Cli, ConsoleFormatter, OutputFormatter, ProgressReporter, SimpleProgress,
};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("Failed to load configuration")?
    };
    apply_overrides(&mut config, &cli);

    let log_dir = config.logging.resolved_log_dir();
    let _log_guard = init_logging(cli.verbose, log_dir.as_deref())?;

    info!("Starting stepwise");

    let issues = config.validate();
    for issue in issues.iter().filter(|i| i.severity == Severity::Warning) {
        warn!("{}", issue);
    }
    if FileConfig::has_errors(&issues) {
        let errors: Vec<String> = issues
            .iter()
            .filter(|i| i.is_error())
            .map(|i| format!("  - {}", i))
            .collect();
        bail!("Invalid configuration:\n{}", errors.join("\n"));
    }

    let Some(query) = cli.query.clone() else {
        bail!("A query is required. Use --show-config to inspect configuration sources.");
    };

    let format = cli
        .output
        .map(OutputFormat::from)
        .or(config.output.format)
        .unwrap_or_default();
    if !config.output.color {
        ConsoleFormatter::disable_color();
    }

    // === Dependency Injection ===
    let (params, _) = config.workflow.to_workflow_params();
    let (services, _) = config.catalog.build_services();

    let transport: Arc<dyn ServiceTransport> = Arc::new(HttpServiceTransport::new());
    let catalog = Arc::new(
        CapabilityCatalog::new(services, transport.clone())?
            .with_discovery_timeout(params.discovery_timeout)
            .with_retry_backoff(params.discovery_retry_backoff),
    );
    let gateway = Arc::new(HttpOracleGateway::new(config.oracle.to_settings()));
    let conversation_logger = conversation_logger(&config);

    let use_case = RunWorkflowUseCase::new(
        catalog.clone(),
        gateway,
        transport,
        conversation_logger,
        params,
    );
    let runner = WorkflowRunner::new(use_case).with_progress(progress_for(&cli, &config, format));

    // Ctrl+C is honoured from here on, discovery included
    let shutdown = runner.shutdown_token();
    let interrupt = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling workflow");
            interrupt.cancel();
        }
    });

    let refreshed = tokio::select! {
        n = catalog.refresh_all() => n,
        _ = shutdown.cancelled() => {
            warn!("Interrupted during tool discovery");
            return Ok(ExitCode::FAILURE);
        }
    };
    if refreshed == 0 {
        warn!("No service answered tool discovery; relying on configured tools");
    }

    if !cli.quiet && format != OutputFormat::Json {
        println!();
        println!("Query: {}", query);
        println!();
    }

    let handle = runner.spawn(RunWorkflowInput::new(query));
    let result = handle.join().await?;

    println!("{}", ConsoleFormatter.render(&result, format));

    if result.success {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Command-line flags take priority over every config source
fn apply_overrides(config: &mut FileConfig, cli: &Cli) {
    if let Some(max_steps) = cli.max_steps {
        config.workflow.max_steps = max_steps;
    }
    if let Some(model) = &cli.model {
        config.workflow.reasoning_model = model.clone();
        config.workflow.refinement_model = model.clone();
    }
    if let Some(path) = &cli.conversation_log {
        config.logging.conversation_log = Some(path.clone());
    }
    if let Some(dir) = &cli.log_dir {
        config.logging.log_dir = Some(dir.clone());
    }
}

/// Stderr logging from the verbosity flag, plus a daily file when a log directory is set
fn init_logging(verbose: u8, log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };
    let stderr_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    let Some(dir) = log_dir else {
        tracing_subscriber::registry()
            .with(filter)
            .with(stderr_layer)
            .init();
        return Ok(None);
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
        dir,
        "stepwise.log",
    ));
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Ok(Some(guard))
}

fn conversation_logger(config: &FileConfig) -> Arc<dyn ConversationLogger> {
    let Some(path) = config.logging.resolved_conversation_log() else {
        return Arc::new(NoConversationLogger);
    };
    match JsonlConversationLogger::new(&path) {
        Some(logger) => {
            info!("Writing conversation log to {}", path.display());
            Arc::new(logger)
        }
        None => {
            warn!("Could not open conversation log {}", path.display());
            Arc::new(NoConversationLogger)
        }
    }
}

fn progress_for(
    cli: &Cli,
    config: &FileConfig,
    format: OutputFormat,
) -> Arc<dyn WorkflowProgressNotifier> {
    if cli.quiet || !config.output.show_progress {
        return Arc::new(NoWorkflowProgress);
    }
    if std::io::stderr().is_terminal() {
        Arc::new(ProgressReporter::new())
    } else if format == OutputFormat::Json {
        // Piped JSON output stays silent
        Arc::new(NoWorkflowProgress)
    } else {
        Arc::new(SimpleProgress)
    }
}
