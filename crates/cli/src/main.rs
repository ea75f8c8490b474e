//! Tributario CLI
//!
//! Main entry point for the tributario command-line tool.
//! Answers Colombian tax-law questions from topic-specific document indexes.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ConfigCommand, RetrieveCommand, RouteCommand, TopicsCommand};
use std::path::PathBuf;
use tracing::Instrument;
use tributario_core::{config::AppConfig, logging, AppResult};

/// Tributario - tax-law assistant over retrieval-augmented generation
#[derive(Parser, Debug)]
#[command(name = "tributario")]
#[command(about = "Colombian tax-law assistant with verified, cited answers", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "TRIBUTARIO_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "TRIBUTARIO_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (openai, ollama)
    #[arg(short, long, global = true, env = "TRIBUTARIO_PROVIDER")]
    provider: Option<String>,

    /// Model identifier for answer generation
    #[arg(short, long, global = true, env = "TRIBUTARIO_MODEL")]
    model: Option<String>,

    /// Record and print the workflow's processing flow
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer a tax question
    Ask(AskCommand),

    /// Show which topic a question is routed to
    Route(RouteCommand),

    /// Show the documents retrieved for a question
    Retrieve(RetrieveCommand),

    /// List topics and the indexes they query
    Topics(TopicsCommand),

    /// Show the effective configuration and prompts
    Config(ConfigCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ask(_) => "ask",
            Commands::Route(_) => "route",
            Commands::Retrieve(_) => "retrieve",
            Commands::Topics(_) => "topics",
            Commands::Config(_) => "config",
        }
    }

    /// Commands that call the model or vector store.
    fn needs_services(&self) -> bool {
        matches!(
            self,
            Commands::Ask(_) | Commands::Route(_) | Commands::Retrieve(_)
        )
    }
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    // Load configuration from .env, the config file and the environment;
    // --workspace and --config decide which config file is read
    let config = AppConfig::load_from(cli.workspace, cli.config)?;

    // Apply CLI overrides
    let config = config.with_overrides(
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.debug,
    );

    // Initialize logging with final configuration
    logging::init_logging(config.log_level.as_deref(), config.no_color)?;

    tracing::info!("Tributario CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    // Missing credentials are fatal before any network call
    if cli.command.needs_services() {
        if let Err(e) = config.validate() {
            tracing::error!("Invalid configuration: {}", e);
            return Err(e);
        }
    }

    let span = tracing::info_span!("command", name = cli.command.name());
    let command = cli.command;
    let config = &config;

    let result = async move {
        match command {
            Commands::Ask(cmd) => cmd.execute(config).await,
            Commands::Route(cmd) => cmd.execute(config).await,
            Commands::Retrieve(cmd) => cmd.execute(config).await,
            Commands::Topics(cmd) => cmd.execute(config).await,
            Commands::Config(cmd) => cmd.execute(config).await,
        }
    }
    .instrument(span)
    .await;

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
