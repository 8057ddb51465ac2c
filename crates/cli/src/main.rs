//! Sleuth CLI
//!
//! Main entry point for the sleuth command-line tool.
//! Answers questions with a bounded retrieval agent over a local corpus.

mod commands;
mod runtime;

use clap::{Parser, Subcommand};
use commands::{AskCommand, PromptsCommand, SearchCommand, ToolsCommand};
use sleuth_core::{config::AppConfig, logging, AppResult};
use std::path::PathBuf;

/// Sleuth - agentic retrieval over a local corpus
#[derive(Parser, Debug)]
#[command(name = "sleuth")]
#[command(about = "Answer questions with a plan/act/observe/reflect retrieval agent", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "SLEUTH_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "SLEUTH_CONFIG")]
    config: Option<PathBuf>,

    /// Corpus file (JSON Lines), overrides retrieval.corpusPath
    #[arg(long, global = true, env = "SLEUTH_CORPUS")]
    corpus: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    log_json: bool,

    /// LLM provider backing the planner, judge and synthesizer
    #[arg(short, long, global = true, env = "SLEUTH_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "SLEUTH_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer one or more questions
    Ask(AskCommand),

    /// Run a single retrieval tool directly
    Search(SearchCommand),

    /// List registered retrieval tools
    Tools(ToolsCommand),

    /// List prompt definitions and workspace overrides
    Prompts(PromptsCommand),
}

#[tokio::main]
async fn main() -> AppResult<()> {
    // Parse command-line arguments first (needed for logging config)
    let cli = Cli::parse();

    let mut config = AppConfig::load()?.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
        cli.log_json,
    );
    if let Some(corpus) = cli.corpus {
        config.retrieval.corpus_path = corpus;
    }

    logging::init_logging(config.log_level.as_deref(), config.no_color, config.log_json)?;

    tracing::info!("Sleuth CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.ensure_sleuth_dir()?;

    let command_name = match &cli.command {
        Commands::Ask(_) => "ask",
        Commands::Search(_) => "search",
        Commands::Tools(_) => "tools",
        Commands::Prompts(_) => "prompts",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Search(cmd) => cmd.execute(&config).await,
        Commands::Tools(cmd) => cmd.execute(&config).await,
        Commands::Prompts(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result
}
