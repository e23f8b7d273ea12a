//! datamcp - data tool middleware for AI agents
//!
//! CLI entry point that dispatches to subcommands.

use clap::Parser;
use console::style;
use datamcp::cli::{Cli, Commands};
use datamcp::config::{Config, ConfigManager};
use datamcp::error::{DataMcpError, DataMcpResult};
use datamcp::tool::ToolRunner;
use datamcp::Workspace;
use std::process::ExitCode;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            if let Some(hint) = e.hint() {
                eprintln!("{} {}", style("Hint:").yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> DataMcpResult<()> {
    let cli = Cli::parse();

    let config_manager = match cli.config {
        Some(ref path) => ConfigManager::with_path(path.clone()),
        None => ConfigManager::new(),
    };
    let config = config_manager.load().await?;

    init_logging(cli.verbose, &config);
    debug!("Using config {}", config_manager.path().display());

    let cwd =
        std::env::current_dir().map_err(|e| DataMcpError::io("getting current directory", e))?;
    let dir = match cli.dir {
        Some(dir) => cwd.join(dir),
        None => cwd,
    };

    let workspace = Workspace::new(dir, &config.cache);
    let runner = ToolRunner::new(config.tool.binary.clone());

    match cli.command {
        Commands::Convert(args) => datamcp::cli::commands::convert(args, &workspace, &runner).await,
        Commands::Profile(args) => datamcp::cli::commands::profile(args, &workspace, &runner).await,
        Commands::Cache(args) => datamcp::cli::commands::cache(args, &workspace).await,
        Commands::Config(args) => {
            datamcp::cli::commands::config(args, &config, &config_manager).await
        }
    }
}

/// Logs go to stderr: 0 = warn, 1 = info, 2+ = debug
fn init_logging(verbose: u8, config: &Config) {
    let filter = match verbose {
        0 => EnvFilter::new("datamcp=warn"),
        1 => EnvFilter::new("datamcp=info"),
        _ => EnvFilter::new("datamcp=debug"),
    };

    if config.general.log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .init();
    }
}
