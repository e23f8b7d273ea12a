//! CLI argument definitions using clap derive

use crate::cache::ProfileOptions;
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// datamcp - data tool middleware for AI agents
///
/// Converts and profiles tabular files through an external data tool,
/// reusing cached results for files that have not changed.
#[derive(Parser, Debug)]
#[command(name = "datamcp")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "DATAMCP_CONFIG")]
    pub config: Option<PathBuf>,

    /// Working directory holding the cache documents (defaults to current directory)
    #[arg(short, long, global = true, env = "DATAMCP_DIR")]
    pub dir: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Convert a spreadsheet or JSON-lines file to CSV
    Convert(ConvertArgs),

    /// Profile a tabular file
    Profile(ProfileArgs),

    /// Inspect and maintain the derived-artifact caches
    Cache(CacheArgs),

    /// Show or initialize configuration
    Config(ConfigArgs),
}

/// Arguments for the convert command
#[derive(Parser, Debug)]
pub struct ConvertArgs {
    /// Input file
    pub file: PathBuf,
}

/// Arguments for the profile command
#[derive(Parser, Debug)]
pub struct ProfileArgs {
    /// Input file
    pub file: PathBuf,

    /// Maximum distinct values reported per column
    #[arg(short, long)]
    pub limit: Option<u64>,

    /// Columns to profile (tool selection syntax)
    #[arg(long)]
    pub columns: Option<String>,

    /// Skip summary statistics
    #[arg(long)]
    pub no_stats: bool,
}

impl ProfileArgs {
    /// Options that key the profile cache
    pub fn options(&self) -> ProfileOptions {
        ProfileOptions {
            limit: self.limit,
            columns: self.columns.clone(),
            no_stats: self.no_stats.then_some(true),
        }
    }
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Subcommand for config
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },
}

/// Output format for cache reports
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    Table,
    /// JSON output
    Json,
}

/// Arguments for the cache command
#[derive(Parser, Debug)]
pub struct CacheArgs {
    /// Subcommand for cache
    #[command(subcommand)]
    pub action: CacheAction,
}

/// Cache subcommands
#[derive(Subcommand, Debug)]
pub enum CacheAction {
    /// Show entry counts and sizes of both caches
    Status {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Drop orphaned and expired entries and abandoned temp files
    Cleanup {
        /// Output format
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },

    /// Delete the profile cache
    Clear,
}
