//! CLI command implementations

pub mod cache;
pub mod error;
pub mod import;

pub use cache::CacheCommand;
pub use error::CliError;
pub use import::ImportArgs;

use crate::cache::DEFAULT_CACHE_PATH;
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// FIPE catalog collector CLI
#[derive(Parser, Debug)]
#[command(name = "fipe-collector")]
#[command(about = "Collect FIPE vehicle prices into a relational database", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (json or human)
    #[arg(long, global = true, value_enum, default_value = "human")]
    pub output_format: OutputFormat,

    /// Response cache snapshot
    #[arg(long, global = true, env = "FIPE_CACHE_PATH", default_value = DEFAULT_CACHE_PATH)]
    pub cache_path: PathBuf,
}

/// CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect the catalog and persist it
    Import(ImportArgs),

    /// Inspect or clear the response cache
    Cache(CacheCommand),
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
