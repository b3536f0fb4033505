//! Cache maintenance commands

use super::{Cli, CliError, OutputFormat};
use crate::cache::{CacheNamespace, CacheStore};
use clap::{Args, Subcommand};
use serde_json::json;

/// Cache subcommand
#[derive(Debug, Args)]
pub struct CacheCommand {
    #[command(subcommand)]
    action: CacheAction,
}

/// Cache actions
#[derive(Debug, Subcommand)]
enum CacheAction {
    /// Show entry counts per request type
    Inspect,
    /// Delete the cache snapshot
    Clear,
}

const NAMESPACES: [CacheNamespace; 5] = [
    CacheNamespace::Brands,
    CacheNamespace::Models,
    CacheNamespace::Years,
    CacheNamespace::Details,
    CacheNamespace::Unknown,
];

impl CacheCommand {
    /// Execute the cache command
    pub fn execute(&self, cli: &Cli) -> Result<(), CliError> {
        match self.action {
            CacheAction::Inspect => inspect(cli),
            CacheAction::Clear => clear(cli),
        }
    }
}

fn inspect(cli: &Cli) -> Result<(), CliError> {
    let path = &cli.cache_path;
    let exists = path.exists();
    let stats = CacheStore::load(path).stats();

    match cli.output_format {
        OutputFormat::Json => {
            let by_namespace: serde_json::Map<String, serde_json::Value> = NAMESPACES
                .iter()
                .map(|ns| (ns.to_string(), json!(stats.count(*ns))))
                .collect();
            let output = json!({
                "path": path.display().to_string(),
                "exists": exists,
                "total": stats.total,
                "by_namespace": by_namespace,
            });
            println!("{output}");
        }
        OutputFormat::Human => {
            println!("Cache: {}", path.display());
            if !exists {
                println!("(no snapshot on disk)");
                return Ok(());
            }
            for ns in NAMESPACES {
                let count = stats.count(ns);
                if ns == CacheNamespace::Unknown && count == 0 {
                    continue;
                }
                println!("  {:<10} {count}", ns.to_string());
            }
            println!("  {:<10} {}", "total", stats.total);
        }
    }
    Ok(())
}

fn clear(cli: &Cli) -> Result<(), CliError> {
    let removed = CacheStore::clear(&cli.cache_path)?;
    match cli.output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                json!({"path": cli.cache_path.display().to_string(), "removed": removed})
            );
        }
        OutputFormat::Human if removed => println!("Deleted {}", cli.cache_path.display()),
        OutputFormat::Human => println!("No cache at {}", cli.cache_path.display()),
    }
    Ok(())
}
