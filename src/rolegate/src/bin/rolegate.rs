//! rolegate CLI
//!
//! Resolves directory identities offline against an engine configuration,
//! mainly for checking mapping tables and catalogs before deployment.
//!
//! ## Configuration
//!
//! - `--config` / `ROLEGATE_CONFIG` - engine TOML file (default: ./rolegate.toml)
//! - `RUST_LOG` - log filter (default: info)

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rolegate::{EngineConfig, IdentityRecord, PrincipalId, ResolveOptions, RoleResolver};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

/// rolegate CLI
#[derive(Parser)]
#[command(name = "rolegate")]
#[command(about = "Resolve directory identities to roles and permissions")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "rolegate.toml", env = "ROLEGATE_CONFIG")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve an identity record and print the result as JSON
    Resolve {
        /// Principal identifier
        #[arg(short, long)]
        principal: u64,

        /// Identity record (JSON file)
        #[arg(short, long)]
        identity: PathBuf,

        /// Include the identity record in the output
        #[arg(long)]
        raw: bool,

        /// Also print skipped directory entries
        #[arg(long)]
        explain: bool,
    },

    /// List catalog roles with their granted permissions and descriptions
    Roles,

    /// Exit non-zero unless the identity holds the permissions
    Check {
        #[arg(short, long)]
        principal: u64,

        #[arg(short, long)]
        identity: PathBuf,

        /// Require any one permission instead of all of them
        #[arg(long)]
        any: bool,

        #[arg(required = true)]
        permissions: Vec<String>,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_log_filter(cli.verbose).into()),
        )
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let config = EngineConfig::load(&cli.config)
        .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;
    info!("Loaded configuration from {:?}", cli.config);

    let resolver = RoleResolver::from_config(&config).context("Failed to build role resolver")?;

    match cli.command {
        Command::Resolve { principal, identity, raw, explain } => {
            let identity = read_identity(&identity)?;
            let options = ResolveOptions {
                skip_cache: true,
                include_raw_identity: raw,
            };

            let result = resolver.resolve(PrincipalId(principal), &identity, options)?;
            println!("{}", serde_json::to_string_pretty(&result)?);

            if explain {
                let outcome = resolver.explain(&identity);
                println!("{}", serde_json::to_string_pretty(&outcome.diagnostics)?);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Roles => {
            for role in resolver.catalog().roles() {
                let granted: Vec<&str> = role.granted().collect();
                println!("{}\t{}\t{}", role.name, granted.join(","), role.description);
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Check { principal, identity, any, permissions } => {
            let identity = read_identity(&identity)?;
            let result = resolver.resolve(PrincipalId(principal), &identity, ResolveOptions::skip_cache())?;

            let allowed = if any {
                resolver.has_any_permission(&result.permissions, &permissions)
            } else {
                resolver.has_all_permissions(&result.permissions, &permissions)
            };

            println!("{} roles={:?}", if allowed { "ALLOW" } else { "DENY" }, result.roles);
            Ok(if allowed { ExitCode::SUCCESS } else { ExitCode::FAILURE })
        }
    }
}

/// Log filter used when `RUST_LOG` is unset
fn default_log_filter(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "info"
    }
}

fn read_identity(path: &Path) -> Result<IdentityRecord> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read identity record {:?}", path))?;
    let value: serde_json::Value =
        serde_json::from_str(&contents).context("Identity record is not valid JSON")?;
    Ok(IdentityRecord::from_value(&value)?)
}
