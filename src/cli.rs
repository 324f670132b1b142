use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use ipgate::config::{Config, IP_FILTER_ENV};
use ipgate::filter::{self, FilterSpec};

#[derive(Parser)]
#[command(name = "ipgate")]
#[command(author, version, about = "IP address filter for request admission")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check a remote address against the configured filter
    Check {
        /// Remote address to check (IPv4 or IPv6)
        addr: String,

        /// Filter specification (overrides config file and environment)
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Validate every entry of a filter specification
    Validate {
        /// Filter specification to validate
        spec: String,
    },
}

/// Run a CLI command, returning the process exit code.
pub fn run_command(cli: Cli) -> Result<i32> {
    match cli.command {
        Commands::Check { addr, filter } => {
            let filter = match filter {
                Some(filter) => Some(filter),
                None => Config::load_or_env(cli.config.as_deref())?.ip_filter,
            };
            let Some(filter) = filter else {
                bail!(
                    "no IP filter configured (use --filter, {}, or a config file)",
                    IP_FILTER_ENV
                );
            };

            if filter::matches(Some(&addr), Some(&filter)) {
                println!("{} {}", addr, "allowed".green());
                Ok(0)
            } else {
                println!("{} {}", addr, "denied".red());
                Ok(1)
            }
        }

        Commands::Validate { spec } => {
            let (parsed, errors) = FilterSpec::parse_all(&spec);
            for entry in parsed.entries() {
                println!("{:<42} {}", entry.to_string(), "ok".green());
            }
            for err in &errors {
                println!("{:<42} {} {}", err.token, "invalid:".red(), err.source);
            }
            Ok(if errors.is_empty() { 0 } else { 1 })
        }
    }
}
