//! Command line argument parsing
//!
//! This module handles CLI argument parsing with subcommands:
//! - `inspect`: Show the persisted snapshot
//! - `migrate`: Upgrade the snapshot to the current schema in place
//! - `clear`: Delete the snapshot
//! - `show-config`: Show configuration discovery information
//! - `init-config`: Write a default user configuration file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, PartialEq)]
pub enum ExecutionMode {
    Inspect { json: bool },
    Migrate,
    Clear,
    ShowConfig,
    InitConfig,
}

#[derive(Debug, Parser)]
#[command(name = "hot-exit")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Inspect and maintain the hot exit session snapshot")]
#[command(long_about = None)]
#[command(arg_required_else_help = true)]
pub struct Args {
    /// Directory holding the snapshot (overrides configuration)
    #[arg(long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Configuration file path (skips discovery)
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show the persisted session snapshot
    Inspect {
        /// Print the raw snapshot as JSON
        #[arg(long = "json")]
        json: bool,
    },
    /// Migrate the snapshot to the current schema and rewrite it
    Migrate,
    /// Delete the snapshot
    Clear,
    /// Show configuration discovery information
    ShowConfig,
    /// Create a default configuration file in the user config directory
    InitConfig,
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }

    pub fn mode(&self) -> Result<ExecutionMode, String> {
        match &self.command {
            Some(Commands::Inspect { json }) => Ok(ExecutionMode::Inspect { json: *json }),
            Some(Commands::Migrate) => Ok(ExecutionMode::Migrate),
            Some(Commands::Clear) => Ok(ExecutionMode::Clear),
            Some(Commands::ShowConfig) => Ok(ExecutionMode::ShowConfig),
            Some(Commands::InitConfig) => Ok(ExecutionMode::InitConfig),
            None => Err(
                "No command specified. Use 'hot-exit --help' to see available commands."
                    .to_string(),
            ),
        }
    }
}
