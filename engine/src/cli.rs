//! CLI interface for EDITH
//!
//! This module provides the command-line interface using clap's derive API.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// EDITH assistant orchestrator
///
/// Classifies a request, plans the tool calls it needs, asks before doing
/// anything with side effects and records what happened.
#[derive(Parser, Debug)]
#[command(name = "edith")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log: Option<String>,

    /// Specify alternate configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run interactive setup wizard
    Setup {
        /// Directory to write config.toml into (default: ~/.edith)
        #[arg(long, value_name = "DIR")]
        config_dir: Option<PathBuf>,
    },

    /// Handle a single message
    Run {
        /// The message to handle
        message: String,

        /// Session to record the turn under
        #[arg(short, long, default_value = "default")]
        session: String,

        /// Approve every step that asks for approval
        #[arg(short, long)]
        yes: bool,
    },

    /// Start an interactive session
    Chat {
        /// Session to record turns under
        #[arg(short, long, default_value = "default")]
        session: String,
    },

    /// List configured MCP capability servers
    Capabilities,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Configuration management actions
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate,
}
