// EDITH assistant orchestrator
// Main entry point for the edith binary

use clap::Parser;
use edith_engine::cli::{Cli, Command, ConfigAction};
use edith_engine::config::Config;
use edith_engine::handlers::{
    handle_capabilities, handle_chat, handle_config_show, handle_config_validate, handle_run,
    handle_setup, OutputFormat,
};
use edith_engine::secrets::SecretManager;
use edith_engine::telemetry::{init_telemetry, init_telemetry_with_level, LogLevelHandle};
use std::path::Path;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize telemetry first (before config is loaded). Without --log,
    // the handle lets the configured level replace the default later.
    let log_level = match &cli.log {
        Some(level) => {
            init_telemetry_with_level(level);
            None
        }
        None => init_telemetry(),
    };
    let log_level = log_level.as_ref();

    tracing::info!("EDITH v{}", env!("CARGO_PKG_VERSION"));

    // Determine output format
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Text
    };

    match cli.command {
        Command::Setup { config_dir } => {
            tracing::info!("Running setup wizard...");
            handle_setup(config_dir).await
        }

        Command::Run {
            message,
            session,
            yes,
        } => {
            let config = load_config(cli.config.as_deref(), log_level)?;
            tracing::info!("Handling message for session {}", session);
            handle_run(message, session, yes, &config, format).await
        }

        Command::Chat { session } => {
            let config = load_config(cli.config.as_deref(), log_level)?;
            tracing::info!("Starting chat for session {}", session);
            handle_chat(session, &config, format).await
        }

        Command::Capabilities => {
            let config = load_config(cli.config.as_deref(), log_level)?;
            handle_capabilities(&config, format, &mut std::io::stdout())
        }

        Command::Config { action } => {
            tracing::info!("Config management: {:?}", action);
            match action {
                ConfigAction::Show => {
                    let config = load_config(cli.config.as_deref(), log_level)?;
                    handle_config_show(
                        &config,
                        &SecretManager::default(),
                        format,
                        &mut std::io::stdout(),
                    )
                }
                ConfigAction::Validate => {
                    let path = match cli.config {
                        Some(path) => path,
                        None => Config::default_config_path()?,
                    };
                    handle_config_validate(&path, format, &mut std::io::stdout())
                }
            }
        }
    }
}

/// Load configuration (or use custom path if provided)
fn load_config(path: Option<&Path>, log_level: Option<&LogLevelHandle>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load_or_create()?,
    };

    // Config-driven log level; RUST_LOG still wins
    if let Some(handle) = log_level {
        handle.apply_config_level(&config.core.log_level)?;
    }

    Ok(config)
}
