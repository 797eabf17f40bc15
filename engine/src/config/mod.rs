//! Configuration management
//!
//! This module handles loading, validation, and management of the EDITH configuration.
//! Configuration is stored in TOML format at ~/.edith/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level, data directory
//! - **llm**: Provider and model selection
//! - **interaction**: Enabled interaction modes (text, voice, ...)
//! - **mcp**: Local/remote capability servers
//! - **orchestrator**: Dispatch and approval timeouts, approval mode
//!
//! API keys are never written here; they live in the OS keychain (see
//! `crate::secrets`).
//!
//! # Examples
//!
//! ```no_run
//! use edith_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! println!("Provider: {}", config.llm.provider);
//! println!("Approval mode: {}", config.orchestrator.approval_mode);
//! # Ok(())
//! # }
//! ```

use crate::approval::ApprovalMode;
use sdk::errors::EngineError;
use sdk::types::CapabilityDescriptor;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Supported LLM providers, lower-cased as stored in config
pub const VALID_PROVIDERS: [&str; 3] = ["openai", "gemini", "groq"];

const VALID_LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

/// Name of the config file inside the config directory
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Main configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    #[serde(default)]
    pub core: CoreConfig,

    /// LLM provider selection
    pub llm: LlmConfig,

    #[serde(default)]
    pub interaction: InteractionConfig,

    /// Capability servers
    #[serde(default)]
    pub mcp: McpConfig,

    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Data directory path (supports ~ expansion)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

/// LLM provider configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    /// openai, gemini or groq
    pub provider: String,

    #[serde(default = "default_model")]
    pub model: String,
    // Note: API key stored in OS keychain, not in config
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionConfig {
    #[serde(default = "default_modes")]
    pub modes: Vec<String>,
}

/// MCP capability servers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpConfig {
    /// Register servers with `is_remote = false`
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Register servers with `is_remote = true`
    #[serde(default)]
    pub remote_enabled: bool,

    #[serde(default)]
    pub servers: Vec<CapabilityDescriptor>,
}

/// Orchestrator limits and approval policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Upper bound on one tool dispatch, in seconds
    #[serde(default = "default_dispatch_timeout_secs")]
    pub dispatch_timeout_secs: u64,

    /// Upper bound on an interactive approval wait, in seconds
    #[serde(default = "default_approval_timeout_secs")]
    pub approval_timeout_secs: u64,

    #[serde(default)]
    pub approval_mode: ApprovalMode,
}

impl OrchestratorConfig {
    pub fn dispatch_timeout(&self) -> Duration {
        Duration::from_secs(self.dispatch_timeout_secs)
    }

    pub fn approval_timeout(&self) -> Duration {
        Duration::from_secs(self.approval_timeout_secs)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("~/.edith")
}

fn default_provider() -> String {
    "openai".to_string()
}

fn default_model() -> String {
    default_model_for("openai").to_string()
}

/// Model used when setup leaves the model blank
pub fn default_model_for(provider: &str) -> &'static str {
    match provider {
        "gemini" => "gemini-1.5-flash",
        "groq" => "llama-3.1-8b-instant",
        _ => "gpt-4o-mini",
    }
}

fn default_modes() -> Vec<String> {
    vec!["text".to_string()]
}

fn default_dispatch_timeout_secs() -> u64 {
    30
}

fn default_approval_timeout_secs() -> u64 {
    120
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            data_dir: default_data_dir(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
        }
    }
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            modes: default_modes(),
        }
    }
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            remote_enabled: false,
            servers: Vec::new(),
        }
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            dispatch_timeout_secs: default_dispatch_timeout_secs(),
            approval_timeout_secs: default_approval_timeout_secs(),
            approval_mode: ApprovalMode::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            core: CoreConfig::default(),
            llm: LlmConfig::default(),
            interaction: InteractionConfig::default(),
            mcp: McpConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.edith/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        let mut config: Config = toml::from_str(&contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate_and_process()?;

        Ok(config)
    }

    /// Write this configuration to `path`, creating parent directories
    pub fn save_to_path(&self, path: &Path) -> Result<(), EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))
    }

    fn create_default(path: &Path) -> Result<Self, EngineError> {
        let mut config = Self::default();
        config.validate_and_process()?;
        config.save_to_path(path)?;
        Ok(config)
    }

    /// The default configuration directory (~/.edith)
    pub fn default_config_dir() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".edith"))
    }

    /// The default configuration file path (~/.edith/config.toml)
    pub fn default_config_path() -> Result<PathBuf, EngineError> {
        Ok(Self::default_config_dir()?.join(CONFIG_FILE_NAME))
    }

    /// Check values without touching the filesystem
    pub fn validate(&self) -> Result<(), EngineError> {
        if !VALID_LOG_LEVELS.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                VALID_LOG_LEVELS.join(", ")
            )));
        }

        if !VALID_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid provider '{}'. Must be one of: {}",
                self.llm.provider,
                VALID_PROVIDERS.join(", ")
            )));
        }

        if self.llm.model.trim().is_empty() {
            return Err(EngineError::Config("llm.model must not be empty".to_string()));
        }

        if self.orchestrator.dispatch_timeout_secs == 0 {
            return Err(EngineError::Config(
                "dispatch_timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.orchestrator.approval_timeout_secs == 0 {
            return Err(EngineError::Config(
                "approval_timeout_secs must be greater than 0".to_string(),
            ));
        }

        let mut names = HashSet::new();
        for server in &self.mcp.servers {
            if server.name.trim().is_empty() {
                return Err(EngineError::Config(
                    "MCP server name must not be empty".to_string(),
                ));
            }
            if server.endpoint.trim().is_empty() {
                return Err(EngineError::Config(format!(
                    "MCP server '{}' has no endpoint",
                    server.name
                )));
            }
            if !names.insert(server.name.as_str()) {
                return Err(EngineError::Config(format!(
                    "Duplicate MCP server name '{}'",
                    server.name
                )));
            }
        }

        Ok(())
    }

    /// Validate, expand paths and create the data directory
    fn validate_and_process(&mut self) -> Result<(), EngineError> {
        self.validate()?;

        self.core.data_dir = expand_path(&self.core.data_dir)?;

        if !self.core.data_dir.exists() {
            fs::create_dir_all(&self.core.data_dir).map_err(|e| {
                EngineError::Config(format!("Failed to create data directory: {}", e))
            })?;
        }

        Ok(())
    }
}

/// Expand ~ in path to user's home directory
pub fn expand_path(path: &Path) -> Result<PathBuf, EngineError> {
    let path_str = path
        .to_str()
        .ok_or_else(|| EngineError::Config("Invalid UTF-8 in path".to_string()))?;

    if let Some(rest) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(rest))
    } else if path_str == "~" {
        dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))
    } else {
        Ok(path.to_path_buf())
    }
}
