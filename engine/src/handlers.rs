//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - setup: Interactive configuration wizard
//! - run: Handle a single message
//! - chat: Interactive session with inline approvals
//! - capabilities: List configured MCP servers
//! - config show / validate
//!
//! Interactive handlers are generic over their input and output so they can
//! be driven from tests.

use anyhow::{Context, Result};
use serde_json::json;
use std::future::Future;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, Lines};
use tokio::sync::mpsc;

use crate::approval::{
    ApprovalGate, ApprovalMode, ApprovalPrompt, ApprovalRequest, ChannelApprovalGate,
    DeferredApprovalGate, DenyAllGate, StaticApprovalGate,
};
use crate::conductor::{InMemorySessionStore, Planner, ToolDispatcher};
use crate::config::{default_model_for, Config, OrchestratorConfig, CONFIG_FILE_NAME};
use crate::intent::KeywordClassifier;
use crate::mcp::McpClient;
use crate::message_bus::{EventType, MessageBus};
use crate::orchestrator::{OrchestrationStatus, Orchestrator, OrchestratorResponse};
use crate::secrets::{api_key_name, SecretManager, SecretStore};
use sdk::errors::{EdithErrorExt, EngineError};

/// Output format for command results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Receiver side of an interactive approval gate
pub type PromptReceiver = mpsc::Receiver<ApprovalPrompt>;

/// Build the approval gate selected by config.
///
/// In `prompt` mode the returned receiver must be drained by whoever talks
/// to the human.
pub fn approval_gate(config: &OrchestratorConfig) -> (Arc<dyn ApprovalGate>, Option<PromptReceiver>) {
    match config.approval_mode {
        ApprovalMode::Deny => (Arc::new(DenyAllGate), None),
        ApprovalMode::Defer => (Arc::new(DeferredApprovalGate), None),
        ApprovalMode::Prompt => {
            let (gate, prompts) = ChannelApprovalGate::new(config.approval_timeout());
            (Arc::new(gate), Some(prompts))
        }
    }
}

/// Wire an orchestrator from config with the given gate
pub fn build_orchestrator(config: &Config, gate: Arc<dyn ApprovalGate>) -> Orchestrator {
    let registry = Arc::new(McpClient::from_config(&config.mcp));
    let dispatcher = ToolDispatcher::with_timeout(registry, config.orchestrator.dispatch_timeout());

    Orchestrator::new(
        Arc::new(KeywordClassifier),
        Arc::new(Planner::new()),
        Arc::new(dispatcher),
        gate,
        Arc::new(InMemorySessionStore::new()),
    )
    .with_approval_timeout(config.orchestrator.approval_timeout())
}

// --- setup ---

/// Answers collected by the setup wizard
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupAnswers {
    /// Lower-cased provider id
    pub provider: String,
    pub model: String,
    pub modes: Vec<String>,
    pub local_enabled: bool,
    pub remote_enabled: bool,
    /// Empty when the user skipped it
    pub api_key: String,
}

impl SetupAnswers {
    /// Configuration these answers describe, defaults elsewhere
    pub fn to_config(&self) -> Config {
        let mut config = Config::default();
        config.llm.provider = self.provider.clone();
        config.llm.model = self.model.clone();
        config.interaction.modes = self.modes.clone();
        config.mcp.local_enabled = self.local_enabled;
        config.mcp.remote_enabled = self.remote_enabled;
        config
    }
}

fn read_answer<R: BufRead, W: Write>(input: &mut R, output: &mut W, prompt: &str) -> Result<String> {
    write!(output, "{}: ", prompt)?;
    output.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        anyhow::bail!("Setup aborted: no answer for '{}'", prompt);
    }
    Ok(line.trim().to_string())
}

/// Ask until one of `choices` is given (case-insensitive)
fn prompt_choice<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    prompt: &str,
    choices: &[&'static str],
) -> Result<&'static str> {
    let display = choices.join("/");
    loop {
        let value = read_answer(input, output, &format!("{} ({})", prompt, display))?;
        if let Some(choice) = choices.iter().copied().find(|c| c.eq_ignore_ascii_case(&value)) {
            return Ok(choice);
        }
        writeln!(output, "Please choose one of: {}", display)?;
    }
}

/// Run the setup questions against `input`, echoing prompts to `output`
pub fn run_setup_wizard<R: BufRead, W: Write>(input: &mut R, output: &mut W) -> Result<SetupAnswers> {
    writeln!(output, "EDITH setup wizard")?;

    let provider = prompt_choice(input, output, "Select LLM provider", &["OpenAI", "Gemini", "Groq"])?
        .to_lowercase();

    let model = read_answer(input, output, "Select model")?;
    let model = if model.is_empty() {
        let fallback = default_model_for(&provider);
        writeln!(output, "Using default model {}", fallback)?;
        fallback.to_string()
    } else {
        model
    };

    let modes = read_answer(input, output, "Choose interaction modes (comma-separated)")?
        .split(',')
        .map(|mode| mode.trim().to_string())
        .filter(|mode| !mode.is_empty())
        .collect();

    let local_enabled =
        prompt_choice(input, output, "Enable local MCP servers", &["yes", "no"])? == "yes";
    let remote_enabled =
        prompt_choice(input, output, "Enable remote MCP servers", &["yes", "no"])? == "yes";

    let api_key = read_answer(input, output, "Enter API key (stored in OS keychain)")?;

    Ok(SetupAnswers {
        provider,
        model,
        modes,
        local_enabled,
        remote_enabled,
        api_key,
    })
}

/// Write `config.toml` into `config_dir` and store the API key, if any
pub fn write_setup(
    config_dir: &Path,
    answers: &SetupAnswers,
    secrets: &dyn SecretStore,
) -> Result<PathBuf> {
    let config = answers.to_config();
    config.validate()?;

    let config_path = config_dir.join(CONFIG_FILE_NAME);
    config.save_to_path(&config_path)?;

    if !answers.api_key.is_empty() {
        secrets
            .set_secret(&api_key_name(&answers.provider), &answers.api_key)
            .context("Configuration written but the API key could not be stored")?;
    }

    Ok(config_path)
}

/// Run interactive setup wizard
pub async fn handle_setup(config_dir: Option<PathBuf>) -> Result<()> {
    let config_dir = match config_dir {
        Some(dir) => dir,
        None => Config::default_config_dir()?,
    };

    let answers = {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        run_setup_wizard(&mut stdin.lock(), &mut stdout)?
    };

    let config_path = write_setup(&config_dir, &answers, &SecretManager::default())?;
    println!("Configuration written to {}", config_path.display());
    Ok(())
}

// --- turns ---

async fn next_prompt(prompts: &mut Option<PromptReceiver>) -> Option<ApprovalPrompt> {
    match prompts {
        Some(prompts) => prompts.recv().await,
        None => std::future::pending().await,
    }
}

/// Ask the human about one flagged step. End of input counts as no.
async fn ask_approval<R, W>(request: &ApprovalRequest, lines: &mut Lines<R>, out: &mut W) -> Result<bool>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let step = &request.step;
    write!(
        out,
        "Approve step '{}' ({})? {} (yes/no): ",
        step.name, step.tool, step.description
    )?;
    out.flush()?;

    let answer = lines.next_line().await?.unwrap_or_default();
    let answer = answer.trim();
    Ok(answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes"))
}

/// Poll a turn to completion, answering approval prompts inline.
///
/// The outer error is I/O with the human; the inner one is the turn's.
pub async fn drive_turn<F, R, W>(
    turn: F,
    prompts: &mut Option<PromptReceiver>,
    lines: &mut Lines<R>,
    out: &mut W,
) -> Result<Result<OrchestratorResponse, EngineError>>
where
    F: Future<Output = Result<OrchestratorResponse, EngineError>>,
    R: AsyncBufRead + Unpin,
    W: Write,
{
    tokio::pin!(turn);
    loop {
        tokio::select! {
            result = &mut turn => return Ok(result),
            Some(prompt) = next_prompt(prompts) => {
                tokio::select! {
                    approved = ask_approval(&prompt.request, lines, out) => prompt.respond(approved?),
                    // The gate stopped waiting; the turn carries the timeout
                    result = &mut turn => {
                        writeln!(out)?;
                        return Ok(result);
                    }
                }
            }
        }
    }
}

fn write_response<W: Write>(
    response: &OrchestratorResponse,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(out, "{}", response.summary)?;
            if let OrchestrationStatus::PendingApproval { correlation_id, .. } = &response.status {
                writeln!(out, "Approval id: {}", correlation_id)?;
            }
        }
        OutputFormat::Json => {
            writeln!(out, "{}", serde_json::to_string_pretty(response)?)?;
        }
    }
    Ok(())
}

fn write_error<W: Write>(error: &EngineError, format: OutputFormat, out: &mut W) -> Result<()> {
    match format {
        OutputFormat::Text => writeln!(out, "Error: {}\n  {}", error, error.user_hint())?,
        OutputFormat::Json => {
            let output = json!({
                "error": error.to_string(),
                "hint": error.user_hint(),
                "recoverable": error.is_recoverable(),
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&output)?)?;
        }
    }
    Ok(())
}

/// Handle a single message
pub async fn handle_run(
    message: String,
    session: String,
    yes: bool,
    config: &Config,
    format: OutputFormat,
) -> Result<()> {
    let (gate, mut prompts) = if yes {
        (Arc::new(StaticApprovalGate::allow()) as Arc<dyn ApprovalGate>, None)
    } else {
        approval_gate(&config.orchestrator)
    };
    let orchestrator = build_orchestrator(config, gate);

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = std::io::stdout();

    let response = drive_turn(
        orchestrator.handle_message(&message, &session),
        &mut prompts,
        &mut lines,
        &mut stdout,
    )
    .await??;

    if let OrchestrationStatus::PendingApproval { .. } = response.status {
        tracing::warn!("Parked turns do not outlive this process; use `edith chat` to resume");
    }
    write_response(&response, format, &mut stdout)
}

// --- chat ---

/// One line of chat input
#[derive(Debug, PartialEq, Eq)]
enum ChatInput<'a> {
    Message(&'a str),
    Resolve { correlation_id: &'a str, approved: bool },
    Pending,
    History,
    Quit,
    Usage(&'static str),
    Unknown(&'a str),
}

impl<'a> ChatInput<'a> {
    fn parse(line: &'a str) -> Self {
        let Some(command) = line.strip_prefix('/') else {
            return ChatInput::Message(line);
        };

        let mut parts = command.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let arg = parts.next();

        match (name, arg) {
            ("approve", Some(id)) => ChatInput::Resolve {
                correlation_id: id,
                approved: true,
            },
            ("deny", Some(id)) => ChatInput::Resolve {
                correlation_id: id,
                approved: false,
            },
            ("approve", None) => ChatInput::Usage("/approve <id>"),
            ("deny", None) => ChatInput::Usage("/deny <id>"),
            ("pending", _) => ChatInput::Pending,
            ("history", _) => ChatInput::History,
            ("quit", _) | ("exit", _) => ChatInput::Quit,
            _ => ChatInput::Unknown(line),
        }
    }
}

/// Chat loop over `input`.
///
/// Turn failures are reported and the loop continues; only I/O errors end it.
pub async fn run_chat<R, W>(
    orchestrator: &Orchestrator,
    mut prompts: Option<PromptReceiver>,
    session: &str,
    input: R,
    out: &mut W,
    format: OutputFormat,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(out, "EDITH chat (session {}). Type /quit to exit.", session)?;
    let mut lines = input.lines();

    loop {
        write!(out, "> ")?;
        out.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let outcome = match ChatInput::parse(line) {
            ChatInput::Quit => break,
            ChatInput::Message(message) => {
                drive_turn(
                    orchestrator.handle_message(message, session),
                    &mut prompts,
                    &mut lines,
                    out,
                )
                .await?
            }
            ChatInput::Resolve {
                correlation_id,
                approved,
            } => {
                drive_turn(
                    orchestrator.resume(correlation_id, approved),
                    &mut prompts,
                    &mut lines,
                    out,
                )
                .await?
            }
            ChatInput::Pending => {
                let pending = orchestrator.pending_approvals().await;
                if pending.is_empty() {
                    writeln!(out, "No pending approvals.")?;
                }
                for item in pending {
                    writeln!(
                        out,
                        "{}  step {}: {} ({}) [session {}]",
                        item.correlation_id,
                        item.step_index + 1,
                        item.step_name,
                        item.tool,
                        item.session_id
                    )?;
                }
                continue;
            }
            ChatInput::History => {
                match orchestrator.history(session).await {
                    Ok(Some(memory)) => {
                        for (index, entry) in memory.history.iter().enumerate() {
                            writeln!(
                                out,
                                "{}. {} ({} tool result(s))",
                                index + 1,
                                entry.message,
                                entry.tool_results.len()
                            )?;
                        }
                    }
                    Ok(None) => writeln!(out, "No history for session {}.", session)?,
                    Err(e) => write_error(&e, format, out)?,
                }
                continue;
            }
            ChatInput::Usage(usage) => {
                writeln!(out, "Usage: {}", usage)?;
                continue;
            }
            ChatInput::Unknown(command) => {
                writeln!(
                    out,
                    "Unknown command: {}. Try /approve, /deny, /pending, /history or /quit.",
                    command
                )?;
                continue;
            }
        };

        match outcome {
            Ok(response) => {
                write_response(&response, format, out)?;
                if let OrchestrationStatus::PendingApproval { correlation_id, .. } =
                    &response.status
                {
                    if format == OutputFormat::Text {
                        writeln!(
                            out,
                            "Use /approve {} or /deny {}.",
                            correlation_id, correlation_id
                        )?;
                    }
                }
            }
            Err(e) => write_error(&e, format, out)?,
        }
    }

    Ok(())
}

/// Start an interactive session on stdin/stdout
pub async fn handle_chat(session: String, config: &Config, format: OutputFormat) -> Result<()> {
    let (gate, prompts) = approval_gate(&config.orchestrator);

    let bus = Arc::new(MessageBus::new());
    let mut events = bus.subscribe(EventType::All).await;
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            tracing::debug!("Orchestrator event: {:?}", event);
        }
    });

    let orchestrator = build_orchestrator(config, gate).with_event_bus(bus);
    let input = tokio::io::BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();

    run_chat(&orchestrator, prompts, &session, input, &mut stdout, format).await
}

// --- capabilities / config ---

/// List configured MCP capability servers
pub fn handle_capabilities<W: Write>(config: &Config, format: OutputFormat, out: &mut W) -> Result<()> {
    let client = McpClient::from_config(&config.mcp);
    let servers = client.list_servers();

    match format {
        OutputFormat::Text => {
            if servers.is_empty() {
                writeln!(out, "No MCP servers enabled.")?;
            }
            for server in servers {
                let capabilities: Vec<_> = server.capabilities.iter().map(String::as_str).collect();
                writeln!(
                    out,
                    "{} ({}) {}: {}",
                    server.name,
                    if server.is_remote { "remote" } else { "local" },
                    server.endpoint,
                    capabilities.join(", ")
                )?;
            }
        }
        OutputFormat::Json => {
            let output = json!({ "servers": servers });
            writeln!(out, "{}", serde_json::to_string_pretty(&output)?)?;
        }
    }

    Ok(())
}

/// Show current configuration and whether the provider's API key is stored
pub fn handle_config_show<W: Write>(
    config: &Config,
    secrets: &dyn SecretStore,
    format: OutputFormat,
    out: &mut W,
) -> Result<()> {
    let key = api_key_name(&config.llm.provider);
    let key_status = match secrets.get_secret(&key) {
        Ok(Some(_)) => "stored",
        Ok(None) => "not set",
        Err(e) => {
            tracing::warn!("Could not read '{}': {}", key, e);
            "unavailable"
        }
    };

    match format {
        OutputFormat::Text => {
            write!(out, "{}", toml::to_string_pretty(config)?)?;
            writeln!(out, "\n# {}: {}", key, key_status)?;
        }
        OutputFormat::Json => {
            let output = json!({
                "config": config,
                "api_key": { "name": key, "status": key_status },
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&output)?)?;
        }
    }
    Ok(())
}

/// Validate the configuration file at `path`
pub fn handle_config_validate<W: Write>(path: &Path, format: OutputFormat, out: &mut W) -> Result<()> {
    let result = Config::load_from_path(path);

    match format {
        OutputFormat::Text => match &result {
            Ok(_) => writeln!(out, "Configuration is valid: {}", path.display())?,
            Err(e) => writeln!(out, "Configuration is invalid: {}", e)?,
        },
        OutputFormat::Json => {
            let output = json!({
                "path": path,
                "valid": result.is_ok(),
                "error": result.as_ref().err().map(|e| e.to_string()),
            });
            writeln!(out, "{}", serde_json::to_string_pretty(&output)?)?;
        }
    }

    result.map(|_| ()).map_err(Into::into)
}
