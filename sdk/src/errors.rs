//! Error types and handling
//!
//! This module provides the error type used throughout the EDITH engine.
//! All errors implement the `EdithErrorExt` trait which provides user-friendly
//! hints and indicates whether errors are recoverable.
//!
//! # Security
//!
//! Hints are static strings. They never echo the user's message, tool
//! parameters or API keys back to the caller.

use std::time::Duration;
use thiserror::Error;

/// Trait for EDITH error extensions
///
/// This trait provides additional context for errors, including user-friendly
/// hints and recoverability information. All engine errors implement this trait.
pub trait EdithErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is safe to display to end users and does not contain:
    /// - Secrets (API keys, tokens, passwords)
    /// - Message or parameter contents
    /// - Internal implementation details
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors can be retried or worked around. Non-recoverable
    /// errors typically require a configuration change or a code change.
    fn is_recoverable(&self) -> bool;
}

/// Main engine error type
///
/// # Error Categories
///
/// - **Configuration**: Invalid or missing configuration
/// - **Classification / Planning**: No intent or no plan could be produced
/// - **Approval**: Human approval timed out or the approval channel went away
/// - **Dispatch**: Capability registry errors, timeouts, malformed payloads
/// - **Memory**: Session store unavailable when recording a turn
///
/// # Examples
///
/// ```
/// use sdk::errors::{EngineError, EdithErrorExt};
/// use std::time::Duration;
///
/// let error = EngineError::DispatchTimeout {
///     tool: "gmail.list_unread".to_string(),
///     timeout: Duration::from_secs(30),
/// };
/// assert!(error.is_dispatch_failure());
/// assert!(error.is_recoverable());
///
/// let fatal_error = EngineError::PlanConstruction("chat".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Classification errors
    #[error("Classification failed: {0}")]
    ClassificationFailure(String),

    // Planning errors
    #[error("No plan strategy registered for intent: {0}")]
    PlanConstruction(String),

    // Approval errors
    #[error("Approval for step '{step}' not received within {timeout:?}")]
    ApprovalTimeout { step: String, timeout: Duration },

    #[error("Approval channel closed")]
    ApprovalChannelClosed,

    #[error("No pending approval with correlation id: {0}")]
    UnknownApproval(String),

    // Dispatch errors
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Dispatch of '{tool}' failed: {reason}")]
    Dispatch { tool: String, reason: String },

    #[error("Dispatch of '{tool}' timed out after {timeout:?}")]
    DispatchTimeout { tool: String, timeout: Duration },

    // Session memory errors
    #[error("Failed to record session history: {0}")]
    MemoryWrite(String),

    // Keyring errors
    #[error("Keyring error: {0}")]
    KeyringError(String),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Whether this error belongs to the dispatch failure kind
    /// (registry error, unknown tool, timeout or malformed payload).
    pub fn is_dispatch_failure(&self) -> bool {
        matches!(
            self,
            Self::ToolNotFound(_) | Self::Dispatch { .. } | Self::DispatchTimeout { .. }
        )
    }
}

impl EdithErrorExt for EngineError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",

            Self::ClassificationFailure(_) => "Could not understand the request. Try rephrasing it",
            Self::PlanConstruction(_) => "No action is configured for this kind of request",

            Self::ApprovalTimeout { .. } => "Approval was not given in time. Run the request again",
            Self::ApprovalChannelClosed => "No approval prompt is available in this session",
            Self::UnknownApproval(_) => "Nothing is waiting for approval under that id",

            Self::ToolNotFound(_) => "The requested tool is not available",
            Self::Dispatch { .. } => "Tool invocation failed. Check your MCP server settings",
            Self::DispatchTimeout { .. } => "Tool took too long to respond. Try again",

            Self::MemoryWrite(_) => "Session history could not be saved",

            Self::KeyringError(_) => "Failed to access secure storage. Check system keychain",

            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            // Non-recoverable errors
            Self::Config(_) | Self::PlanConstruction(_) | Self::ApprovalChannelClosed => false,

            // All other errors are potentially recoverable
            _ => true,
        }
    }
}
