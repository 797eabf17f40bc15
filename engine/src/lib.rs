//! EDITH Engine Library
//!
//! This library provides the orchestration pipeline behind the `edith`
//! binary: classify → plan → gate → dispatch → record → summarize.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Secret management module
pub mod secrets;

/// Intent classification
pub mod intent;

/// Plan construction, step dispatch and session memory
pub mod conductor;

/// Human approval gate
pub mod approval;

/// MCP capability registry
pub mod mcp;

/// Message bus for orchestration events
pub mod message_bus;

/// Turn orchestration
pub mod orchestrator;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
