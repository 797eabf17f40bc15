//! MCP capability registry
//!
//! Holds the configured capability servers (local and remote) and answers
//! invocations for the tool dispatcher. Only servers whose locality is
//! enabled in config are registered.
//!
//! The transport to a real MCP server is not part of the engine: `invoke`
//! acknowledges the call with a structured `queued` reply naming the server
//! that advertises the tool, if any.

use crate::config::McpConfig;
use async_trait::async_trait;
use sdk::errors::EngineError;
use sdk::registry::CapabilityRegistry;
use sdk::types::{CapabilityDescriptor, Params};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

/// Registry of MCP servers keyed by server name
#[derive(Debug, Clone, Default)]
pub struct McpClient {
    servers: BTreeMap<String, CapabilityDescriptor>,
}

impl McpClient {
    /// Create a client over the given servers. Later duplicates of a name win.
    pub fn new(servers: Vec<CapabilityDescriptor>) -> Self {
        let servers = servers
            .into_iter()
            .map(|server| (server.name.clone(), server))
            .collect();
        Self { servers }
    }

    /// Build from config, dropping servers whose locality is disabled
    pub fn from_config(config: &McpConfig) -> Self {
        let enabled = config
            .servers
            .iter()
            .filter(|server| {
                if server.is_remote {
                    config.remote_enabled
                } else {
                    config.local_enabled
                }
            })
            .cloned()
            .collect();
        Self::new(enabled)
    }

    /// All registered servers, ordered by name
    pub fn list_servers(&self) -> Vec<&CapabilityDescriptor> {
        self.servers.values().collect()
    }

    /// First server (by name) that advertises `tool`
    pub fn server_for(&self, tool: &str) -> Option<&CapabilityDescriptor> {
        self.servers.values().find(|server| server.supports(tool))
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}

#[async_trait]
impl CapabilityRegistry for McpClient {
    fn list_capabilities(&self) -> Vec<CapabilityDescriptor> {
        self.servers.values().cloned().collect()
    }

    async fn invoke(&self, tool: &str, params: &Params) -> Result<serde_json::Value, EngineError> {
        let mut reply = json!({
            "tool": tool,
            "params": params,
            "status": "queued",
        });

        if let Some(server) = self.server_for(tool) {
            debug!("Routing '{}' to MCP server '{}'", tool, server.name);
            reply["server"] = json!(server.name);
        } else {
            debug!("No MCP server advertises '{}'", tool);
        }

        Ok(reply)
    }
}
