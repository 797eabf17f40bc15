//! Tool invocation types shared between the engine and capability registries

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Opaque parameter payload passed through to a tool unmodified
pub type Params = serde_json::Map<String, serde_json::Value>;

/// Structured reply for one dispatched plan step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResult {
    /// Tool identifier that produced this result
    pub tool: String,
    /// Registry reply, passed through unmodified
    pub output: Params,
}

impl ToolResult {
    /// Create a new ToolResult
    pub fn new(tool: impl Into<String>, output: Params) -> Self {
        Self {
            tool: tool.into(),
            output,
        }
    }

    /// Get a string field from the output
    pub fn output_str(&self, key: &str) -> Option<&str> {
        self.output.get(key).and_then(|v| v.as_str())
    }
}

/// Description of one capability server (local or remote)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    pub name: String,
    pub endpoint: String,
    pub is_remote: bool,
    #[serde(default)]
    pub capabilities: BTreeSet<String>,
}

impl CapabilityDescriptor {
    /// Whether this server advertises `tool`.
    ///
    /// A server matches either the full tool id (`gmail.list_unread`) or its
    /// namespace (`gmail`).
    pub fn supports(&self, tool: &str) -> bool {
        if self.capabilities.contains(tool) {
            return true;
        }
        match tool.split_once('.') {
            Some((namespace, _)) => self.capabilities.contains(namespace),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn descriptor(caps: &[&str]) -> CapabilityDescriptor {
        CapabilityDescriptor {
            name: "google".to_string(),
            endpoint: "http://localhost:8931".to_string(),
            is_remote: false,
            capabilities: caps.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_supports_exact_tool() {
        let desc = descriptor(&["gmail.list_unread"]);
        assert!(desc.supports("gmail.list_unread"));
        assert!(!desc.supports("gmail.send"));
    }

    #[test]
    fn test_supports_namespace() {
        let desc = descriptor(&["gmail"]);
        assert!(desc.supports("gmail.list_unread"));
        assert!(desc.supports("gmail.send"));
        assert!(!desc.supports("github.describe_repo"));
        assert!(!desc.supports("gmailx.list"));
    }

    #[test]
    fn test_tool_result_output_str() {
        let mut output = Params::new();
        output.insert("status".to_string(), json!("queued"));
        output.insert("count".to_string(), json!(3));

        let result = ToolResult::new("search.query", output);
        assert_eq!(result.output_str("status"), Some("queued"));
        assert_eq!(result.output_str("count"), None);
        assert_eq!(result.output_str("missing"), None);
    }

    #[test]
    fn test_descriptor_deserialize_without_capabilities() {
        let desc: CapabilityDescriptor = serde_json::from_value(json!({
            "name": "docs",
            "endpoint": "stdio://docs-server",
            "is_remote": false
        }))
        .unwrap();
        assert!(desc.capabilities.is_empty());
    }
}
