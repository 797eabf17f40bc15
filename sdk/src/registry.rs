//! Capability registry trait
//!
//! This module defines the boundary between the engine's tool dispatcher and
//! whatever layer actually hosts tools (local MCP servers, remote MCP servers,
//! test doubles). The engine only relies on the synchronous request/response
//! contract below; transport, authentication and retries belong to the
//! implementation.

use crate::errors::EngineError;
use crate::types::{CapabilityDescriptor, Params};
use async_trait::async_trait;

/// Trait that every capability registry must implement
#[async_trait]
pub trait CapabilityRegistry: Send + Sync {
    /// Returns the capability servers this registry can route to
    fn list_capabilities(&self) -> Vec<CapabilityDescriptor>;

    /// Invoke `tool` with `params` and return the structured reply.
    ///
    /// The reply is expected to be a JSON object; the dispatcher rejects
    /// anything else as a malformed payload.
    async fn invoke(&self, tool: &str, params: &Params) -> Result<serde_json::Value, EngineError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    struct EchoRegistry;

    #[async_trait]
    impl CapabilityRegistry for EchoRegistry {
        fn list_capabilities(&self) -> Vec<CapabilityDescriptor> {
            Vec::new()
        }

        async fn invoke(
            &self,
            tool: &str,
            params: &Params,
        ) -> Result<serde_json::Value, EngineError> {
            Ok(json!({ "tool": tool, "params": params }))
        }
    }

    #[tokio::test]
    async fn test_registry_is_object_safe() {
        let registry: Arc<dyn CapabilityRegistry> = Arc::new(EchoRegistry);
        let mut params = Params::new();
        params.insert("query".to_string(), json!("rust"));

        let reply = registry.invoke("search.query", &params).await.unwrap();
        assert_eq!(reply["tool"], "search.query");
        assert_eq!(reply["params"]["query"], "rust");
        assert!(registry.list_capabilities().is_empty());
    }
}
