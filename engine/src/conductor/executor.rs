//! Conductor Executor
//!
//! Dispatches a single `PlanStep` to the capability registry and wraps the
//! reply as a `ToolResult`. The dispatcher is a pass-through adapter with a
//! bounded wait: no retries, and the only validation is that the reply is a
//! JSON object.

use crate::conductor::types::PlanStep;
use sdk::errors::EngineError;
use sdk::registry::CapabilityRegistry;
use sdk::types::ToolResult;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Default upper bound on one registry call
pub const DEFAULT_DISPATCH_TIMEOUT: Duration = Duration::from_secs(30);

pub struct ToolDispatcher {
    registry: Arc<dyn CapabilityRegistry>,
    timeout: Duration,
}

impl ToolDispatcher {
    pub fn new(registry: Arc<dyn CapabilityRegistry>) -> Self {
        Self::with_timeout(registry, DEFAULT_DISPATCH_TIMEOUT)
    }

    pub fn with_timeout(registry: Arc<dyn CapabilityRegistry>, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    /// Execute a single plan step
    pub async fn execute(&self, step: &PlanStep) -> Result<ToolResult, EngineError> {
        let start = Instant::now();
        debug!("Dispatching step '{}' to {}", step.name, step.tool);

        let reply = match timeout(self.timeout, self.registry.invoke(&step.tool, &step.params)).await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!("Step '{}' failed: {}", step.name, e);
                return Err(e);
            }
            Err(_) => {
                warn!("Step '{}' timed out after {:?}", step.name, self.timeout);
                return Err(EngineError::DispatchTimeout {
                    tool: step.tool.clone(),
                    timeout: self.timeout,
                });
            }
        };

        let output = match reply {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(EngineError::Dispatch {
                    tool: step.tool.clone(),
                    reason: format!("malformed payload: expected object, got {}", kind_of(&other)),
                });
            }
        };

        debug!(
            "Step '{}' completed in {}ms",
            step.name,
            start.elapsed().as_millis()
        );

        Ok(ToolResult::new(step.tool.clone(), output))
    }
}

fn kind_of(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "bool",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
