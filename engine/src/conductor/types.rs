//! Conductor data types

use sdk::types::Params;
use serde::{Deserialize, Serialize};

/// One unit of work: a tool to invoke with its parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    pub name: String,
    pub description: String,
    /// Capability identifier, e.g. `gmail.list_unread`
    pub tool: String,
    /// Opaque payload passed to the tool unmodified
    pub params: Params,
    /// Whether a human must approve this step before dispatch
    #[serde(default)]
    pub requires_approval: bool,
}

/// Ordered list of steps; order equals execution order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub steps: Vec<PlanStep>,
}

impl Plan {
    pub fn new(steps: Vec<PlanStep>) -> Self {
        Self { steps }
    }

    /// A plan with no steps. Valid; it produces the "no results" summary.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }
}
