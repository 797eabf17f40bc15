//! Conductor Planner
//!
//! Turns a classified request into an ordered `Plan`. Each intent is served
//! by a `PlanStrategy` registered in a lookup table, so new intents or tools
//! are added by registering a strategy instead of editing a central branch.

use crate::conductor::types::{Plan, PlanStep};
use crate::intent::{IntentResult, IntentType};
use sdk::errors::EngineError;
use sdk::types::{Params, ToolResult};
use serde_json::json;
use std::collections::HashMap;

/// Summary returned when nothing was dispatched
pub const NO_RESULTS_SUMMARY: &str = "No tool results were produced.";

/// Builds the steps for one intent
pub trait PlanStrategy: Send + Sync {
    /// The intent this strategy serves
    fn intent(&self) -> IntentType;

    /// Build the steps for `message`. Must be deterministic.
    fn build(&self, message: &str) -> Vec<PlanStep>;
}

/// Where a single-tool step gets its parameters from
#[derive(Debug, Clone)]
pub enum ParamSource {
    /// A fixed payload, independent of the message
    Fixed(Params),
    /// The raw message under the given key
    Message(&'static str),
}

impl ParamSource {
    fn resolve(&self, message: &str) -> Params {
        match self {
            ParamSource::Fixed(params) => params.clone(),
            ParamSource::Message(key) => {
                let mut params = Params::new();
                params.insert((*key).to_string(), json!(message));
                params
            }
        }
    }
}

/// Table-driven strategy producing exactly one tool step
#[derive(Debug, Clone)]
pub struct ToolStepStrategy {
    intent: IntentType,
    name: &'static str,
    description: &'static str,
    tool: &'static str,
    params: ParamSource,
    requires_approval: bool,
}

impl ToolStepStrategy {
    pub fn new(
        intent: IntentType,
        name: &'static str,
        description: &'static str,
        tool: &'static str,
        params: ParamSource,
        requires_approval: bool,
    ) -> Self {
        Self {
            intent,
            name,
            description,
            tool,
            params,
            requires_approval,
        }
    }
}

impl PlanStrategy for ToolStepStrategy {
    fn intent(&self) -> IntentType {
        self.intent
    }

    fn build(&self, message: &str) -> Vec<PlanStep> {
        vec![PlanStep {
            name: self.name.to_string(),
            description: self.description.to_string(),
            tool: self.tool.to_string(),
            params: self.params.resolve(message),
            requires_approval: self.requires_approval,
        }]
    }
}

/// The built-in intent → tool table.
///
/// Approval is required for actions with external, hard-to-undo side
/// effects: publishing content and driving a visible browser.
pub fn default_strategies() -> Vec<ToolStepStrategy> {
    let mut gmail_params = Params::new();
    gmail_params.insert("limit".to_string(), json!(10));

    vec![
        ToolStepStrategy::new(
            IntentType::Communication,
            "gmail_list",
            "List unread Gmail messages.",
            "gmail.list_unread",
            ParamSource::Fixed(gmail_params),
            false,
        ),
        ToolStepStrategy::new(
            IntentType::ProfessionalPresence,
            "linkedin_post",
            "Create a LinkedIn post draft.",
            "linkedin.create_post",
            ParamSource::Message("content"),
            true,
        ),
        ToolStepStrategy::new(
            IntentType::Developer,
            "github_repo",
            "Describe repository structure.",
            "github.describe_repo",
            ParamSource::Message("query"),
            false,
        ),
        ToolStepStrategy::new(
            IntentType::LiveSearch,
            "search",
            "Run a live search query.",
            "search.query",
            ParamSource::Message("query"),
            false,
        ),
        ToolStepStrategy::new(
            IntentType::Document,
            "doc_analyze",
            "Analyze a document via MCP.",
            "docs.analyze",
            ParamSource::Message("query"),
            false,
        ),
        ToolStepStrategy::new(
            IntentType::WebNavigation,
            "browser_navigate",
            "Navigate with visible browser automation.",
            "browser.navigate",
            ParamSource::Message("task"),
            true,
        ),
        ToolStepStrategy::new(
            IntentType::Chat,
            "chat",
            "Respond conversationally.",
            "chat.respond",
            ParamSource::Message("message"),
            false,
        ),
    ]
}

pub struct Planner {
    strategies: HashMap<IntentType, Box<dyn PlanStrategy>>,
}

impl Planner {
    /// Planner with the built-in strategy table registered
    pub fn new() -> Self {
        let mut planner = Self::empty();
        for strategy in default_strategies() {
            planner.register(Box::new(strategy));
        }
        planner
    }

    /// Planner with no strategies at all
    pub fn empty() -> Self {
        Self {
            strategies: HashMap::new(),
        }
    }

    /// Register a strategy, replacing any existing one for the same intent
    pub fn register(&mut self, strategy: Box<dyn PlanStrategy>) {
        let intent = strategy.intent();
        if self.strategies.insert(intent, strategy).is_some() {
            tracing::debug!("Replaced plan strategy for intent {}", intent);
        }
    }

    pub fn has_strategy(&self, intent: IntentType) -> bool {
        self.strategies.contains_key(&intent)
    }

    /// Build the plan for a classified message
    pub fn build_plan(&self, message: &str, intent: &IntentResult) -> Result<Plan, EngineError> {
        let strategy = self
            .strategies
            .get(&intent.intent)
            .ok_or_else(|| EngineError::PlanConstruction(intent.intent.to_string()))?;

        let plan = Plan::new(strategy.build(message));
        tracing::debug!(
            "Built plan with {} step(s) for intent {}",
            plan.len(),
            intent.intent
        );
        Ok(plan)
    }

    /// One line per dispatched step, 1-based, in plan order.
    ///
    /// Only the first `results.len()` steps are reported; on a completed
    /// turn that is the whole plan.
    pub fn summarize_results(&self, plan: &Plan, results: &[ToolResult]) -> String {
        if results.is_empty() {
            return NO_RESULTS_SUMMARY.to_string();
        }

        plan.steps
            .iter()
            .take(results.len())
            .enumerate()
            .map(|(index, step)| format!("Step {}: {} completed.", index + 1, step.name))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}
