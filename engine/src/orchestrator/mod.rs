//! Orchestrator
//!
//! Drives one user turn through the pipeline:
//!
//! 1. Classify the message (once)
//! 2. Build the plan (once)
//! 3. For each step in order: gate it if flagged, then dispatch it
//! 4. Record `{message, tool_results}` in session memory
//! 5. Summarize
//!
//! # Outcomes
//!
//! - **Completed**: every step dispatched and the turn was recorded
//! - **Cancelled**: the gate denied a step; earlier results are returned,
//!   nothing is recorded
//! - **PendingApproval**: the gate deferred a step; the turn is parked under
//!   a correlation id and continues when `resume` is called with it
//!
//! A dispatch failure aborts the remaining plan, records nothing and is
//! returned as the error.
//!
//! # Concurrency
//!
//! Turns for the same session are serialized by a per-session lock, so
//! history entries land in request order. Different sessions never contend.
//! A parked turn does not hold its session's lock; `resume` takes it again.
//!
//! With an approval timeout set, parked turns older than the timeout are
//! dropped: `resume` reports `ApprovalTimeout` for them and
//! `pending_approvals` no longer lists them.

use crate::approval::{ApprovalDecision, ApprovalGate, ApprovalRequest};
use crate::conductor::{Plan, Planner, SessionMemory, SessionStore, ToolDispatcher};
use crate::intent::Classifier;
use crate::message_bus::{Event, MessageBus};
use sdk::errors::EngineError;
use sdk::types::ToolResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Summary returned when the gate denies a step
pub const CANCELLED_SUMMARY: &str = "Action cancelled pending user approval.";

/// How a turn ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OrchestrationStatus {
    Completed,
    Cancelled,
    /// Parked; call `Orchestrator::resume` with `correlation_id`
    PendingApproval {
        correlation_id: String,
        step_index: usize,
    },
}

/// What the caller gets back for a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorResponse {
    pub summary: String,
    pub plan: Plan,
    pub tool_results: Vec<ToolResult>,
    pub status: OrchestrationStatus,
}

/// A parked turn as seen from outside
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingApproval {
    pub correlation_id: String,
    pub session_id: String,
    pub step_index: usize,
    pub step_name: String,
    pub tool: String,
}

/// Execution state of one turn between segments
#[derive(Debug, Clone)]
struct TurnState {
    session_id: String,
    message: String,
    plan: Plan,
    next_step: usize,
    results: Vec<ToolResult>,
}

struct ParkedTurn {
    turn: TurnState,
    parked_at: Instant,
}

pub struct Orchestrator {
    classifier: Arc<dyn Classifier>,
    planner: Arc<Planner>,
    dispatcher: Arc<ToolDispatcher>,
    gate: Arc<dyn ApprovalGate>,
    store: Arc<dyn SessionStore>,
    bus: Option<Arc<MessageBus>>,
    approval_timeout: Option<Duration>,
    session_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    parked: Mutex<HashMap<String, ParkedTurn>>,
}

impl Orchestrator {
    pub fn new(
        classifier: Arc<dyn Classifier>,
        planner: Arc<Planner>,
        dispatcher: Arc<ToolDispatcher>,
        gate: Arc<dyn ApprovalGate>,
        store: Arc<dyn SessionStore>,
    ) -> Self {
        Self {
            classifier,
            planner,
            dispatcher,
            gate,
            store,
            bus: None,
            approval_timeout: None,
            session_locks: Mutex::new(HashMap::new()),
            parked: Mutex::new(HashMap::new()),
        }
    }

    /// Publish turn events on `bus`
    pub fn with_event_bus(mut self, bus: Arc<MessageBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Expire parked turns that wait longer than `timeout` for an answer
    pub fn with_approval_timeout(mut self, timeout: Duration) -> Self {
        self.approval_timeout = Some(timeout);
        self
    }

    /// Run one turn for `session_id`
    pub async fn handle_message(
        &self,
        message: &str,
        session_id: &str,
    ) -> Result<OrchestratorResponse, EngineError> {
        let lock = self.session_lock(session_id).await;
        let _guard = lock.lock().await;

        info!("Handling message for session {}", session_id);
        self.emit(Event::TurnStarted {
            session_id: session_id.to_string(),
            message: message.to_string(),
        })
        .await;

        let intent = match self.classifier.classify(message) {
            Ok(intent) => intent,
            Err(e) => return Err(self.fail(session_id, e).await),
        };
        debug!(
            "Classified as {} ({:.2})",
            intent.intent, intent.confidence
        );
        self.emit(Event::IntentClassified {
            session_id: session_id.to_string(),
            intent: intent.intent,
            confidence: intent.confidence,
        })
        .await;

        let plan = match self.planner.build_plan(message, &intent) {
            Ok(plan) => plan,
            Err(e) => return Err(self.fail(session_id, e).await),
        };
        self.emit(Event::PlanBuilt {
            session_id: session_id.to_string(),
            steps: plan.len(),
        })
        .await;

        let turn = TurnState {
            session_id: session_id.to_string(),
            message: message.to_string(),
            plan,
            next_step: 0,
            results: Vec::new(),
        };

        self.run(turn, None).await
    }

    /// Answer a parked turn.
    ///
    /// Approved: the parked step is dispatched without asking the gate again
    /// and the plan continues. Denied: the turn is cancelled.
    pub async fn resume(
        &self,
        correlation_id: &str,
        approved: bool,
    ) -> Result<OrchestratorResponse, EngineError> {
        let parked = self
            .parked
            .lock()
            .await
            .remove(correlation_id)
            .ok_or_else(|| EngineError::UnknownApproval(correlation_id.to_string()))?;

        if let Some(timeout) = self.expiry(&parked) {
            let turn = parked.turn;
            warn!(
                "Approval {} for session {} expired after {:?}",
                correlation_id, turn.session_id, timeout
            );
            let step = turn
                .plan
                .steps
                .get(turn.next_step)
                .map(|step| step.name.clone())
                .unwrap_or_default();
            let error = EngineError::ApprovalTimeout { step, timeout };
            return Err(self.fail(&turn.session_id, error).await);
        }
        let turn = parked.turn;

        info!(
            "Resuming {} for session {} (approved: {})",
            correlation_id, turn.session_id, approved
        );
        self.emit(Event::ApprovalResolved {
            correlation_id: correlation_id.to_string(),
            approved,
        })
        .await;

        let lock = self.session_lock(&turn.session_id).await;
        let _guard = lock.lock().await;

        if approved {
            let step_index = turn.next_step;
            self.run(turn, Some(step_index)).await
        } else {
            let step_index = turn.next_step;
            Ok(self.cancel(turn, step_index).await)
        }
    }

    /// Parked turns, ordered by correlation id. Expired ones are dropped.
    pub async fn pending_approvals(&self) -> Vec<PendingApproval> {
        let mut parked = self.parked.lock().await;
        self.prune_expired(&mut parked);

        let mut pending: Vec<_> = parked
            .iter()
            .filter_map(|(id, ParkedTurn { turn, .. })| {
                let step = turn.plan.steps.get(turn.next_step)?;
                Some(PendingApproval {
                    correlation_id: id.clone(),
                    session_id: turn.session_id.clone(),
                    step_index: turn.next_step,
                    step_name: step.name.clone(),
                    tool: step.tool.clone(),
                })
            })
            .collect();
        pending.sort_by(|a, b| a.correlation_id.cmp(&b.correlation_id));
        pending
    }

    /// Recorded history for a session
    pub async fn history(&self, session_id: &str) -> Result<Option<SessionMemory>, EngineError> {
        self.store.load(session_id).await
    }

    /// Execute from `turn.next_step` to the end of the plan.
    ///
    /// `pre_approved` names a step whose approval was already granted.
    async fn run(
        &self,
        mut turn: TurnState,
        pre_approved: Option<usize>,
    ) -> Result<OrchestratorResponse, EngineError> {
        while turn.next_step < turn.plan.len() {
            let index = turn.next_step;
            let step = turn.plan.steps[index].clone();

            if step.requires_approval && pre_approved != Some(index) {
                let request =
                    ApprovalRequest::new(Uuid::new_v4().to_string(), &turn.session_id, step.clone());

                let decision = match self.gate.request_approval(&request).await {
                    Ok(decision) => decision,
                    Err(e) => return Err(self.fail(&turn.session_id, e).await),
                };

                match decision {
                    ApprovalDecision::Approved => {
                        debug!("Step '{}' approved", step.name);
                    }
                    ApprovalDecision::Denied => {
                        return Ok(self.cancel(turn, index).await);
                    }
                    ApprovalDecision::Deferred => {
                        return Ok(self.park(turn, request.correlation_id).await);
                    }
                }
            }

            let result = match self.dispatcher.execute(&step).await {
                Ok(result) => result,
                Err(e) => {
                    error!(
                        "Aborting plan for session {} at step {}: {}",
                        turn.session_id,
                        index + 1,
                        e
                    );
                    return Err(self.fail(&turn.session_id, e).await);
                }
            };

            self.emit(Event::StepDispatched {
                session_id: turn.session_id.clone(),
                step_index: index,
                tool: step.tool.clone(),
            })
            .await;

            turn.results.push(result);
            turn.next_step += 1;
        }

        self.record(turn).await
    }

    async fn record(&self, turn: TurnState) -> Result<OrchestratorResponse, EngineError> {
        if let Err(e) = self
            .store
            .save(&turn.session_id, &turn.message, &turn.results)
            .await
        {
            let e = match e {
                EngineError::MemoryWrite(_) => e,
                other => EngineError::MemoryWrite(other.to_string()),
            };
            return Err(self.fail(&turn.session_id, e).await);
        }

        let summary = self.planner.summarize_results(&turn.plan, &turn.results);
        info!(
            "Session {} turn completed with {} result(s)",
            turn.session_id,
            turn.results.len()
        );
        self.emit(Event::TurnCompleted {
            session_id: turn.session_id.clone(),
            steps: turn.results.len(),
        })
        .await;

        Ok(OrchestratorResponse {
            summary,
            plan: turn.plan,
            tool_results: turn.results,
            status: OrchestrationStatus::Completed,
        })
    }

    async fn cancel(&self, turn: TurnState, step_index: usize) -> OrchestratorResponse {
        warn!(
            "Session {} cancelled at step {}: approval denied",
            turn.session_id,
            step_index + 1
        );
        self.emit(Event::TurnCancelled {
            session_id: turn.session_id.clone(),
            step_index,
        })
        .await;

        OrchestratorResponse {
            summary: CANCELLED_SUMMARY.to_string(),
            plan: turn.plan,
            tool_results: turn.results,
            status: OrchestrationStatus::Cancelled,
        }
    }

    async fn park(&self, turn: TurnState, correlation_id: String) -> OrchestratorResponse {
        let step_index = turn.next_step;
        let step = &turn.plan.steps[step_index];
        let summary = format!("Awaiting approval for step {}: {}.", step_index + 1, step.name);

        info!(
            "Session {} parked at step {} under {}",
            turn.session_id,
            step_index + 1,
            correlation_id
        );
        self.emit(Event::ApprovalRequested {
            correlation_id: correlation_id.clone(),
            session_id: turn.session_id.clone(),
            step_name: step.name.clone(),
            tool: step.tool.clone(),
        })
        .await;

        let response = OrchestratorResponse {
            summary,
            plan: turn.plan.clone(),
            tool_results: turn.results.clone(),
            status: OrchestrationStatus::PendingApproval {
                correlation_id: correlation_id.clone(),
                step_index,
            },
        };

        let mut parked = self.parked.lock().await;
        self.prune_expired(&mut parked);
        parked.insert(
            correlation_id,
            ParkedTurn {
                turn,
                parked_at: Instant::now(),
            },
        );
        response
    }

    /// The timeout a parked turn has outlived, if any
    fn expiry(&self, parked: &ParkedTurn) -> Option<Duration> {
        self.approval_timeout
            .filter(|timeout| parked.parked_at.elapsed() >= *timeout)
    }

    fn prune_expired(&self, parked: &mut HashMap<String, ParkedTurn>) {
        parked.retain(|id, turn| {
            let expired = self.expiry(turn).is_some();
            if expired {
                debug!("Dropping expired approval {}", id);
            }
            !expired
        });
    }

    async fn fail(&self, session_id: &str, error: EngineError) -> EngineError {
        self.emit(Event::TurnFailed {
            session_id: session_id.to_string(),
            error: error.to_string(),
        })
        .await;
        error
    }

    async fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.session_locks.lock().await;
        Arc::clone(
            locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        )
    }

    async fn emit(&self, event: Event) {
        if let Some(bus) = &self.bus {
            bus.publish(event).await;
        }
    }
}
