//! Human approval gate
//!
//! Steps flagged `requires_approval` are checked here before dispatch. The
//! gate makes exactly one decision per flagged step:
//!
//! - **Approved**: dispatch the step
//! - **Denied**: cancel the remaining plan (completed steps stay completed)
//! - **Deferred**: park the plan; the caller resumes it later with the
//!   request's correlation id once a human has answered
//!
//! Without an interactive channel the reference gate is conservative and
//! denies everything.

use crate::conductor::types::PlanStep;
use async_trait::async_trait;
use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;

/// Context handed to the gate for one flagged step. Not persisted.
#[derive(Debug, Clone)]
pub struct ApprovalRequest {
    /// Id under which a deferred plan is parked
    pub correlation_id: String,
    pub session_id: String,
    pub step: PlanStep,
}

impl ApprovalRequest {
    pub fn new(
        correlation_id: impl Into<String>,
        session_id: impl Into<String>,
        step: PlanStep,
    ) -> Self {
        Self {
            correlation_id: correlation_id.into(),
            session_id: session_id.into(),
            step,
        }
    }
}

/// Outcome of one approval check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalDecision {
    Approved,
    Denied,
    /// No answer yet; suspend and wait for an external approval event
    Deferred,
}

impl From<bool> for ApprovalDecision {
    fn from(approved: bool) -> Self {
        if approved {
            ApprovalDecision::Approved
        } else {
            ApprovalDecision::Denied
        }
    }
}

/// Decision point for flagged steps
#[async_trait]
pub trait ApprovalGate: Send + Sync {
    async fn request_approval(
        &self,
        request: &ApprovalRequest,
    ) -> Result<ApprovalDecision, EngineError>;
}

/// Denies every request. Used when no interactive channel exists.
#[derive(Debug, Default, Clone, Copy)]
pub struct DenyAllGate;

#[async_trait]
impl ApprovalGate for DenyAllGate {
    async fn request_approval(
        &self,
        request: &ApprovalRequest,
    ) -> Result<ApprovalDecision, EngineError> {
        tracing::warn!(
            "Denying '{}' for session {}: no approval channel",
            request.step.name,
            request.session_id
        );
        Ok(ApprovalDecision::Denied)
    }
}

/// Always answers the same way
#[derive(Debug, Clone, Copy)]
pub struct StaticApprovalGate {
    approve: bool,
}

impl StaticApprovalGate {
    pub fn allow() -> Self {
        Self { approve: true }
    }

    pub fn deny() -> Self {
        Self { approve: false }
    }
}

#[async_trait]
impl ApprovalGate for StaticApprovalGate {
    async fn request_approval(
        &self,
        _request: &ApprovalRequest,
    ) -> Result<ApprovalDecision, EngineError> {
        Ok(self.approve.into())
    }
}

/// Never decides in-process; every flagged step is parked for later resume
#[derive(Debug, Default, Clone, Copy)]
pub struct DeferredApprovalGate;

#[async_trait]
impl ApprovalGate for DeferredApprovalGate {
    async fn request_approval(
        &self,
        request: &ApprovalRequest,
    ) -> Result<ApprovalDecision, EngineError> {
        tracing::info!(
            "Deferring approval of '{}' under {}",
            request.step.name,
            request.correlation_id
        );
        Ok(ApprovalDecision::Deferred)
    }
}

/// A pending question for an interactive front-end
#[derive(Debug)]
pub struct ApprovalPrompt {
    pub request: ApprovalRequest,
    reply: oneshot::Sender<bool>,
}

impl ApprovalPrompt {
    /// Answer the prompt. Ignored if the gate already gave up waiting.
    pub fn respond(self, approved: bool) {
        let _ = self.reply.send(approved);
    }
}

/// Forwards requests to a front-end over a channel and waits, bounded, for
/// the answer
pub struct ChannelApprovalGate {
    prompts: mpsc::Sender<ApprovalPrompt>,
    wait: Duration,
}

impl ChannelApprovalGate {
    /// Create the gate and the receiver the front-end should drain
    pub fn new(wait: Duration) -> (Self, mpsc::Receiver<ApprovalPrompt>) {
        let (tx, rx) = mpsc::channel(8);
        (Self { prompts: tx, wait }, rx)
    }
}

#[async_trait]
impl ApprovalGate for ChannelApprovalGate {
    async fn request_approval(
        &self,
        request: &ApprovalRequest,
    ) -> Result<ApprovalDecision, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        let prompt = ApprovalPrompt {
            request: request.clone(),
            reply: reply_tx,
        };

        self.prompts
            .send(prompt)
            .await
            .map_err(|_| EngineError::ApprovalChannelClosed)?;

        match timeout(self.wait, reply_rx).await {
            Ok(Ok(approved)) => Ok(approved.into()),
            Ok(Err(_)) => Err(EngineError::ApprovalChannelClosed),
            Err(_) => {
                tracing::warn!(
                    "Approval of '{}' timed out after {:?}",
                    request.step.name,
                    self.wait
                );
                Err(EngineError::ApprovalTimeout {
                    step: request.step.name.clone(),
                    timeout: self.wait,
                })
            }
        }
    }
}

/// How flagged steps are decided, as selected in config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalMode {
    /// Deny every flagged step
    #[default]
    Deny,
    /// Ask interactively and wait
    Prompt,
    /// Park the plan and return a correlation id
    Defer,
}

impl fmt::Display for ApprovalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApprovalMode::Deny => f.write_str("deny"),
            ApprovalMode::Prompt => f.write_str("prompt"),
            ApprovalMode::Defer => f.write_str("defer"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sdk::types::Params;

    fn flagged_step() -> PlanStep {
        PlanStep {
            name: "linkedin_post".to_string(),
            description: "Create a LinkedIn post draft.".to_string(),
            tool: "linkedin.create_post".to_string(),
            params: Params::new(),
            requires_approval: true,
        }
    }

    fn request() -> ApprovalRequest {
        ApprovalRequest::new("corr-1", "s1", flagged_step())
    }

    #[tokio::test]
    async fn test_deny_all_gate() {
        let decision = DenyAllGate.request_approval(&request()).await.unwrap();
        assert_eq!(decision, ApprovalDecision::Denied);
    }

    #[tokio::test]
    async fn test_static_gate() {
        let allow = StaticApprovalGate::allow();
        let deny = StaticApprovalGate::deny();
        assert_eq!(
            allow.request_approval(&request()).await.unwrap(),
            ApprovalDecision::Approved
        );
        assert_eq!(
            deny.request_approval(&request()).await.unwrap(),
            ApprovalDecision::Denied
        );
    }

    #[tokio::test]
    async fn test_deferred_gate() {
        let decision = DeferredApprovalGate
            .request_approval(&request())
            .await
            .unwrap();
        assert_eq!(decision, ApprovalDecision::Deferred);
    }

    #[tokio::test]
    async fn test_channel_gate_approves() {
        let (gate, mut prompts) = ChannelApprovalGate::new(Duration::from_secs(5));

        let responder = tokio::spawn(async move {
            let prompt = prompts.recv().await.unwrap();
            assert_eq!(prompt.request.session_id, "s1");
            assert_eq!(prompt.request.step.tool, "linkedin.create_post");
            prompt.respond(true);
        });

        let decision = gate.request_approval(&request()).await.unwrap();
        assert_eq!(decision, ApprovalDecision::Approved);
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn test_channel_gate_denies() {
        let (gate, mut prompts) = ChannelApprovalGate::new(Duration::from_secs(5));

        tokio::spawn(async move {
            if let Some(prompt) = prompts.recv().await {
                prompt.respond(false);
            }
        });

        let decision = gate.request_approval(&request()).await.unwrap();
        assert_eq!(decision, ApprovalDecision::Denied);
    }

    #[tokio::test]
    async fn test_channel_gate_times_out() {
        let (gate, mut prompts) = ChannelApprovalGate::new(Duration::from_millis(50));

        // Hold the prompt without answering
        let holder = tokio::spawn(async move {
            let prompt = prompts.recv().await;
            tokio::time::sleep(Duration::from_millis(200)).await;
            drop(prompt);
        });

        let err = gate.request_approval(&request()).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::ApprovalTimeout { ref step, .. } if step == "linkedin_post"
        ));
        assert_eq!(
            err.to_string(),
            "Approval for step 'linkedin_post' not received within 50ms"
        );
        holder.await.unwrap();
    }

    #[tokio::test]
    async fn test_channel_gate_closed() {
        let (gate, prompts) = ChannelApprovalGate::new(Duration::from_secs(5));
        drop(prompts);

        let err = gate.request_approval(&request()).await.unwrap_err();
        assert!(matches!(err, EngineError::ApprovalChannelClosed));
    }

    #[tokio::test]
    async fn test_dropped_prompt_is_channel_closed() {
        let (gate, mut prompts) = ChannelApprovalGate::new(Duration::from_secs(5));

        tokio::spawn(async move {
            let prompt = prompts.recv().await;
            drop(prompt);
        });

        let err = gate.request_approval(&request()).await.unwrap_err();
        assert!(matches!(err, EngineError::ApprovalChannelClosed));
    }

    #[test]
    fn test_approval_mode_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            mode: ApprovalMode,
        }
        let w: Wrapper = toml::from_str("mode = \"defer\"").unwrap();
        assert_eq!(w.mode, ApprovalMode::Defer);
        assert_eq!(ApprovalMode::default(), ApprovalMode::Deny);
        assert_eq!(ApprovalMode::Prompt.to_string(), "prompt");
    }
}
