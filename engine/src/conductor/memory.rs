//! Session Memory
//!
//! Per-session interaction history. Each completed turn appends the user's
//! message and the tool results it produced. Records are created lazily on
//! first save, grow monotonically and are never pruned here; expiry is the
//! store owner's concern.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sdk::errors::EngineError;
use sdk::types::ToolResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// One recorded turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub message: String,
    pub tool_results: Vec<ToolResult>,
    pub recorded_at: DateTime<Utc>,
}

/// All recorded turns for one session, oldest first
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMemory {
    pub session_id: String,
    pub history: Vec<HistoryEntry>,
}

impl SessionMemory {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            history: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn last(&self) -> Option<&HistoryEntry> {
        self.history.last()
    }
}

/// Storage boundary for session history
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Append one turn, creating the session record if absent
    async fn save(
        &self,
        session_id: &str,
        message: &str,
        tool_results: &[ToolResult],
    ) -> Result<(), EngineError>;

    /// Snapshot of a session, if it has ever been saved to
    async fn load(&self, session_id: &str) -> Result<Option<SessionMemory>, EngineError>;
}

/// Process-lifetime store backed by a map
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, SessionMemory>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(
        &self,
        session_id: &str,
        message: &str,
        tool_results: &[ToolResult],
    ) -> Result<(), EngineError> {
        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionMemory::new(session_id));

        session.history.push(HistoryEntry {
            message: message.to_string(),
            tool_results: tool_results.to_vec(),
            recorded_at: Utc::now(),
        });

        tracing::debug!(
            "Session {} now has {} entr{}",
            session_id,
            session.len(),
            if session.len() == 1 { "y" } else { "ies" }
        );
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Option<SessionMemory>, EngineError> {
        Ok(self.sessions.read().await.get(session_id).cloned())
    }
}
