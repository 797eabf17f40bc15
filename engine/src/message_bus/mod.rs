//! Message Bus for orchestration events
//!
//! The MessageBus provides a pub/sub channel for front-ends (CLI, API
//! layers) to follow a turn as it moves through the orchestrator, and in
//! particular to learn that a plan was parked waiting for approval.
//!
//! Subscribers get bounded channels. Publishing never waits: a subscriber
//! whose buffer is full, or who dropped its receiver, misses the event.

use crate::intent::IntentType;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

/// Channel buffer size for bounded channels
const CHANNEL_BUFFER_SIZE: usize = 100;

/// Event types that can be published on the message bus
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq)]
pub enum EventType {
    TurnStarted,
    IntentClassified,
    PlanBuilt,
    StepDispatched,
    ApprovalRequested,
    ApprovalResolved,
    TurnCompleted,
    TurnCancelled,
    TurnFailed,
    /// Subscribe to all event types
    All,
}

/// Events that can be published on the message bus
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    TurnStarted {
        session_id: String,
        message: String,
    },
    IntentClassified {
        session_id: String,
        intent: IntentType,
        confidence: f32,
    },
    PlanBuilt {
        session_id: String,
        steps: usize,
    },
    StepDispatched {
        session_id: String,
        step_index: usize,
        tool: String,
    },
    /// A plan was parked; answer with `Orchestrator::resume(correlation_id, ..)`
    ApprovalRequested {
        correlation_id: String,
        session_id: String,
        step_name: String,
        tool: String,
    },
    ApprovalResolved {
        correlation_id: String,
        approved: bool,
    },
    TurnCompleted {
        session_id: String,
        steps: usize,
    },
    TurnCancelled {
        session_id: String,
        step_index: usize,
    },
    TurnFailed {
        session_id: String,
        error: String,
    },
}

impl Event {
    /// Get the event type for this event
    pub fn event_type(&self) -> EventType {
        match self {
            Event::TurnStarted { .. } => EventType::TurnStarted,
            Event::IntentClassified { .. } => EventType::IntentClassified,
            Event::PlanBuilt { .. } => EventType::PlanBuilt,
            Event::StepDispatched { .. } => EventType::StepDispatched,
            Event::ApprovalRequested { .. } => EventType::ApprovalRequested,
            Event::ApprovalResolved { .. } => EventType::ApprovalResolved,
            Event::TurnCompleted { .. } => EventType::TurnCompleted,
            Event::TurnCancelled { .. } => EventType::TurnCancelled,
            Event::TurnFailed { .. } => EventType::TurnFailed,
        }
    }
}

/// Message bus for pub/sub communication between components
pub struct MessageBus {
    /// Map of event types to lists of subscribers
    channels: Arc<Mutex<HashMap<EventType, Vec<mpsc::Sender<Event>>>>>,
}

impl MessageBus {
    pub fn new() -> Self {
        Self {
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Subscribe to a specific event type, or `EventType::All`
    pub async fn subscribe(&self, event_type: EventType) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(CHANNEL_BUFFER_SIZE);
        let mut channels = self.channels.lock().await;
        channels.entry(event_type).or_default().push(tx);
        rx
    }

    /// Publish an event to its type's subscribers and to `All` subscribers.
    ///
    /// Closed subscribers are pruned.
    pub async fn publish(&self, event: Event) {
        let mut channels = self.channels.lock().await;
        let event_type = event.event_type();

        for key in [event_type, EventType::All] {
            if let Some(subscribers) = channels.get_mut(&key) {
                subscribers.retain(|tx| match tx.try_send(event.clone()) {
                    Ok(()) => true,
                    Err(mpsc::error::TrySendError::Full(_)) => {
                        tracing::debug!("Subscriber for {:?} is full, dropping event", key);
                        true
                    }
                    Err(mpsc::error::TrySendError::Closed(_)) => false,
                });
            }
        }
    }

    /// Number of live subscribers for an event type
    pub async fn subscriber_count(&self, event_type: EventType) -> usize {
        self.channels
            .lock()
            .await
            .get(&event_type)
            .map(|subs| subs.len())
            .unwrap_or(0)
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn started(session: &str) -> Event {
        Event::TurnStarted {
            session_id: session.to_string(),
            message: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn test_subscribe_and_publish() {
        let bus = MessageBus::new();
        let mut rx = bus.subscribe(EventType::TurnStarted).await;

        bus.publish(started("s1")).await;

        match rx.recv().await.unwrap() {
            Event::TurnStarted {
                session_id,
                message,
            } => {
                assert_eq!(session_id, "s1");
                assert_eq!(message, "hello");
            }
            _ => panic!("Wrong event type received"),
        }
    }

    #[tokio::test]
    async fn test_all_event_type() {
        let bus = MessageBus::new();
        let mut rx_all = bus.subscribe(EventType::All).await;
        let mut rx_specific = bus.subscribe(EventType::ApprovalRequested).await;

        let event = Event::ApprovalRequested {
            correlation_id: "corr-1".to_string(),
            session_id: "s1".to_string(),
            step_name: "linkedin_post".to_string(),
            tool: "linkedin.create_post".to_string(),
        };
        bus.publish(event.clone()).await;

        assert_eq!(rx_all.recv().await.unwrap(), event);
        assert_eq!(rx_specific.recv().await.unwrap(), event);
    }

    #[tokio::test]
    async fn test_different_event_types() {
        let bus = MessageBus::new();
        let mut rx_started = bus.subscribe(EventType::TurnStarted).await;
        let mut rx_completed = bus.subscribe(EventType::TurnCompleted).await;

        bus.publish(started("s1")).await;
        bus.publish(Event::TurnCompleted {
            session_id: "s2".to_string(),
            steps: 1,
        })
        .await;

        assert!(matches!(
            rx_started.recv().await.unwrap(),
            Event::TurnStarted { .. }
        ));
        assert!(matches!(
            rx_completed.recv().await.unwrap(),
            Event::TurnCompleted { steps: 1, .. }
        ));

        assert!(rx_started.try_recv().is_err());
        assert!(rx_completed.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_full_subscriber_does_not_block() {
        let bus = MessageBus::new();
        let mut rx = bus.subscribe(EventType::TurnStarted).await;

        for _ in 0..CHANNEL_BUFFER_SIZE + 10 {
            bus.publish(started("s1")).await;
        }

        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, CHANNEL_BUFFER_SIZE);
    }

    #[tokio::test]
    async fn test_closed_subscribers_are_pruned() {
        let bus = MessageBus::new();
        let rx = bus.subscribe(EventType::TurnFailed).await;
        assert_eq!(bus.subscriber_count(EventType::TurnFailed).await, 1);

        drop(rx);
        bus.publish(Event::TurnFailed {
            session_id: "s1".to_string(),
            error: "boom".to_string(),
        })
        .await;

        assert_eq!(bus.subscriber_count(EventType::TurnFailed).await, 0);
    }
}
