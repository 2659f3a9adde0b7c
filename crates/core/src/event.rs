//! Domain events: an observable trace of the orchestrator state machine.
//!
//! Sessions publish an event at each transition of a turn. Observers
//! (loggers, UIs, tests) subscribe and filter for what they care about;
//! publishing never blocks and never fails the turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A user turn entered the loop
    TurnStarted {
        session_id: String,
        history_len: usize,
        timestamp: DateTime<Utc>,
    },

    /// The system prompt was regenerated for this turn
    PromptAssembled {
        session_id: String,
        providers: usize,
        prompt_bytes: usize,
        timestamp: DateTime<Utc>,
    },

    /// The reasoning step produced a valid plan
    ReasoningCompleted {
        session_id: String,
        steps: usize,
        timestamp: DateTime<Utc>,
    },

    /// The main response matched a union member
    ResponseValidated {
        session_id: String,
        shape: String,
        timestamp: DateTime<Utc>,
    },

    /// A tool was executed on the caller's behalf
    ToolExecuted {
        tool_name: String,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// The turn's records were appended to memory
    TurnCommitted {
        session_id: String,
        appended: usize,
        timestamp: DateTime<Utc>,
    },

    /// The turn failed; memory was left unchanged
    TurnAborted {
        session_id: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
pub struct EventBus {
    sender: broadcast::Sender<Arc<DomainEvent>>,
}

impl EventBus {
    /// Create a new event bus with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all subscribers.
    pub fn publish(&self, event: DomainEvent) {
        // No subscribers is fine.
        let _ = self.sender.send(Arc::new(event));
    }

    /// Subscribe to receive events.
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<DomainEvent>> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn event_bus_publish_subscribe() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();

        bus.publish(DomainEvent::ResponseValidated {
            session_id: "s1".into(),
            shape: "reply".into(),
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::ResponseValidated { shape, .. } => assert_eq!(shape, "reply"),
            _ => panic!("Expected ResponseValidated event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::TurnAborted {
            session_id: "s1".into(),
            reason: "no subscribers".into(),
            timestamp: Utc::now(),
        });
    }
}
