//! Events flowing in and out of an agent.
//!
//! [`AgentEvent`]s come from the world (damage, death, wake-up) and are fed
//! to the agent's handlers by its runtime. [`DomainEvent`]s are published by
//! the agent for in-process observers such as the CLI status view.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::geometry::Position;
use crate::task::TaskKind;
use crate::team::TeamMessage;
use crate::world::EntityId;

/// Something happened to the agent in the world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEvent {
    Spawned,
    /// Health went down. `attacker` when the world knows who did it.
    Damaged { attacker: Option<EntityId> },
    Died { position: Position },
    Respawned,
    FellAsleep,
    Woke,
    ItemCollected,
    Team(TeamMessage),
}

/// All domain events published by agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// The executor started a task
    TaskStarted {
        agent: String,
        task: TaskKind,
        timestamp: DateTime<Utc>,
    },

    /// The executor finished a task, successfully or not
    TaskFinished {
        agent: String,
        task: TaskKind,
        success: bool,
        duration_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// A decision module passed both gates and ran its action
    ModuleFired {
        agent: String,
        module: String,
        timestamp: DateTime<Utc>,
    },

    /// A navigation attempt ended
    NavigationEnded {
        agent: String,
        reached: bool,
        elapsed_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// An error was caught and swallowed
    ErrorOccurred {
        agent: String,
        context: String,
        error_message: String,
        timestamp: DateTime<Utc>,
    },
}

/// A broadcast-based event bus for domain events.
///
/// Uses `tokio::sync::broadcast` for multi-consumer pub/sub.
/// Subscribers receive every event and filter for what they care about.
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
        // No subscribers is fine
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

        bus.publish(DomainEvent::ModuleFired {
            agent: "ward".into(),
            module: "go home".into(),
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::ModuleFired { agent, module, .. } => {
                assert_eq!(agent, "ward");
                assert_eq!(module, "go home");
            }
            _ => panic!("Expected ModuleFired event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::ErrorOccurred {
            agent: "ward".into(),
            context: "test".into(),
            error_message: "no subscribers".into(),
            timestamp: Utc::now(),
        });
    }

    #[test]
    fn agent_event_tagged_by_type() {
        let event = AgentEvent::Died {
            position: Position::new(1.0, 2.0, 3.0),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "died");
    }
}
