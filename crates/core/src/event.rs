//! Domain event system — decoupled observation of game lifecycle.
//!
//! Events are published when a round changes state. Other components
//! (audit logs, dashboards, tests) can subscribe without coupling to the
//! engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;

use crate::channel::{ChannelId, UserId};

/// All domain events in the system.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum DomainEvent {
    /// A round began or was resumed
    RoundStarted {
        channel: ChannelId,
        round: u32,
        total_rounds: u32,
        resumed: bool,
        timestamp: DateTime<Utc>,
    },

    /// A guess beat the round's previous best
    GuessImproved {
        channel: ChannelId,
        user: UserId,
        offset: u64,
        timestamp: DateTime<Utc>,
    },

    /// A round ended, by exact match or timeout
    RoundFinalized {
        channel: ChannelId,
        round: u32,
        total_rounds: u32,
        winner: Option<UserId>,
        offset: Option<u64>,
        timestamp: DateTime<Utc>,
    },

    /// The winner's reward could not be delivered
    RewardDeliveryFailed {
        channel: ChannelId,
        user: UserId,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    /// The last round finished and the game reset
    GameCompleted {
        channel: ChannelId,
        rounds_played: u32,
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

        bus.publish(DomainEvent::GuessImproved {
            channel: ChannelId::new("c1"),
            user: UserId::new("alice"),
            offset: 4,
            timestamp: Utc::now(),
        });

        let event = rx.recv().await.unwrap();
        match event.as_ref() {
            DomainEvent::GuessImproved { user, offset, .. } => {
                assert_eq!(user.as_str(), "alice");
                assert_eq!(*offset, 4);
            }
            _ => panic!("Expected GuessImproved event"),
        }
    }

    #[test]
    fn event_bus_no_subscribers_doesnt_panic() {
        let bus = EventBus::new(16);
        bus.publish(DomainEvent::GameCompleted {
            channel: ChannelId::new("c1"),
            rounds_played: 3,
            timestamp: Utc::now(),
        });
    }
}
