//! Lifecycle event publishing.
//!
//! Fire-and-forget broadcast channel carrying named lifecycle events (node
//! completed, root completed, viable nodes discovered). Consumers subscribe
//! for observability; the engine never blocks on, or fails because of, event
//! delivery.

use serde_json::Value;
use tokio::sync::broadcast;

/// High-throughput event publisher for lifecycle events
#[derive(Debug, Clone)]
pub struct EventPublisher {
    sender: broadcast::Sender<PublishedEvent>,
}

/// Event that has been published
#[derive(Debug, Clone)]
pub struct PublishedEvent {
    pub name: String,
    pub context: Value,
    pub published_at: chrono::DateTime<chrono::Utc>,
}

impl EventPublisher {
    /// Create a new event publisher with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event with the given name and context.
    ///
    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, event_name: impl Into<String>, context: Value) {
        let event = PublishedEvent {
            name: event_name.into(),
            context,
            published_at: chrono::Utc::now(),
        };

        // send() errors only when there are no subscribers
        let _ = self.sender.send(event);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<PublishedEvent> {
        self.sender.subscribe()
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::events;
    use serde_json::json;

    #[tokio::test]
    async fn test_publish_and_receive() {
        let publisher = EventPublisher::new(16);
        let mut rx = publisher.subscribe();

        publisher.publish(events::NODE_COMPLETED, json!({"node_id": "abc"}));

        let event = rx.recv().await.unwrap();
        assert_eq!(event.name, events::NODE_COMPLETED);
        assert_eq!(event.context["node_id"], "abc");
    }

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let publisher = EventPublisher::new(16);
        publisher.publish(events::NO_VIABLE_NODES, json!({}));
        assert_eq!(publisher.subscriber_count(), 0);
    }
}
