//! Domain event publishing.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use domain::{ORDER_EVENT_TOPIC, Order, OrderAction, OrderEvent};

use super::lock;
use crate::error::{CommitError, Result};

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, topic: &str, event: &OrderEvent) -> Result<()>;
}

/// Builds the event for `action` from the stored order and publishes it.
///
/// Publishing never fails the caller; errors are logged.
pub async fn publish_order_event(
    publisher: &dyn EventPublisher,
    order: &Order,
    action: OrderAction,
    actor: &str,
) {
    let event = OrderEvent::new(order, action, actor);
    if let Err(error) = publisher.publish(ORDER_EVENT_TOPIC, &event).await {
        tracing::warn!(order_id = %order.id, %action, %error, "failed to publish order event");
    }
}

/// Writes every event to the log as JSON.
///
/// Used by the binary until a broker-backed publisher is wired in.
#[derive(Debug, Clone, Default)]
pub struct TracingPublisher;

#[async_trait]
impl EventPublisher for TracingPublisher {
    async fn publish(&self, topic: &str, event: &OrderEvent) -> Result<()> {
        let payload = serde_json::to_string(event)
            .map_err(|e| CommitError::gateway("publisher", e.to_string()))?;
        tracing::info!(
            topic,
            order_id = %event.subject,
            action = %event.action,
            payload = %payload,
            "order event published"
        );
        Ok(())
    }
}

#[derive(Debug, Default)]
struct PublisherState {
    events: Vec<(String, OrderEvent)>,
    fail: bool,
}

/// In-memory publisher for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPublisher {
    state: Arc<Mutex<PublisherState>>,
}

impl InMemoryPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        lock(&self.state).fail = fail;
    }

    /// Published events with their topics, in publish order.
    pub fn events(&self) -> Vec<(String, OrderEvent)> {
        lock(&self.state).events.clone()
    }

    pub fn event_count(&self) -> usize {
        lock(&self.state).events.len()
    }
}

#[async_trait]
impl EventPublisher for InMemoryPublisher {
    async fn publish(&self, topic: &str, event: &OrderEvent) -> Result<()> {
        let mut state = lock(&self.state);
        if state.fail {
            return Err(CommitError::gateway("publisher", "broker unavailable"));
        }
        state.events.push((topic.to_string(), event.clone()));
        Ok(())
    }
}
