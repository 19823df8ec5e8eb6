//! Event bus for controller events
//!
//! The controller connection publishes value, removal and status events
//! here; the alert engine subscribes. Publishing never waits for
//! subscribers: a slow subscriber lags and is told how many events it
//! missed.

use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{trace, warn};
use zwa_core::{Event, EventData};

/// Events buffered per subscriber before it starts lagging
pub const DEFAULT_CAPACITY: usize = 1024;

/// Broadcast bus carrying every event type on one channel
///
/// Each subscriber sees every event in publication order and picks the
/// payloads it understands.
pub struct EventBus {
    tx: broadcast::Sender<Event<Value>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            tx: broadcast::channel(capacity).0,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Event<Value>> {
        trace!("New subscriber");
        self.tx.subscribe()
    }

    /// Publish an event and return how many subscribers it reached
    pub fn publish(&self, event: Event<Value>) -> usize {
        trace!(event_type = %event.event_type, "Publishing event");

        // Sending fails only when nobody listens; that counts as zero
        self.tx.send(event).unwrap_or(0)
    }

    pub fn publish_typed<T: EventData>(&self, data: &T) -> usize {
        match Event::encode(data) {
            Ok(event) => self.publish(event),
            Err(e) => {
                warn!(event_type = T::EVENT_TYPE, error = %e, "Dropping unencodable event");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::sync::broadcast::error::RecvError;
    use zwa_core::events::{NodeRemovedData, NodeStatusData, NODE_REMOVED, NODE_STATUS};
    use zwa_core::{NodeInfo, NodeStatus};

    #[tokio::test]
    async fn test_subscribe_and_publish() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        let reached = bus.publish(Event::new(NODE_REMOVED, json!({"node_id": 9})));
        assert_eq!(reached, 1);

        let received = rx.recv().await.unwrap();
        assert_eq!(received.event_type.as_str(), NODE_REMOVED);
        assert_eq!(received.data["node_id"], 9);
    }

    #[tokio::test]
    async fn test_order_is_kept_across_types() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.publish_typed(&NodeStatusData {
            node_id: 2,
            status: NodeStatus::Dead,
            node: NodeInfo::new("Thermostat", "Bedroom"),
        });
        bus.publish_typed(&NodeRemovedData { node_id: 2 });

        let first = rx.recv().await.unwrap();
        assert_eq!(first.event_type.as_str(), NODE_STATUS);
        let status = first.decode::<NodeStatusData>().unwrap();
        assert_eq!(status.data.node.location.as_deref(), Some("Bedroom"));
        assert_eq!(rx.recv().await.unwrap().event_type.as_str(), NODE_REMOVED);
    }

    #[tokio::test]
    async fn test_every_subscriber_sees_every_event() {
        let bus = EventBus::new();
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        assert_eq!(bus.publish_typed(&NodeRemovedData { node_id: 5 }), 2);
        assert_eq!(a.recv().await.unwrap().data["node_id"], 5);
        assert_eq!(b.recv().await.unwrap().data["node_id"], 5);
    }

    #[tokio::test]
    async fn test_slow_subscriber_lags() {
        let bus = EventBus::with_capacity(2);
        let mut rx = bus.subscribe();

        for node_id in 0..4 {
            bus.publish_typed(&NodeRemovedData { node_id });
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(2))));
        assert_eq!(rx.recv().await.unwrap().data["node_id"], 2);
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        assert_eq!(bus.publish(Event::new(NODE_REMOVED, json!({"node_id": 1}))), 0);
    }
}
