//! Core types for zwave-alert
//!
//! This crate provides the fundamental types shared by the event source,
//! the alert engine and the notifier: node identity and status, value
//! change payloads, events, and the alerts derived from them.

mod alert;
mod event;
mod node;
mod value;

pub use alert::{Alert, AlertSubject, Severity, ValueAlert};
pub use event::{Event, EventData, EventType};
pub use node::{NodeId, NodeInfo, NodeStatus};
pub use value::{
    ValueChangedData, ValuePath, ValueStateName, COMMAND_CLASS_BATTERY,
    COMMAND_CLASS_NOTIFICATION,
};

/// Event types published by the controller connection
pub mod events {
    use super::*;

    /// A node value changed
    pub const VALUE_CHANGED: &str = "zwave.value_changed";

    /// A node was removed from the network
    pub const NODE_REMOVED: &str = "zwave.node_removed";

    /// A node's reachability status changed
    pub const NODE_STATUS: &str = "zwave.node_status";

    impl EventData for ValueChangedData {
        const EVENT_TYPE: &'static str = VALUE_CHANGED;
    }

    /// Data for NODE_REMOVED events
    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    pub struct NodeRemovedData {
        pub node_id: NodeId,
    }

    impl EventData for NodeRemovedData {
        const EVENT_TYPE: &'static str = NODE_REMOVED;
    }

    /// Data for NODE_STATUS events
    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    pub struct NodeStatusData {
        pub node_id: NodeId,
        pub status: NodeStatus,
        #[serde(default)]
        pub node: NodeInfo,
    }

    impl EventData for NodeStatusData {
        const EVENT_TYPE: &'static str = NODE_STATUS;
    }

    /// Any event the alert engine reacts to
    #[derive(Debug, Clone, PartialEq)]
    pub enum NodeEvent {
        ValueChanged(ValueChangedData),
        Removed(NodeRemovedData),
        Status(NodeStatusData),
    }

    impl NodeEvent {
        /// Decode a bus event
        ///
        /// Returns `None` for unrelated event types and for payloads that
        /// do not match the expected shape.
        pub fn from_event(event: &Event<serde_json::Value>) -> Option<Self> {
            match event.event_type.as_str() {
                VALUE_CHANGED => event.decode::<ValueChangedData>().map(|e| NodeEvent::ValueChanged(e.data)),
                NODE_REMOVED => event.decode::<NodeRemovedData>().map(|e| NodeEvent::Removed(e.data)),
                NODE_STATUS => event.decode::<NodeStatusData>().map(|e| NodeEvent::Status(e.data)),
                _ => None,
            }
        }

        pub fn node_id(&self) -> NodeId {
            match self {
                NodeEvent::ValueChanged(v) => v.node_id,
                NodeEvent::Removed(r) => r.node_id,
                NodeEvent::Status(s) => s.node_id,
            }
        }
    }

    impl From<ValueChangedData> for NodeEvent {
        fn from(data: ValueChangedData) -> Self {
            NodeEvent::ValueChanged(data)
        }
    }

    impl From<NodeRemovedData> for NodeEvent {
        fn from(data: NodeRemovedData) -> Self {
            NodeEvent::Removed(data)
        }
    }

    impl From<NodeStatusData> for NodeEvent {
        fn from(data: NodeStatusData) -> Self {
            NodeEvent::Status(data)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use serde_json::json;

        #[test]
        fn test_decode_status_event() {
            let event = Event::new(
                NODE_STATUS,
                json!({"node_id": 5, "status": "Dead", "node": {"name": "Siren"}}),
            );
            let decoded = NodeEvent::from_event(&event).unwrap();

            assert_eq!(decoded.node_id(), 5);
            match decoded {
                NodeEvent::Status(s) => {
                    assert_eq!(s.status, NodeStatus::Dead);
                    assert_eq!(s.node.name.as_deref(), Some("Siren"));
                    assert!(s.node.location.is_none());
                }
                other => panic!("Expected status event, got {:?}", other),
            }
        }

        #[test]
        fn test_decode_ignores_foreign_and_malformed() {
            let foreign = Event::new("something_else", json!({"node_id": 1}));
            assert!(NodeEvent::from_event(&foreign).is_none());

            let malformed = Event::new(NODE_REMOVED, json!({"id": "x"}));
            assert!(NodeEvent::from_event(&malformed).is_none());
        }
    }
}
