//! Per-node state tracking for the alert engine
//!
//! This crate provides the NodeStore, which remembers the last known
//! status of every node and the last observation of each of its values.
//! Entries are created lazily on first access; a missing entry always
//! means "never observed".

use dashmap::mapref::one::RefMut;
use dashmap::DashMap;
use std::collections::HashMap;
use tracing::{debug, instrument};
use zwa_core::{NodeId, NodeStatus};

/// Last observation of one value of a node
///
/// The inner `None` is the lazily created default: the value has an entry
/// but no reading has been stored in it yet.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueState {
    /// Boolean flag, e.g. battery `isLow`
    Flag(Option<bool>),
    /// Numeric reading, e.g. battery `level`
    Level(Option<f64>),
    /// Named state of an enumerated value, e.g. a notification channel
    Named(Option<String>),
}

impl ValueState {
    pub fn kind(&self) -> ValueKind {
        match self {
            ValueState::Flag(_) => ValueKind::Flag,
            ValueState::Level(_) => ValueKind::Level,
            ValueState::Named(_) => ValueKind::Named,
        }
    }
}

/// Shape of a [`ValueState`], chosen by the rule that tracks the value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Flag,
    Level,
    Named,
}

impl ValueKind {
    /// State of this shape with no reading stored yet
    pub fn empty(self) -> ValueState {
        match self {
            ValueKind::Flag => ValueState::Flag(None),
            ValueKind::Level => ValueState::Level(None),
            ValueKind::Named => ValueState::Named(None),
        }
    }
}

/// Everything remembered about one node
#[derive(Debug, Clone, Default)]
pub struct NodeState {
    pub status: NodeStatus,
    values: HashMap<String, ValueState>,
}

impl NodeState {
    /// Get the state of a value, creating an empty one of `kind` on first
    /// access
    ///
    /// An existing entry of a different shape (the value id was reused by
    /// a different property class) is replaced by an empty one.
    pub fn value_or_default(&mut self, value_id: &str, kind: ValueKind) -> &mut ValueState {
        let entry = self
            .values
            .entry(value_id.to_string())
            .or_insert_with(|| kind.empty());
        if entry.kind() != kind {
            *entry = kind.empty();
        }
        entry
    }

    pub fn value(&self, value_id: &str) -> Option<&ValueState> {
        self.values.get(value_id)
    }

    pub fn value_count(&self) -> usize {
        self.values.len()
    }
}

/// The node store tracks all nodes seen on the event stream
///
/// Access goes through per-entry guards, so a read-modify-write on one
/// node is atomic with respect to any other access to the same node.
pub struct NodeStore {
    nodes: DashMap<NodeId, NodeState>,
}

impl NodeStore {
    pub fn new() -> Self {
        Self {
            nodes: DashMap::new(),
        }
    }

    /// Get a node's state, creating it as `Unknown` with no values on
    /// first access
    ///
    /// The returned guard locks the node; do not hold it across an await.
    pub fn get_or_create(&self, node_id: NodeId) -> RefMut<'_, NodeId, NodeState> {
        self.nodes.entry(node_id).or_insert_with(|| {
            debug!(node_id, "Tracking new node");
            NodeState::default()
        })
    }

    /// Snapshot of a node's state, if it was ever seen
    pub fn get(&self, node_id: NodeId) -> Option<NodeState> {
        self.nodes.get(&node_id).map(|n| n.clone())
    }

    /// Last known status, or `Unknown` for nodes never seen
    pub fn status(&self, node_id: NodeId) -> NodeStatus {
        self.nodes
            .get(&node_id)
            .map(|n| n.status)
            .unwrap_or_default()
    }

    /// Drop all state of a removed node
    #[instrument(skip(self))]
    pub fn remove(&self, node_id: NodeId) -> Option<NodeState> {
        let removed = self.nodes.remove(&node_id).map(|(_, n)| n);
        if removed.is_some() {
            debug!("Removed node state");
        }
        removed
    }

    pub fn contains(&self, node_id: NodeId) -> bool {
        self.nodes.contains_key(&node_id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_or_create_starts_unknown() {
        let store = NodeStore::new();
        {
            let node = store.get_or_create(3);
            assert_eq!(node.status, NodeStatus::Unknown);
            assert_eq!(node.value_count(), 0);
        }
        assert!(store.contains(3));
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn test_status_persists_between_accesses() {
        let store = NodeStore::new();
        store.get_or_create(3).status = NodeStatus::Alive;

        assert_eq!(store.get_or_create(3).status, NodeStatus::Alive);
        assert_eq!(store.status(3), NodeStatus::Alive);
        assert_eq!(store.status(4), NodeStatus::Unknown);
        assert!(!store.contains(4));
    }

    #[test]
    fn test_value_lazily_created_with_default() {
        let mut node = NodeState::default();
        assert!(node.value("3-128-0-level").is_none());

        let state = node.value_or_default("3-128-0-level", ValueKind::Level);
        assert_eq!(*state, ValueState::Level(None));
        *state = ValueState::Level(Some(55.0));

        let state = node.value_or_default("3-128-0-level", ValueKind::Level);
        assert_eq!(*state, ValueState::Level(Some(55.0)));
    }

    #[test]
    fn test_value_of_other_kind_is_reset() {
        let mut node = NodeState::default();
        *node.value_or_default("v", ValueKind::Flag) = ValueState::Flag(Some(true));

        let state = node.value_or_default("v", ValueKind::Named);
        assert_eq!(*state, ValueState::Named(None));
    }

    #[test]
    fn test_remove_forgets_everything() {
        let store = NodeStore::new();
        {
            let mut node = store.get_or_create(8);
            node.status = NodeStatus::Dead;
            *node.value_or_default("8-128-0-isLow", ValueKind::Flag) = ValueState::Flag(Some(true));
        }

        let removed = store.remove(8).unwrap();
        assert_eq!(removed.status, NodeStatus::Dead);
        assert!(store.remove(8).is_none());

        store.get_or_create(8);
        let node = store.get(8).unwrap();
        assert_eq!(node.status, NodeStatus::Unknown);
        assert!(node.value("8-128-0-isLow").is_none());
        assert_eq!(node.value_count(), 0);
    }
}
