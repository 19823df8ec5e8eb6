//! Node directory
//!
//! Display metadata (name, location) is owned by the controller. The
//! engine asks the directory every time it builds an alert, so renames
//! show up in the very next message.

use dashmap::DashMap;
use tracing::debug;
use zwa_core::{NodeId, NodeInfo};

/// Lookup of current node display metadata
pub trait NodeDirectory: Send + Sync {
    fn node_info(&self, node_id: NodeId) -> Option<NodeInfo>;
}

/// Directory fed by the controller connection
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: DashMap<NodeId, NodeInfo>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the metadata of a node
    pub fn upsert(&self, node_id: NodeId, info: NodeInfo) {
        debug!(node_id, name = ?info.name, location = ?info.location, "Node metadata updated");
        self.nodes.insert(node_id, info);
    }

    pub fn remove(&self, node_id: NodeId) -> Option<NodeInfo> {
        self.nodes.remove(&node_id).map(|(_, info)| info)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl NodeDirectory for NodeRegistry {
    fn node_info(&self, node_id: NodeId) -> Option<NodeInfo> {
        self.nodes.get(&node_id).map(|n| n.clone())
    }
}
