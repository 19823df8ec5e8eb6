//! Node identity, status and display metadata

use serde::{Deserialize, Serialize};

/// Node identifier assigned by the mesh controller
pub type NodeId = u32;

/// Reachability status of a mesh node
///
/// Serialized with the controller's own spelling (`"Dead"`, `"Alive"`, ...).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    #[default]
    Unknown,
    Asleep,
    Awake,
    Dead,
    Alive,
}

impl NodeStatus {
    /// Map the numeric status used by zwave-js (`NodeStatus` enum) to ours
    pub fn from_code(code: u64) -> Self {
        match code {
            1 => NodeStatus::Asleep,
            2 => NodeStatus::Awake,
            3 => NodeStatus::Dead,
            4 => NodeStatus::Alive,
            _ => NodeStatus::Unknown,
        }
    }

    pub fn is_dead(&self) -> bool {
        matches!(self, NodeStatus::Dead)
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::Unknown => write!(f, "Unknown"),
            NodeStatus::Asleep => write!(f, "Asleep"),
            NodeStatus::Awake => write!(f, "Awake"),
            NodeStatus::Dead => write!(f, "Dead"),
            NodeStatus::Alive => write!(f, "Alive"),
        }
    }
}

/// Display metadata for a node
///
/// Both fields may be missing when the node was never named in the
/// controller; formatting omits what is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl NodeInfo {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            location: Some(location.into()),
        }
    }

    /// Fill any missing field from `other`
    pub fn or(self, other: NodeInfo) -> Self {
        Self {
            name: self.name.or(other.name),
            location: self.location.or(other.location),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.location.is_none()
    }
}
