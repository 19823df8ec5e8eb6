//! Alerts produced by the classifier
//!
//! An alert says *what* happened and how severe it is. Turning it into text
//! is left to the notifier.

use serde::{Deserialize, Serialize};

use crate::node::{NodeId, NodeInfo, NodeStatus};
use crate::value::ValuePath;

/// Alert severity; governs presentation, not routing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// What a value alert reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValueAlert {
    /// Battery low flag toggled
    BatteryLow { is_low: bool },
    /// Battery level reading, in percent
    BatteryLevel { level: f64 },
    /// Notification value entered a named state
    Notification { state: String },
}

/// What an alert is about
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "subject", rename_all = "snake_case")]
pub enum AlertSubject {
    Status { old: NodeStatus, new: NodeStatus },
    Value { path: ValuePath, alert: ValueAlert },
}

/// A notification-worthy transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub node_id: NodeId,
    pub node: NodeInfo,
    pub severity: Severity,
    #[serde(flatten)]
    pub subject: AlertSubject,
}

impl Alert {
    pub fn status(node_id: NodeId, node: NodeInfo, old: NodeStatus, new: NodeStatus) -> Self {
        let severity = if new.is_dead() {
            Severity::Critical
        } else {
            Severity::Info
        };
        Self {
            node_id,
            node,
            severity,
            subject: AlertSubject::Status { old, new },
        }
    }

    pub fn value(
        node_id: NodeId,
        node: NodeInfo,
        severity: Severity,
        path: ValuePath,
        alert: ValueAlert,
    ) -> Self {
        Self {
            node_id,
            node,
            severity,
            subject: AlertSubject::Value { path, alert },
        }
    }
}
