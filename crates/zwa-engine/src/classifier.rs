//! Event classification
//!
//! The classifier turns node events into at most one alert each, keeping
//! the per-node state it needs to tell a transition from a repeat.

use std::sync::Arc;

use tracing::{debug, info, instrument, trace};
use zwa_core::events::{NodeEvent, NodeRemovedData, NodeStatusData};
use zwa_core::{Alert, NodeId, NodeInfo, ValueChangedData};
use zwa_state_store::NodeStore;

use crate::directory::NodeDirectory;
use crate::rules::{default_rules, AlertPolicy, RuleContext, ValueRule};
use crate::suppression::SuppressionTracker;

/// Decides which node events are worth a notification
///
/// The classifier exclusively owns the node store and the suppression
/// windows. Each event's read-modify-write of a node happens under that
/// node's store lock.
pub struct Classifier {
    nodes: NodeStore,
    windows: SuppressionTracker,
    directory: Arc<dyn NodeDirectory>,
    rules: Vec<Box<dyn ValueRule>>,
    policy: AlertPolicy,
}

impl Classifier {
    /// Create a classifier with the default rules
    pub fn new(directory: Arc<dyn NodeDirectory>, policy: AlertPolicy) -> Self {
        Self::with_rules(directory, policy, default_rules())
    }

    /// Create a classifier with a custom rule set
    ///
    /// For each value event the first rule that applies is used.
    pub fn with_rules(
        directory: Arc<dyn NodeDirectory>,
        policy: AlertPolicy,
        rules: Vec<Box<dyn ValueRule>>,
    ) -> Self {
        Self {
            nodes: NodeStore::new(),
            windows: SuppressionTracker::new(policy.suppression_window),
            directory,
            rules,
            policy,
        }
    }

    /// Classify one event, updating the tracked state
    ///
    /// Value events must be classified from within a tokio runtime, since
    /// sending a notification alert starts a suppression timer.
    pub fn classify(&self, event: &NodeEvent) -> Option<Alert> {
        match event {
            NodeEvent::Status(data) => self.on_status(data),
            NodeEvent::Removed(data) => {
                self.on_removed(data);
                None
            }
            NodeEvent::ValueChanged(data) => self.on_value_changed(data),
        }
    }

    pub fn nodes(&self) -> &NodeStore {
        &self.nodes
    }

    pub fn windows(&self) -> &SuppressionTracker {
        &self.windows
    }

    /// Current display metadata, falling back to what the event carried
    fn node_info(&self, node_id: NodeId, carried: &NodeInfo) -> NodeInfo {
        self.directory
            .node_info(node_id)
            .unwrap_or_default()
            .or(carried.clone())
    }

    fn on_status(&self, data: &NodeStatusData) -> Option<Alert> {
        let old = {
            let mut node = self.nodes.get_or_create(data.node_id);
            std::mem::replace(&mut node.status, data.status)
        };
        let new = data.status;
        let info = self.node_info(data.node_id, &data.node);

        info!(
            "Node {} ({} - {}) status: {} -> {}",
            data.node_id,
            info.name.as_deref().unwrap_or("?"),
            info.location.as_deref().unwrap_or("?"),
            old,
            new
        );

        if old == new || !(old.is_dead() || new.is_dead()) {
            return None;
        }
        Some(Alert::status(data.node_id, info, old, new))
    }

    #[instrument(skip(self, data), fields(node_id = data.node_id))]
    fn on_removed(&self, data: &NodeRemovedData) {
        if self.nodes.remove(data.node_id).is_some() {
            debug!("Forgot removed node");
        }
    }

    fn on_value_changed(&self, value: &ValueChangedData) -> Option<Alert> {
        let Some(rule) = self.rules.iter().find(|r| r.applies_to(value)) else {
            trace!(
                node_id = value.node_id,
                command_class = value.command_class,
                property = %value.property,
                "No rule for value"
            );
            return None;
        };

        let info = self.node_info(value.node_id, &value.node);
        let finding = {
            let mut node = self.nodes.get_or_create(value.node_id);
            let state = node.value_or_default(&value.value_id, rule.kind());
            let ctx = RuleContext {
                node: &info,
                windows: &self.windows,
                policy: &self.policy,
            };
            rule.evaluate(value, state, &ctx)
        }?;

        debug!(
            node_id = value.node_id,
            rule = rule.name(),
            severity = %finding.severity,
            "Value alert"
        );
        Some(Alert::value(
            value.node_id,
            info,
            finding.severity,
            value.path(),
            finding.alert,
        ))
    }
}
