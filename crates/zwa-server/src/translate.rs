//! zwave-js-server message translation
//!
//! Wire types for the parts of the zwave-js-server protocol the service
//! uses, and the [`Translator`] that turns node events into bus events.
//! Value metadata (readability, state tables) is only sent once per value,
//! so the translator caches it per node.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, trace};
use zwa_core::events::{NodeEvent, NodeRemovedData, NodeStatusData};
use zwa_core::{NodeId, NodeInfo, NodeStatus, ValueChangedData, ValueStateName};
use zwa_engine::{NodeDirectory, NodeRegistry};

/// Message id used for the `start_listening` command
pub const START_LISTENING_ID: &str = "start-listening";

/// Top-level message sent by the server
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ServerMessage {
    #[serde(rename_all = "camelCase")]
    Version {
        #[serde(default)]
        driver_version: String,
        #[serde(default)]
        server_version: String,
    },
    #[serde(rename_all = "camelCase")]
    Result {
        message_id: String,
        success: bool,
        #[serde(default)]
        result: Option<Value>,
        #[serde(default)]
        error_code: Option<String>,
    },
    Event {
        event: WireEvent,
    },
    #[serde(other)]
    Unknown,
}

/// An event forwarded from the driver
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireEvent {
    pub source: String,
    pub event: String,
    #[serde(default)]
    pub node_id: Option<NodeId>,
    /// Shape depends on the event; decoded on demand
    #[serde(default)]
    pub args: Option<Value>,
    #[serde(default)]
    pub node: Option<Value>,
}

impl WireEvent {
    fn value_args(&self) -> Option<WireValue> {
        serde_json::from_value(self.args.clone()?).ok()
    }

    fn wire_node(&self) -> Option<WireNode> {
        serde_json::from_value(self.node.clone()?).ok()
    }
}

/// Node as found in the listening state and controller events
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireNode {
    pub node_id: NodeId,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub status: Option<u64>,
    #[serde(default)]
    pub values: Vec<WireValue>,
}

impl WireNode {
    fn info(&self) -> NodeInfo {
        NodeInfo {
            name: non_empty(&self.name),
            location: non_empty(&self.location),
        }
    }
}

/// A value, either from the listening state or from a value event's args
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireValue {
    pub command_class: u16,
    #[serde(default)]
    pub command_class_name: String,
    #[serde(default)]
    pub endpoint: u16,
    pub property: Value,
    #[serde(default)]
    pub property_name: Option<String>,
    #[serde(default)]
    pub property_key: Option<Value>,
    #[serde(default)]
    pub property_key_name: Option<String>,
    #[serde(default)]
    pub new_value: Option<Value>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub metadata: Option<WireMetadata>,
}

impl WireValue {
    fn value_id(&self, node_id: NodeId) -> String {
        let property_key = self.property_key.as_ref().map(scalar_string);
        ValueChangedData::make_value_id(
            node_id,
            self.command_class,
            self.endpoint,
            &scalar_string(&self.property),
            property_key.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMetadata {
    #[serde(default = "default_readable")]
    pub readable: bool,
    /// Raw value (as a JSON object key) to state label
    #[serde(default)]
    pub states: BTreeMap<String, String>,
}

impl Default for WireMetadata {
    fn default() -> Self {
        Self {
            readable: default_readable(),
            states: BTreeMap::new(),
        }
    }
}

fn default_readable() -> bool {
    true
}

/// Render a property or property key the way value ids spell it
fn scalar_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn non_empty(s: &Option<String>) -> Option<String> {
    s.as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Turns zwave-js-server events into node events
pub struct Translator {
    registry: Arc<NodeRegistry>,
    metadata: HashMap<NodeId, HashMap<String, WireMetadata>>,
}

impl Translator {
    pub fn new(registry: Arc<NodeRegistry>) -> Self {
        Self {
            registry,
            metadata: HashMap::new(),
        }
    }

    /// Load nodes and value metadata from a `start_listening` result
    ///
    /// Returns a status event per node that reported its status, so the
    /// engine starts from the controller's view.
    pub fn seed(&mut self, result: &Value) -> Vec<NodeEvent> {
        let nodes = result
            .pointer("/state/nodes")
            .cloned()
            .and_then(|nodes| serde_json::from_value::<Vec<WireNode>>(nodes).ok())
            .unwrap_or_default();

        let mut events = Vec::with_capacity(nodes.len());
        for node in &nodes {
            self.add_node(node);
            if let Some(code) = node.status {
                events.push(NodeEvent::Status(NodeStatusData {
                    node_id: node.node_id,
                    status: NodeStatus::from_code(code),
                    node: node.info(),
                }));
            }
        }
        debug!(nodes = nodes.len(), "Seeded node directory");
        events
    }

    /// Translate one driver event, updating the caches
    pub fn translate(&mut self, event: &WireEvent) -> Option<NodeEvent> {
        match (event.source.as_str(), event.event.as_str()) {
            ("node", "value updated" | "value added" | "value notification") => {
                let node_id = event.node_id?;
                let args = event.value_args()?;
                Some(NodeEvent::ValueChanged(self.value_changed(node_id, &args)))
            }
            ("node", "metadata updated") => {
                let node_id = event.node_id?;
                let args = event.value_args()?;
                if let Some(metadata) = &args.metadata {
                    self.remember(node_id, args.value_id(node_id), metadata.clone());
                }
                None
            }
            ("node", "dead") => self.status(event, NodeStatus::Dead),
            ("node", "alive") => self.status(event, NodeStatus::Alive),
            ("node", "sleep") => self.status(event, NodeStatus::Asleep),
            ("node", "wake up") => self.status(event, NodeStatus::Awake),
            ("controller", "node added") => {
                self.add_node(&event.wire_node()?);
                None
            }
            ("controller", "node removed") => {
                let node_id = event.wire_node().map(|n| n.node_id).or(event.node_id)?;
                self.registry.remove(node_id);
                self.metadata.remove(&node_id);
                Some(NodeEvent::Removed(NodeRemovedData { node_id }))
            }
            (source, name) => {
                trace!(source, event = name, "Ignoring driver event");
                None
            }
        }
    }

    fn add_node(&mut self, node: &WireNode) {
        self.registry.upsert(node.node_id, node.info());
        for value in &node.values {
            if let Some(metadata) = &value.metadata {
                self.remember(node.node_id, value.value_id(node.node_id), metadata.clone());
            }
        }
    }

    fn remember(&mut self, node_id: NodeId, value_id: String, metadata: WireMetadata) {
        self.metadata
            .entry(node_id)
            .or_default()
            .insert(value_id, metadata);
    }

    fn status(&self, event: &WireEvent, status: NodeStatus) -> Option<NodeEvent> {
        let node_id = event.node_id?;
        Some(NodeEvent::Status(NodeStatusData {
            node_id,
            status,
            node: self.registry.node_info(node_id).unwrap_or_default(),
        }))
    }

    fn value_changed(&mut self, node_id: NodeId, args: &WireValue) -> ValueChangedData {
        let value_id = args.value_id(node_id);
        if let Some(metadata) = &args.metadata {
            self.remember(node_id, value_id.clone(), metadata.clone());
        }

        let metadata = self
            .metadata
            .get(&node_id)
            .and_then(|values| values.get(&value_id))
            .cloned()
            .unwrap_or_default();

        let states: Vec<ValueStateName> = metadata
            .states
            .iter()
            .filter_map(|(raw, text)| {
                raw.parse().ok().map(|value| ValueStateName {
                    value,
                    text: text.clone(),
                })
            })
            .collect();

        let property = scalar_string(&args.property);
        ValueChangedData {
            node_id,
            value_id,
            command_class: args.command_class,
            command_class_name: args.command_class_name.clone(),
            endpoint: args.endpoint,
            property_name: args.property_name.clone().unwrap_or_else(|| property.clone()),
            property,
            property_key_name: args.property_key_name.clone(),
            value: args.new_value.clone().or_else(|| args.value.clone()),
            readable: metadata.readable,
            list: !states.is_empty(),
            states,
            node: self.registry.node_info(node_id).unwrap_or_default(),
        }
    }
}
