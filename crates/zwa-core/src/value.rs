//! Value-changed payloads and the property path used to describe them

use serde::{Deserialize, Serialize};

use crate::node::{NodeId, NodeInfo};

/// Battery command class
pub const COMMAND_CLASS_BATTERY: u16 = 0x80;

/// Notification command class
pub const COMMAND_CLASS_NOTIFICATION: u16 = 0x71;

/// One entry of an enumerated value's state table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueStateName {
    pub value: i64,
    pub text: String,
}

/// Where a value lives on a node, as shown to the user
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuePath {
    pub command_class_name: String,
    pub endpoint: u16,
    pub property_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_key_name: Option<String>,
}

/// A value reported by a node changed (or was re-reported)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValueChangedData {
    pub node_id: NodeId,

    /// Stable identity of the value within its node
    pub value_id: String,

    pub command_class: u16,

    #[serde(default)]
    pub command_class_name: String,

    #[serde(default)]
    pub endpoint: u16,

    /// Raw property as reported (`"isLow"`, `"level"`, `"Access Control"`, ...)
    pub property: String,

    #[serde(default)]
    pub property_name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_key_name: Option<String>,

    /// New raw value; absent when the controller cleared it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,

    /// Value is human-readable (metadata `readable`)
    #[serde(default)]
    pub readable: bool,

    /// Value carries a finite set of named states
    #[serde(default)]
    pub list: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub states: Vec<ValueStateName>,

    /// Node display metadata known to the event source
    #[serde(default)]
    pub node: NodeInfo,
}

impl ValueChangedData {
    /// Build the zwave-js style identity `node-cc-endpoint-property[-key]`
    pub fn make_value_id(
        node_id: NodeId,
        command_class: u16,
        endpoint: u16,
        property: &str,
        property_key: Option<&str>,
    ) -> String {
        match property_key {
            Some(key) => format!("{node_id}-{command_class}-{endpoint}-{property}-{key}"),
            None => format!("{node_id}-{command_class}-{endpoint}-{property}"),
        }
    }

    /// Display path of this value
    pub fn path(&self) -> ValuePath {
        ValuePath {
            command_class_name: self.command_class_name.clone(),
            endpoint: self.endpoint,
            property_name: self.property_name.clone(),
            property_key_name: self.property_key_name.clone(),
        }
    }

    /// Resolve the raw value through the state table
    ///
    /// Returns `None` when the value is absent, not an integer, or has no
    /// entry in the table.
    pub fn state_name(&self) -> Option<&str> {
        let raw = self.value.as_ref()?.as_i64()?;
        self.states
            .iter()
            .find(|s| s.value == raw)
            .map(|s| s.text.as_str())
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.value.as_ref().and_then(|v| v.as_bool())
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.value.as_ref().and_then(|v| v.as_f64())
    }
}
