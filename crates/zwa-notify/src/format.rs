//! Message presentation
//!
//! Messages use Telegram's legacy Markdown: a severity glyph, the bold
//! title tag, a header describing the node and value, a blank line and
//! the body.

use std::fmt::Write;

use zwa_core::{Alert, AlertSubject, NodeInfo, Severity, ValueAlert, ValuePath};

/// Glyph shown in front of a message of the given severity
pub const fn glyph(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "\u{2139}\u{fe0f}",
        Severity::Warning => "\u{26a0}\u{fe0f}",
        Severity::Critical => "\u{1f6a8}",
    }
}

/// Formats messages with a fixed title tag (e.g. `ZWave`)
#[derive(Debug, Clone)]
pub struct MessageFormatter {
    title: String,
}

impl MessageFormatter {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
        }
    }

    /// Plain one-line message, used for lifecycle notices
    pub fn text(&self, text: &str, severity: Severity) -> String {
        format!("{} *{}:* {}", glyph(severity), self.title, text)
    }

    pub fn alert(&self, alert: &Alert) -> String {
        let mut out = format!(
            "{} *{}:* {}",
            glyph(alert.severity),
            self.title,
            node_label(alert.node_id, &alert.node)
        );

        match &alert.subject {
            AlertSubject::Status { old, new } => {
                let _ = write!(out, "\nStatus: {} -> *{}*", old, new);
            }
            AlertSubject::Value { path, alert } => {
                write_path(&mut out, path);
                let _ = write!(out, "\n\n{}", value_body(alert));
            }
        }
        out
    }
}

impl Default for MessageFormatter {
    fn default() -> Self {
        Self::new("ZWave")
    }
}

/// `name - location`, dropping whichever part is unknown
fn node_label(node_id: u32, node: &NodeInfo) -> String {
    match (node.name.as_deref(), node.location.as_deref()) {
        (Some(name), Some(location)) => format!("{} - {}", name, location),
        (Some(name), None) => name.to_string(),
        (None, Some(location)) => format!("Node {} - {}", node_id, location),
        (None, None) => format!("Node {}", node_id),
    }
}

fn write_path(out: &mut String, path: &ValuePath) {
    let _ = write!(
        out,
        "\nClass: {}\nEndpoint: {}\nProperty: {}",
        path.command_class_name, path.endpoint, path.property_name
    );
    if let Some(key) = &path.property_key_name {
        let _ = write!(out, "\nPropertyKey: {}", key);
    }
}

fn value_body(alert: &ValueAlert) -> String {
    match alert {
        ValueAlert::BatteryLow { is_low: true } => "*Battery IS LOW!*".to_string(),
        ValueAlert::BatteryLow { is_low: false } => "*Battery is not low*".to_string(),
        ValueAlert::BatteryLevel { level } => format!("*Battery level is:* {}%", level),
        ValueAlert::Notification { state } => format!("*Alert:* {}", state),
    }
}
