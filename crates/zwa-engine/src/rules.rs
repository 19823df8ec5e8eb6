//! Value rules
//!
//! Each rule owns one property class: it decides which value events it
//! handles, what a never-observed value looks like, and whether a new
//! observation is worth an alert. New classes are added by implementing
//! [`ValueRule`] and passing the rule to
//! [`Classifier::with_rules`](crate::Classifier::with_rules).

use std::time::Duration;

use zwa_config::AlertsConfig;
use zwa_core::{
    NodeInfo, Severity, ValueAlert, ValueChangedData, COMMAND_CLASS_BATTERY,
    COMMAND_CLASS_NOTIFICATION,
};
use zwa_state_store::{ValueKind, ValueState};

use crate::suppression::{SuppressionTracker, DEFAULT_WINDOW_TTL};

/// Resolved state of a notification value with no active event
pub const IDLE: &str = "idle";

/// Policy values shared by the rules
#[derive(Debug, Clone, PartialEq)]
pub struct AlertPolicy {
    /// Battery level (percent) at or below which a reading is a warning
    pub battery_low_threshold: f64,
    /// Lifetime of a notification suppression window
    pub suppression_window: Duration,
}

impl Default for AlertPolicy {
    fn default() -> Self {
        Self {
            battery_low_threshold: 30.0,
            suppression_window: DEFAULT_WINDOW_TTL,
        }
    }
}

impl From<&AlertsConfig> for AlertPolicy {
    fn from(config: &AlertsConfig) -> Self {
        Self {
            battery_low_threshold: config.battery_low_threshold,
            suppression_window: config.suppression_window(),
        }
    }
}

/// What a rule may consult while evaluating
pub struct RuleContext<'a> {
    /// Current display metadata of the node
    pub node: &'a NodeInfo,
    pub windows: &'a SuppressionTracker,
    pub policy: &'a AlertPolicy,
}

/// A rule's verdict that an observation deserves an alert
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub severity: Severity,
    pub alert: ValueAlert,
}

/// Alerting rule for one property class
pub trait ValueRule: Send + Sync {
    /// Unique name of this rule, for logs
    fn name(&self) -> &'static str;

    fn applies_to(&self, value: &ValueChangedData) -> bool;

    /// Shape of the state stored for a matching value; a first observation
    /// reaches [`evaluate`](Self::evaluate) as the empty state of this kind
    fn kind(&self) -> ValueKind;

    /// Compare the observation with the stored state, update the state and
    /// report whether to alert
    ///
    /// Observations whose raw value has the wrong type are ignored and
    /// leave the state untouched.
    fn evaluate(
        &self,
        value: &ValueChangedData,
        state: &mut ValueState,
        ctx: &RuleContext<'_>,
    ) -> Option<Finding>;
}

/// Rules for the property classes alerted on out of the box
pub fn default_rules() -> Vec<Box<dyn ValueRule>> {
    vec![
        Box::new(BatteryLowRule),
        Box::new(BatteryLevelRule),
        Box::new(NotificationRule),
    ]
}

/// Battery `isLow` flag
///
/// Alerts when the flag differs from the stored one. The first observation
/// alerts only if the flag is already set.
pub struct BatteryLowRule;

impl ValueRule for BatteryLowRule {
    fn name(&self) -> &'static str {
        "battery_low"
    }

    fn applies_to(&self, value: &ValueChangedData) -> bool {
        value.command_class == COMMAND_CLASS_BATTERY && value.property == "isLow"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Flag
    }

    fn evaluate(
        &self,
        value: &ValueChangedData,
        state: &mut ValueState,
        _ctx: &RuleContext<'_>,
    ) -> Option<Finding> {
        let is_low = value.as_bool()?;
        let ValueState::Flag(stored) = state else {
            return None;
        };

        let changed = match *stored {
            Some(previous) => previous != is_low,
            None => is_low,
        };
        *stored = Some(is_low);

        changed.then(|| Finding {
            severity: if is_low {
                Severity::Warning
            } else {
                Severity::Info
            },
            alert: ValueAlert::BatteryLow { is_low },
        })
    }
}

/// Battery `level` percentage
///
/// A reading alerts when it differs from the stored one (or is the first)
/// and either is at or below the threshold or replaces an earlier reading.
/// Repeating the same reading never alerts.
pub struct BatteryLevelRule;

impl ValueRule for BatteryLevelRule {
    fn name(&self) -> &'static str {
        "battery_level"
    }

    fn applies_to(&self, value: &ValueChangedData) -> bool {
        value.command_class == COMMAND_CLASS_BATTERY && value.property == "level"
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Level
    }

    fn evaluate(
        &self,
        value: &ValueChangedData,
        state: &mut ValueState,
        ctx: &RuleContext<'_>,
    ) -> Option<Finding> {
        let level = value.as_f64()?;
        let ValueState::Level(stored) = state else {
            return None;
        };

        let previous = stored.replace(level);
        let low = level <= ctx.policy.battery_low_threshold;
        let alert = previous != Some(level) && (low || previous.is_some());

        alert.then(|| Finding {
            severity: if low { Severity::Warning } else { Severity::Info },
            alert: ValueAlert::BatteryLevel { level },
        })
    }
}

/// Enumerated Notification command class values
///
/// The raw value is resolved through the value's state table; anything
/// unresolvable is [`IDLE`]. Alerts go through the suppression windows so
/// a state repeated within the window is reported once.
pub struct NotificationRule;

impl ValueRule for NotificationRule {
    fn name(&self) -> &'static str {
        "notification"
    }

    fn applies_to(&self, value: &ValueChangedData) -> bool {
        value.command_class == COMMAND_CLASS_NOTIFICATION && value.readable && value.list
    }

    fn kind(&self) -> ValueKind {
        ValueKind::Named
    }

    fn evaluate(
        &self,
        value: &ValueChangedData,
        state: &mut ValueState,
        ctx: &RuleContext<'_>,
    ) -> Option<Finding> {
        let ValueState::Named(stored) = state else {
            return None;
        };

        let resolved = value.state_name().unwrap_or(IDLE).to_string();
        let previous = stored.replace(resolved.clone());

        if previous.is_none() && resolved == IDLE {
            return None;
        }

        let key = window_key(ctx.node, value);
        if ctx.windows.should_suppress(&key, &resolved) {
            return None;
        }
        ctx.windows.open(&key, &resolved);

        let severity = if resolved == IDLE {
            Severity::Info
        } else {
            Severity::Warning
        };
        Some(Finding {
            severity,
            alert: ValueAlert::Notification { state: resolved },
        })
    }
}

/// Identity of an alert source for suppression purposes
///
/// `name-location-class-endpoint-property[-propertyKey]`. A missing name
/// becomes `Node <id>` and a missing location the bare node id, so unnamed
/// nodes never share a key.
pub fn window_key(node: &NodeInfo, value: &ValueChangedData) -> String {
    let name = match node.name.as_deref() {
        Some(name) => name.to_string(),
        None => format!("Node {}", value.node_id),
    };
    let location = match node.location.as_deref() {
        Some(location) => location.to_string(),
        None => value.node_id.to_string(),
    };
    let mut key = format!(
        "{}-{}-{}-{}-{}",
        name, location, value.command_class_name, value.endpoint, value.property_name
    );
    if let Some(property_key) = &value.property_key_name {
        key.push('-');
        key.push_str(property_key);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use zwa_core::ValueStateName;

    fn battery(property: &str, value: serde_json::Value) -> ValueChangedData {
        ValueChangedData {
            node_id: 3,
            value_id: format!("3-128-0-{}", property),
            command_class: COMMAND_CLASS_BATTERY,
            command_class_name: "Battery".to_string(),
            endpoint: 0,
            property: property.to_string(),
            property_name: property.to_string(),
            property_key_name: None,
            value: Some(value),
            readable: true,
            list: false,
            states: Vec::new(),
            node: NodeInfo::default(),
        }
    }

    fn run(
        rule: &dyn ValueRule,
        value: &ValueChangedData,
        state: &mut ValueState,
        windows: &SuppressionTracker,
    ) -> Option<Finding> {
        let node = NodeInfo::new("Sensor", "Hall");
        let policy = AlertPolicy::default();
        let ctx = RuleContext {
            node: &node,
            windows,
            policy: &policy,
        };
        rule.evaluate(value, state, &ctx)
    }

    #[tokio::test]
    async fn test_battery_low_first_observation() {
        let windows = SuppressionTracker::default();

        let mut state = BatteryLowRule.kind().empty();
        assert!(run(&BatteryLowRule, &battery("isLow", json!(false)), &mut state, &windows).is_none());
        assert_eq!(state, ValueState::Flag(Some(false)));

        let mut state = BatteryLowRule.kind().empty();
        let finding = run(&BatteryLowRule, &battery("isLow", json!(true)), &mut state, &windows).unwrap();
        assert_eq!(finding.severity, Severity::Warning);
        assert_eq!(finding.alert, ValueAlert::BatteryLow { is_low: true });
    }

    #[tokio::test]
    async fn test_battery_low_toggles() {
        let windows = SuppressionTracker::default();
        let mut state = ValueState::Flag(Some(true));

        assert!(run(&BatteryLowRule, &battery("isLow", json!(true)), &mut state, &windows).is_none());

        let finding = run(&BatteryLowRule, &battery("isLow", json!(false)), &mut state, &windows).unwrap();
        assert_eq!(finding.severity, Severity::Info);
        assert_eq!(finding.alert, ValueAlert::BatteryLow { is_low: false });
        assert_eq!(state, ValueState::Flag(Some(false)));
    }

    #[tokio::test]
    async fn test_battery_low_ignores_non_boolean() {
        let windows = SuppressionTracker::default();
        let mut state = ValueState::Flag(Some(false));

        assert!(run(&BatteryLowRule, &battery("isLow", json!("yes")), &mut state, &windows).is_none());
        assert_eq!(state, ValueState::Flag(Some(false)));
    }

    #[tokio::test]
    async fn test_battery_level_first_low_reading_alerts() {
        let windows = SuppressionTracker::default();
        let mut state = BatteryLevelRule.kind().empty();

        let finding = run(&BatteryLevelRule, &battery("level", json!(30)), &mut state, &windows).unwrap();
        assert_eq!(finding.severity, Severity::Warning);
        assert_eq!(finding.alert, ValueAlert::BatteryLevel { level: 30.0 });
        assert_eq!(state, ValueState::Level(Some(30.0)));
    }

    #[tokio::test]
    async fn test_battery_level_change_above_threshold_is_info() {
        let windows = SuppressionTracker::default();
        let mut state = ValueState::Level(Some(80.0));

        let finding = run(&BatteryLevelRule, &battery("level", json!(79)), &mut state, &windows).unwrap();
        assert_eq!(finding.severity, Severity::Info);
    }

    #[test]
    fn test_rule_matching() {
        let level = battery("level", json!(50));
        assert!(BatteryLevelRule.applies_to(&level));
        assert!(!BatteryLowRule.applies_to(&level));
        assert!(!NotificationRule.applies_to(&level));

        let mut notification = battery("Home Security", json!(8));
        notification.command_class = COMMAND_CLASS_NOTIFICATION;
        notification.readable = true;
        notification.list = true;
        assert!(NotificationRule.applies_to(&notification));

        notification.list = false;
        assert!(!NotificationRule.applies_to(&notification));
    }

    #[test]
    fn test_window_key() {
        let mut value = battery("Home Security", json!(8));
        value.command_class_name = "Notification".to_string();
        value.property_name = "Home Security".to_string();
        value.states = vec![ValueStateName {
            value: 8,
            text: "Motion detection".to_string(),
        }];

        let node = NodeInfo::new("Motion", "Hall");
        assert_eq!(window_key(&node, &value), "Motion-Hall-Notification-0-Home Security");

        value.property_key_name = Some("Motion sensor status".to_string());
        assert_eq!(
            window_key(&node, &value),
            "Motion-Hall-Notification-0-Home Security-Motion sensor status"
        );

        assert_eq!(
            window_key(&NodeInfo::default(), &value),
            "Node 3-3-Notification-0-Home Security-Motion sensor status"
        );

        value.node_id = 4;
        assert_eq!(
            window_key(&NodeInfo::new("Motion", "Hall"), &value),
            "Motion-Hall-Notification-0-Home Security-Motion sensor status"
        );
        assert_eq!(
            window_key(&NodeInfo::default(), &value),
            "Node 4-4-Notification-0-Home Security-Motion sensor status"
        );
    }
}
