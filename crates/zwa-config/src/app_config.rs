//! Application configuration
//!
//! Parses `zwave-alert.yaml`. Every section is optional; a missing
//! `telegram` section puts the service in log-only mode.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::path::Path;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::loader::load_yaml;

/// Name of the main configuration file inside the config directory
pub const CONFIG_FILE: &str = "zwave-alert.yaml";

/// Longest accepted suppression window, one week
pub const MAX_SUPPRESSION_WINDOW_MINUTES: u64 = 7 * 24 * 60;

/// Telegram Bot API credentials
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub api_key: String,

    /// Chat ids may be written as numbers in YAML
    #[serde(deserialize_with = "string_or_number")]
    pub chat_id: String,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Connection to the zwave-js-server websocket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZwaveJsConfig {
    #[serde(default = "default_zwave_js_url")]
    pub url: String,

    #[serde(default = "default_reconnect_secs")]
    pub reconnect_secs: u64,
}

impl Default for ZwaveJsConfig {
    fn default() -> Self {
        Self {
            url: default_zwave_js_url(),
            reconnect_secs: default_reconnect_secs(),
        }
    }
}

/// Alerting policy values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertsConfig {
    /// Tag shown in front of every message
    #[serde(default = "default_title")]
    pub title: String,

    /// Battery level (percent) at or below which a reading is a warning
    #[serde(default = "default_battery_low_threshold")]
    pub battery_low_threshold: f64,

    /// How long a sent notification state suppresses identical repeats
    #[serde(default = "default_suppression_window_minutes")]
    pub suppression_window_minutes: u64,
}

impl AlertsConfig {
    pub fn suppression_window(&self) -> Duration {
        Duration::from_secs(self.suppression_window_minutes.saturating_mul(60))
    }
}

impl Default for AlertsConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            battery_low_threshold: default_battery_low_threshold(),
            suppression_window_minutes: default_suppression_window_minutes(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,

    #[serde(default)]
    pub zwave_js: ZwaveJsConfig,

    #[serde(default)]
    pub alerts: AlertsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_api_url() -> String {
    "https://api.telegram.org".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_zwave_js_url() -> String {
    "ws://localhost:3000".to_string()
}

fn default_reconnect_secs() -> u64 {
    5
}

fn default_title() -> String {
    "ZWave".to_string()
}

fn default_battery_low_threshold() -> f64 {
    30.0
}

fn default_suppression_window_minutes() -> u64 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;

    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "expected a string or number, got {:?}",
            other
        ))),
    }
}

impl AppConfig {
    /// Load configuration from `zwave-alert.yaml` in a config directory
    pub fn load(config_dir: impl AsRef<Path>) -> ConfigResult<Self> {
        let yaml = load_yaml(config_dir.as_ref(), CONFIG_FILE)?;
        Self::from_yaml(&yaml)
    }

    /// Parse and validate configuration from a YAML value
    pub fn from_yaml(yaml: &Value) -> ConfigResult<Self> {
        if yaml.is_null() {
            return Ok(Self::default());
        }
        if !yaml.is_mapping() {
            return Err(ConfigError::invalid("root", "configuration must be a mapping"));
        }

        let config: AppConfig =
            serde_yaml::from_value(yaml.clone()).map_err(|e| ConfigError::invalid("root", e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> ConfigResult<()> {
        if let Some(telegram) = &self.telegram {
            if telegram.api_key.trim().is_empty() {
                return Err(ConfigError::invalid("telegram.api_key", "must not be empty"));
            }
            if telegram.chat_id.trim().is_empty() {
                return Err(ConfigError::invalid("telegram.chat_id", "must not be empty"));
            }
        }

        let threshold = self.alerts.battery_low_threshold;
        if !(0.0..=100.0).contains(&threshold) {
            return Err(ConfigError::invalid(
                "alerts.battery_low_threshold",
                "must be a percentage between 0 and 100",
            ));
        }
        if !(1..=MAX_SUPPRESSION_WINDOW_MINUTES).contains(&self.alerts.suppression_window_minutes) {
            return Err(ConfigError::invalid(
                "alerts.suppression_window_minutes",
                format!("must be between 1 and {MAX_SUPPRESSION_WINDOW_MINUTES}"),
            ));
        }
        Ok(())
    }
}
