//! YAML configuration loading for zwave-alert
//!
//! The service reads `zwave-alert.yaml` from a configuration directory.
//! Besides plain YAML the loader understands:
//!
//! - `!include path` - Include another YAML file
//! - `!secret key` - Substitute from secrets.yaml
//! - `!env_var VAR` - Environment variable substitution
//!
//! # Example
//!
//! ```ignore
//! use zwa_config::AppConfig;
//!
//! let config = AppConfig::load("/etc/zwave-alert")?;
//! println!("connecting to {}", config.zwave_js.url);
//! ```

mod app_config;
mod error;
mod loader;
mod secrets;

pub use app_config::{
    AlertsConfig, AppConfig, LoggingConfig, TelegramConfig, ZwaveJsConfig, CONFIG_FILE,
    MAX_SUPPRESSION_WINDOW_MINUTES,
};
pub use error::{ConfigError, ConfigResult};
pub use loader::{load_yaml, ConfigLoader};
pub use secrets::{Secrets, SECRETS_FILE};
