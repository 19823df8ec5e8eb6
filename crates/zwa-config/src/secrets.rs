//! `secrets.yaml` lookup
//!
//! Keeps credentials such as the bot token out of the main configuration
//! file: `!secret key` looks the key up here.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde_yaml::Value;
use tracing::debug;

use crate::error::{ConfigError, ConfigResult};

pub const SECRETS_FILE: &str = "secrets.yaml";

#[derive(Debug, Clone, Default)]
pub struct Secrets {
    values: HashMap<String, String>,
    path: PathBuf,
}

impl Secrets {
    /// Read `secrets.yaml` from the config directory; no file means no secrets
    pub fn load(config_dir: &Path) -> ConfigResult<Self> {
        let path = config_dir.join(SECRETS_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No secrets file");
                return Ok(Self {
                    values: HashMap::new(),
                    path,
                });
            }
            Err(source) => return Err(ConfigError::Io { path, source }),
        };

        let document: Value = serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.clone(),
            source,
        })?;

        let mut values = HashMap::new();
        if let Value::Mapping(entries) = document {
            for (key, value) in entries {
                let (Value::String(key), Some(value)) = (key, scalar(value)) else {
                    continue;
                };
                values.insert(key, value);
            }
        }

        debug!(path = %path.display(), count = values.len(), "Loaded secrets");
        Ok(Self { values, path })
    }

    pub fn get(&self, key: &str) -> ConfigResult<&str> {
        self.values
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::MissingSecret(key.to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Secrets are substituted as strings; chat ids are often bare numbers
fn scalar(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
