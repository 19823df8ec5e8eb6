//! YAML loading with `!include`, `!secret` and `!env_var`
//!
//! Includes are resolved relative to the including file. Any other tag is
//! rejected so a typo does not silently become a literal value.

use std::path::{Path, PathBuf};

use serde_yaml::value::TaggedValue;
use serde_yaml::{Mapping, Value};
use tracing::{debug, trace};

use crate::error::{ConfigError, ConfigResult};
use crate::secrets::Secrets;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tag {
    Include,
    Secret,
    EnvVar,
}

impl Tag {
    fn parse(tag: &str) -> ConfigResult<Self> {
        match tag {
            "!include" => Ok(Tag::Include),
            "!secret" => Ok(Tag::Secret),
            "!env_var" => Ok(Tag::EnvVar),
            other => Err(ConfigError::UnknownTag(other.to_string())),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Tag::Include => "!include",
            Tag::Secret => "!secret",
            Tag::EnvVar => "!env_var",
        }
    }
}

/// Loads configuration files from one directory, resolving tags
pub struct ConfigLoader {
    config_dir: PathBuf,
    secrets: Secrets,
    /// Files being loaded, outermost first
    chain: Vec<PathBuf>,
}

impl ConfigLoader {
    pub fn open(config_dir: impl Into<PathBuf>) -> ConfigResult<Self> {
        let config_dir = config_dir.into();
        let secrets = Secrets::load(&config_dir)?;
        Ok(Self {
            config_dir,
            secrets,
            chain: Vec::new(),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    /// Load a file, relative paths being taken from the config directory
    pub fn load(&mut self, file: impl AsRef<Path>) -> ConfigResult<Value> {
        let path = self.config_dir.join(file);
        self.load_path(path)
    }

    fn load_path(&mut self, path: PathBuf) -> ConfigResult<Value> {
        if let Some(start) = self.chain.iter().position(|p| *p == path) {
            return Err(ConfigError::IncludeCycle {
                chain: self.chain[start..].to_vec(),
            });
        }
        debug!(path = %path.display(), "Loading configuration file");

        let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let document: Value = serde_yaml::from_str(&content).map_err(|source| ConfigError::Yaml {
            path: path.clone(),
            source,
        })?;

        self.chain.push(path);
        let resolved = self.resolve(document);
        self.chain.pop();
        resolved
    }

    fn resolve(&mut self, value: Value) -> ConfigResult<Value> {
        Ok(match value {
            Value::Tagged(tagged) => self.resolve_tag(*tagged)?,
            Value::Mapping(entries) => {
                let mut resolved = Mapping::with_capacity(entries.len());
                for (key, value) in entries {
                    resolved.insert(key, self.resolve(value)?);
                }
                Value::Mapping(resolved)
            }
            Value::Sequence(items) => Value::Sequence(
                items
                    .into_iter()
                    .map(|item| self.resolve(item))
                    .collect::<ConfigResult<_>>()?,
            ),
            plain => plain,
        })
    }

    fn resolve_tag(&mut self, tagged: TaggedValue) -> ConfigResult<Value> {
        let tag = Tag::parse(&tagged.tag.to_string())?;
        let Value::String(argument) = tagged.value else {
            return Err(ConfigError::TagArgument { tag: tag.name() });
        };
        trace!(tag = tag.name(), %argument, "Resolving tag");

        match tag {
            Tag::Include => {
                let target = Path::new(&argument);
                let path = if target.is_absolute() {
                    target.to_path_buf()
                } else {
                    self.current_dir().join(target)
                };
                self.load_path(path)
            }
            Tag::Secret => Ok(Value::String(self.secrets.get(&argument)?.to_string())),
            Tag::EnvVar => std::env::var(&argument)
                .map(Value::String)
                .map_err(|_| ConfigError::MissingEnvVar(argument)),
        }
    }

    /// Directory of the file currently being resolved
    fn current_dir(&self) -> PathBuf {
        self.chain
            .last()
            .and_then(|file| file.parent())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.config_dir.clone())
    }
}

/// Load `file` from `config_dir` with tag resolution
pub fn load_yaml(config_dir: impl Into<PathBuf>, file: impl AsRef<Path>) -> ConfigResult<Value> {
    ConfigLoader::open(config_dir)?.load(file)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_include_relative_to_including_file() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "conf.d/alerts.yaml", "battery_low_threshold: 25\n");
        write(dir.path(), "conf.d/main.yaml", "alerts: !include alerts.yaml\n");
        write(dir.path(), "config.yaml", "root: !include conf.d/main.yaml\n");

        let value = load_yaml(dir.path(), "config.yaml").unwrap();
        assert_eq!(value["root"]["alerts"]["battery_low_threshold"].as_u64(), Some(25));
    }

    #[test]
    fn test_secret_in_sequence() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "secrets.yaml", "bot_token: 42:token\n");
        write(dir.path(), "config.yaml", "keys:\n  - plain\n  - !secret bot_token\n");

        let value = load_yaml(dir.path(), "config.yaml").unwrap();
        assert_eq!(value["keys"][0].as_str(), Some("plain"));
        assert_eq!(value["keys"][1].as_str(), Some("42:token"));
    }

    #[test]
    fn test_env_var() {
        let dir = TempDir::new().unwrap();
        std::env::set_var("TEST_ZWA_CONFIG_VAR", "ws://controller:3000");
        write(dir.path(), "config.yaml", "url: !env_var TEST_ZWA_CONFIG_VAR\n");

        let value = load_yaml(dir.path(), "config.yaml").unwrap();
        assert_eq!(value["url"].as_str(), Some("ws://controller:3000"));

        std::env::remove_var("TEST_ZWA_CONFIG_VAR");
    }

    #[test]
    fn test_missing_env_var() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "config.yaml", "url: !env_var TEST_ZWA_UNSET_VAR\n");

        let err = load_yaml(dir.path(), "config.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref v) if v == "TEST_ZWA_UNSET_VAR"));
    }

    #[test]
    fn test_include_cycle() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.yaml", "b: !include b.yaml\n");
        write(dir.path(), "b.yaml", "a: !include a.yaml\n");

        match load_yaml(dir.path(), "a.yaml") {
            Err(ConfigError::IncludeCycle { chain }) => {
                assert_eq!(chain.len(), 2);
                assert!(chain[0].ends_with("a.yaml"));
            }
            other => panic!("Expected include cycle, got {:?}", other),
        }
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "config.yaml", "value: !include_dir_list somewhere\n");

        let err = load_yaml(dir.path(), "config.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownTag(ref t) if t == "!include_dir_list"));
    }

    #[test]
    fn test_tag_argument_must_be_string() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "config.yaml", "value: !secret [a, b]\n");

        let err = load_yaml(dir.path(), "config.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::TagArgument { tag: "!secret" }));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_yaml(dir.path(), "zwave-alert.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
