use std::path::PathBuf;
use thiserror::Error;

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Why the configuration could not be loaded
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed YAML in {}: {source}", .path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no secret named '{0}' in secrets.yaml")]
    MissingSecret(String),

    #[error("environment variable '{0}' is not set")]
    MissingEnvVar(String),

    #[error("{tag} expects a string argument")]
    TagArgument { tag: &'static str },

    #[error("unsupported YAML tag {0}")]
    UnknownTag(String),

    /// The last file of the chain includes the first one again
    #[error("include cycle through {}", .chain.first().map(|p| p.display().to_string()).unwrap_or_default())]
    IncludeCycle { chain: Vec<PathBuf> },

    #[error("{field}: {reason}")]
    Invalid { field: String, reason: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
