// Configuration errors

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration key '{0}' is not set")]
    KeyNotFound(String),

    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Cannot store configuration value: {0}")]
    SerializationError(String),

    #[error("Configuration key '{key}' has an unexpected value: {reason}")]
    DeserializationError { key: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Environment variable '{name}' is not usable: {source}")]
    Env {
        name: String,
        #[source]
        source: std::env::VarError,
    },
}

impl ConfigError {
    /// Whether the error only means the key is absent
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::KeyNotFound(_) | Self::Env { source: std::env::VarError::NotPresent, .. })
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
