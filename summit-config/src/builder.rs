// Layered configuration builder

use crate::{ConfigManager, Result};
use serde_json::Value;
use std::path::PathBuf;
use tracing::debug;

/// Builder for a [`ConfigManager`]
///
/// Layers are applied in a fixed order: defaults, files, `.env`, then the
/// process environment. Later layers win.
pub struct ConfigBuilder {
    prefix: Option<String>,
    defaults: Vec<Value>,
    config_files: Vec<(PathBuf, bool)>,
    load_dotenv: bool,
    dotenv_path: Option<String>,
    load_env: bool,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            prefix: None,
            defaults: Vec::new(),
            config_files: Vec::new(),
            load_dotenv: false,
            dotenv_path: None,
            load_env: false,
        }
    }

    /// Set environment variable prefix
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Add a tree of default values
    pub fn with_defaults(mut self, defaults: Value) -> Self {
        self.defaults.push(defaults);
        self
    }

    /// Add a required configuration file
    pub fn add_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_files.push((path.into(), true));
        self
    }

    /// Add a configuration file that is skipped when missing
    pub fn add_optional_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_files.push((path.into(), false));
        self
    }

    /// Enable loading from .env file
    pub fn load_dotenv(mut self, path: Option<String>) -> Self {
        self.load_dotenv = true;
        self.dotenv_path = path;
        self
    }

    /// Enable loading from environment variables
    pub fn load_env(mut self) -> Self {
        self.load_env = true;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<ConfigManager> {
        let manager = match self.prefix {
            Some(prefix) => ConfigManager::with_prefix(prefix),
            None => ConfigManager::new(),
        };

        for defaults in self.defaults {
            manager.load_value(defaults)?;
        }

        for (path, required) in self.config_files {
            if !required && !path.exists() {
                debug!(path = %path.display(), "Skipping missing optional configuration file");
                continue;
            }
            manager.load_file(&path)?;
        }

        if self.load_dotenv {
            let _ = manager.load_dotenv(self.dotenv_path.as_deref());
        } else if self.load_env {
            manager.load_env()?;
        }

        Ok(manager)
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
