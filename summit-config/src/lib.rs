//! Configuration management for Summit services.
//!
//! Values are kept as a tree of sections. Keys are matched without regard to
//! case, `_` or `-`, so `Eureka__Client__RegistryFetchIntervalSeconds` from
//! the environment and `eureka.client.registry_fetch_interval_seconds` from a
//! TOML file address the same setting.

pub mod builder;
pub mod env;
pub mod error;
pub mod loader;
pub mod validation;

pub use builder::ConfigBuilder;
pub use env::EnvLoader;
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use validation::{ConfigValidator, Validate};

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::path::Path;
use std::sync::Arc;

/// Main configuration manager
#[derive(Clone)]
pub struct ConfigManager {
    root: Arc<RwLock<Value>>,
    env_prefix: Option<String>,
}

impl ConfigManager {
    /// Create a new configuration manager
    pub fn new() -> Self {
        Self {
            root: Arc::new(RwLock::new(Value::Object(Map::new()))),
            env_prefix: None,
        }
    }

    /// Create with environment variable prefix
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            env_prefix: Some(prefix.into()),
            ..Self::new()
        }
    }

    /// Builder for a layered configuration
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Load configuration from environment variables
    pub fn load_env(&self) -> Result<()> {
        let loader = EnvLoader::new(self.env_prefix.clone());
        for (path, value) in loader.load()? {
            self.insert(&path, Value::String(value));
        }
        Ok(())
    }

    /// Load an explicit set of variables as if they came from the environment
    pub fn load_vars<I, K, V>(&self, vars: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let loader = EnvLoader::new(self.env_prefix.clone());
        let vars = vars.into_iter().map(|(k, v)| (k.into(), v.into()));
        for (path, value) in loader.collect(vars) {
            self.insert(&path, Value::String(value));
        }
    }

    /// Load configuration from .env file
    pub fn load_dotenv(&self, path: Option<&str>) -> Result<()> {
        if let Some(path) = path {
            dotenvy::from_path(path).map_err(|e| ConfigError::LoadError(e.to_string()))?;
        } else {
            dotenvy::dotenv().ok();
        }
        self.load_env()
    }

    /// Load configuration from a file, detecting the format from its extension
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = ConfigLoader::auto(path.as_ref())?.load_file(path)?;
        self.load_value(data)
    }

    /// Load configuration from a file in the given format
    pub fn load_file_as(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).load_file(path)?;
        self.load_value(data)
    }

    /// Merge a tree of values into the configuration
    pub fn load_value(&self, data: Value) -> Result<()> {
        match data {
            Value::Object(map) => {
                let mut root = self.root.write();
                for (key, value) in map {
                    insert_path(&mut root, &key, value);
                }
                Ok(())
            }
            other => Err(ConfigError::ParseError(format!(
                "Configuration root must be an object, found {}",
                type_name(&other)
            ))),
        }
    }

    /// Set a configuration value
    pub fn set<T: serde::Serialize>(&self, path: &str, value: T) -> Result<()> {
        let json_value = serde_json::to_value(value)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        self.insert(path, json_value);
        Ok(())
    }

    fn insert(&self, path: &str, value: Value) {
        let mut root = self.root.write();
        insert_path(&mut root, path, value);
    }

    /// Get a configuration value
    ///
    /// String values are coerced to numbers and booleans when the requested
    /// type needs it, since everything read from the environment is a string.
    pub fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let root = self.root.read();
        let value = lookup_path(&root, path).ok_or_else(|| ConfigError::KeyNotFound(path.to_string()))?;
        coerce(path, value)
    }

    /// Get a configuration value, or `None` when the key is absent
    pub fn get_opt<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>> {
        match self.get(path) {
            Ok(value) => Ok(Some(value)),
            Err(ConfigError::KeyNotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Get a configuration value with default
    pub fn get_or<T: DeserializeOwned>(&self, path: &str, default: T) -> T {
        self.get(path).unwrap_or(default)
    }

    /// Get a string value
    pub fn get_string(&self, path: &str) -> Result<String> {
        self.get(path)
    }

    /// Get a boolean value
    pub fn get_bool(&self, path: &str) -> Result<bool> {
        self.get(path)
    }

    /// Get an unsigned integer value
    pub fn get_u64(&self, path: &str) -> Result<u64> {
        self.get(path)
    }

    /// Check if a key exists
    pub fn has(&self, path: &str) -> bool {
        let root = self.root.read();
        lookup_path(&root, path).is_some()
    }

    /// Get a copy of a whole section
    pub fn section(&self, path: &str) -> Option<Value> {
        let root = self.root.read();
        lookup_path(&root, path).cloned()
    }

    /// Get the top-level section names
    pub fn keys(&self) -> Vec<String> {
        match &*self.root.read() {
            Value::Object(map) => map.keys().cloned().collect(),
            _ => Vec::new(),
        }
    }

    /// Merge configuration from another manager; `other` wins on conflicts
    pub fn merge(&self, other: &ConfigManager) -> Result<()> {
        let snapshot = other.root.read().clone();
        self.load_value(snapshot)
    }

    /// Load and validate configuration
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let snapshot = self.root.read().clone();
        let validated: T = serde_json::from_value(snapshot).map_err(|e| {
            ConfigError::DeserializationError {
                key: "<root>".to_string(),
                reason: e.to_string(),
            }
        })?;

        validated.validate()?;

        Ok(validated)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Path handling
// ============================================================================

fn normalize(segment: &str) -> String {
    segment
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split(['.', ':']).filter(|segment| !segment.is_empty())
}

fn find_key(map: &Map<String, Value>, segment: &str) -> Option<String> {
    let wanted = normalize(segment);
    map.keys().find(|key| normalize(key) == wanted).cloned()
}

pub(crate) fn insert_path(root: &mut Value, path: &str, value: Value) {
    let segments: Vec<&str> = split_path(path).collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut current = root;
    for segment in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        let key = find_key(map, segment).unwrap_or_else(|| segment.to_string());
        current = map.entry(key).or_insert_with(|| Value::Object(Map::new()));
    }

    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    let Value::Object(map) = current else {
        return;
    };
    let key = find_key(map, last).unwrap_or_else(|| last.to_string());
    if let Value::Object(incoming) = value {
        if let Some(existing) = map.get_mut(&key).filter(|v| v.is_object()) {
            for (child, child_value) in incoming {
                insert_path(existing, &child, child_value);
            }
            return;
        }
        map.insert(key, Value::Object(incoming));
    } else {
        map.insert(key, value);
    }
}

fn lookup_path<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    split_path(path).try_fold(root, |current, segment| match current {
        Value::Object(map) => find_key(map, segment).and_then(|key| map.get(&key)),
        _ => None,
    })
}

fn coerce<T: DeserializeOwned>(path: &str, value: &Value) -> Result<T> {
    match serde_json::from_value::<T>(value.clone()) {
        Ok(typed) => Ok(typed),
        Err(original) => {
            if let Value::String(raw) = value {
                let raw = raw.trim();
                let candidate = if raw.eq_ignore_ascii_case("true") || raw.eq_ignore_ascii_case("false") {
                    raw.to_lowercase()
                } else {
                    raw.to_string()
                };
                if let Ok(typed) = serde_json::from_str::<Value>(&candidate)
                    .and_then(serde_json::from_value::<T>)
                {
                    return Ok(typed);
                }
            }
            Err(ConfigError::DeserializationError {
                key: path.to_string(),
                reason: original.to_string(),
            })
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
