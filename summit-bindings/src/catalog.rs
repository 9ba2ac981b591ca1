//! Parsed service-binding catalog.

use crate::error::Result;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// One named bundle of credentials for a backing service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceBinding {
    pub name: String,
    pub label: Option<String>,
    pub plan: Option<String>,
    pub tags: BTreeSet<String>,
    /// Credential values keyed by their path, nested keys joined with `:`.
    pub credentials: BTreeMap<String, String>,
}

impl ServiceBinding {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            plan: None,
            tags: BTreeSet::new(),
            credentials: BTreeMap::new(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_credential(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.credentials.insert(key.into(), value.into());
        self
    }

    /// Case-insensitive tag check.
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    pub fn credential(&self, key: &str) -> Option<&str> {
        self.credentials.get(key).map(String::as_str)
    }
}

#[derive(Deserialize)]
struct RawBinding {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    plan: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    credentials: Value,
}

impl From<RawBinding> for ServiceBinding {
    fn from(raw: RawBinding) -> Self {
        let mut credentials = BTreeMap::new();
        flatten_into(&mut credentials, None, raw.credentials);

        Self {
            name: raw.name.unwrap_or_default(),
            label: raw.label,
            plan: raw.plan,
            tags: raw.tags.into_iter().collect(),
            credentials,
        }
    }
}

fn flatten_into(out: &mut BTreeMap<String, String>, prefix: Option<&str>, value: Value) {
    let join = |key: &str| match prefix {
        Some(prefix) => format!("{}:{}", prefix, key),
        None => key.to_string(),
    };

    match value {
        Value::Null => {}
        Value::Object(map) => {
            for (key, child) in map {
                flatten_into(out, Some(&join(&key)), child);
            }
        }
        Value::Array(items) => {
            for (index, child) in items.into_iter().enumerate() {
                flatten_into(out, Some(&join(&index.to_string())), child);
            }
        }
        Value::String(s) => {
            if let Some(prefix) = prefix {
                out.insert(prefix.to_string(), s);
            }
        }
        scalar => {
            if let Some(prefix) = prefix {
                out.insert(prefix.to_string(), scalar.to_string());
            }
        }
    }
}

/// Bindings grouped by category (the service label in `VCAP_SERVICES`).
///
/// Read-only once parsed. Iteration order is category key order, then the
/// order bindings appear within a category.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceBindingCatalog {
    categories: BTreeMap<String, Vec<ServiceBinding>>,
}

impl ServiceBindingCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the `VCAP_SERVICES` JSON shape.
    pub fn parse(json: &str) -> Result<Self> {
        let raw: BTreeMap<String, Vec<RawBinding>> = serde_json::from_str(json)?;
        let categories = raw
            .into_iter()
            .map(|(category, bindings)| {
                (category, bindings.into_iter().map(ServiceBinding::from).collect())
            })
            .collect();
        Ok(Self { categories })
    }

    pub fn with_binding(mut self, category: impl Into<String>, binding: ServiceBinding) -> Self {
        self.categories.entry(category.into()).or_default().push(binding);
        self
    }

    /// All bindings across every category.
    pub fn bindings(&self) -> impl Iterator<Item = &ServiceBinding> {
        self.categories.values().flatten()
    }

    pub fn category(&self, key: &str) -> &[ServiceBinding] {
        self.categories.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
