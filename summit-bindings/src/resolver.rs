//! Loading the catalog from a credentials source and applying a selection.

use crate::catalog::{ServiceBinding, ServiceBindingCatalog};
use crate::error::{BindingError, Result};
use crate::select::{select_by_name, select_by_predicate};
use crate::source::{is_absent, CredentialsSource, HostEnvironment};
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

type Predicate = Arc<dyn Fn(&ServiceBinding) -> bool + Send + Sync>;
type Selector = Arc<dyn Fn(&ServiceBindingCatalog) -> Option<ServiceBinding> + Send + Sync>;

/// How a caller picks its binding.
#[derive(Clone)]
pub enum BindingSelection {
    /// The binding with this exact name. Credentials are required.
    ByName(String),
    /// The single binding accepted by the predicate. Optional integration.
    Compatible(Predicate),
    /// A caller-supplied selector over the whole catalog. Optional integration.
    Custom(Selector),
}

impl BindingSelection {
    pub fn by_name(name: impl Into<String>) -> Self {
        Self::ByName(name.into())
    }

    pub fn compatible<P>(predicate: P) -> Self
    where
        P: Fn(&ServiceBinding) -> bool + Send + Sync + 'static,
    {
        Self::Compatible(Arc::new(predicate))
    }

    pub fn custom<S>(selector: S) -> Self
    where
        S: Fn(&ServiceBindingCatalog) -> Option<ServiceBinding> + Send + Sync + 'static,
    {
        Self::Custom(Arc::new(selector))
    }

    /// By name when a name is given, otherwise by compatibility.
    pub fn name_or<P>(name: Option<String>, predicate: P) -> Self
    where
        P: Fn(&ServiceBinding) -> bool + Send + Sync + 'static,
    {
        match name {
            Some(name) => Self::ByName(name),
            None => Self::compatible(predicate),
        }
    }

    fn requires_credentials(&self) -> bool {
        matches!(self, Self::ByName(_))
    }
}

impl fmt::Debug for BindingSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ByName(name) => f.debug_tuple("ByName").field(name).finish(),
            Self::Compatible(_) => f.write_str("Compatible(..)"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// Resolves a [`BindingSelection`] against the platform credentials.
///
/// The catalog is parsed on first use and kept until [`reload`](Self::reload).
pub struct BindingResolver {
    source: Arc<dyn CredentialsSource>,
    environment: HostEnvironment,
    catalog: RwLock<Option<Arc<ServiceBindingCatalog>>>,
}

impl BindingResolver {
    pub fn new(source: Arc<dyn CredentialsSource>, environment: HostEnvironment) -> Self {
        Self {
            source,
            environment,
            catalog: RwLock::new(None),
        }
    }

    /// Drop the cached catalog so the next resolution re-reads the source.
    pub fn reload(&self) {
        *self.catalog.write() = None;
    }

    fn catalog(&self, blob: &str) -> Result<Arc<ServiceBindingCatalog>> {
        if let Some(catalog) = self.catalog.read().as_ref() {
            return Ok(Arc::clone(catalog));
        }

        let parsed = Arc::new(ServiceBindingCatalog::parse(blob)?);
        *self.catalog.write() = Some(Arc::clone(&parsed));
        Ok(parsed)
    }

    /// Resolve the selection to one binding.
    ///
    /// Returns `Ok(None)` when the integration does not apply: the process is
    /// not on the platform, or an optional selection finds no credentials.
    pub fn resolve(&self, selection: &BindingSelection) -> Result<Option<ServiceBinding>> {
        if !self.source.is_platform() {
            debug!(?selection, "Not running on the platform, skipping service binding");
            return Ok(None);
        }

        let blob = self.source.read();
        if is_absent(blob.as_deref()) {
            if selection.requires_credentials() {
                return Err(BindingError::MissingCredentialsSource);
            }
            debug!(?selection, "No service bindings supplied, skipping optional binding");
            return Ok(None);
        }

        let blob = blob.unwrap_or_default();
        let contents = if self.environment.is_development() {
            blob.as_str()
        } else {
            "[REDACTED]"
        };
        debug!(contents, "Found VCAP_SERVICES environment variable");

        let catalog = self.catalog(&blob)?;
        let binding = match selection {
            BindingSelection::ByName(name) => select_by_name(&catalog, name)?.clone(),
            BindingSelection::Compatible(predicate) => {
                select_by_predicate(&catalog, |b| predicate(b))?.clone()
            }
            BindingSelection::Custom(selector) => {
                selector(&catalog).ok_or(BindingError::SelectorReturnedNone)?
            }
        };

        info!(binding = %binding.name, "Using service binding named '{}' from VCAP_SERVICES.", binding.name);
        Ok(Some(binding))
    }

    /// Resolve the selection and hand the binding to `apply`.
    ///
    /// Returns whether a binding was applied.
    pub fn apply<F>(&self, selection: &BindingSelection, apply: F) -> Result<bool>
    where
        F: FnOnce(&ServiceBinding),
    {
        match self.resolve(selection)? {
            Some(binding) => {
                apply(&binding);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
