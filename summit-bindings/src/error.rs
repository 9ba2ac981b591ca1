//! Binding selection errors.

use thiserror::Error;

/// Result type for binding operations.
pub type Result<T> = std::result::Result<T, BindingError>;

/// Errors raised while loading or selecting service bindings.
///
/// Every variant is a configuration error: it surfaces at startup and is
/// not recoverable by retrying.
#[derive(Debug, Error)]
pub enum BindingError {
    /// Credentials were required but the platform never supplied them.
    #[error(
        "The VCAP_SERVICES environment variable is unavailable or empty. Bind the dependent services to your app first."
    )]
    MissingCredentialsSource,

    /// No binding carries the requested name.
    #[error("Service binding '{name}' not found in VCAP_SERVICES.")]
    BindingNotFound { name: String },

    /// More than one binding carries the requested name.
    #[error("Service binding name '{name}' is used by {count} bindings in VCAP_SERVICES.")]
    DuplicateBindingName { name: String, count: usize },

    /// The compatibility predicate matched nothing.
    #[error("No compatible service binding found in VCAP_SERVICES.")]
    NoCompatibleBinding,

    /// The compatibility predicate matched more than one binding.
    #[error(
        "Multiple compatible service bindings found in VCAP_SERVICES ({}). Please specify the service binding name.",
        .candidates.join(", ")
    )]
    AmbiguousBinding { candidates: Vec<String> },

    /// A caller-supplied selector declined to pick a binding.
    #[error("Service binding is unavailable.")]
    SelectorReturnedNone,

    /// The credentials blob is not valid JSON of the expected shape.
    #[error("Failed to parse VCAP_SERVICES: {0}")]
    Parse(#[from] serde_json::Error),
}

impl BindingError {
    /// Name of the binding the error is about, when there is one.
    pub fn binding_name(&self) -> Option<&str> {
        match self {
            Self::BindingNotFound { name } | Self::DuplicateBindingName { name, .. } => Some(name),
            _ => None,
        }
    }
}
