//! Service instances and the registry client seam

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use summit_bindings::BindingError;
use summit_config::ConfigError;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Service discovery errors
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Registry unavailable: {0}")]
    RegistryUnavailable(String),

    #[error("Registry returned status {status}: {body}")]
    RegistryResponse { status: u16, body: String },

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid service endpoint query '{0}'")]
    InvalidQuery(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("{0}")]
    NotConfigured(String),

    #[error(transparent)]
    Binding(#[from] BindingError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DiscoveryError {
    /// Whether the registry itself could not be reached or answered badly.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::HttpError(_) | Self::RegistryUnavailable(_) | Self::RegistryResponse { .. }
        )
    }
}

/// Liveness as reported by the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstanceStatus {
    Up,
    Down,
    Starting,
    OutOfService,
    #[default]
    Unknown,
}

impl InstanceStatus {
    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "UP" => Self::Up,
            "DOWN" => Self::Down,
            "STARTING" => Self::Starting,
            "OUT_OF_SERVICE" => Self::OutOfService,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Up => "UP",
            Self::Down => "DOWN",
            Self::Starting => "STARTING",
            Self::OutOfService => "OUT_OF_SERVICE",
            Self::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

/// One registered copy of a named service
///
/// Locations are kept as the registry reported them; they are only parsed
/// when an endpoint is resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceInstance {
    /// Instance ID (unique per instance)
    pub instance_id: String,

    /// Owning service name
    pub service_name: String,

    /// TLS location, when the instance exposes one
    pub secure_uri: Option<String>,

    /// Plain location, when the instance exposes one
    pub non_secure_uri: Option<String>,

    pub status: InstanceStatus,

    pub metadata: HashMap<String, String>,
}

impl ServiceInstance {
    /// Create new service instance with no locations
    pub fn new(instance_id: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            service_name: service_name.into(),
            secure_uri: None,
            non_secure_uri: None,
            status: InstanceStatus::Up,
            metadata: HashMap::new(),
        }
    }

    pub fn with_secure_uri(mut self, uri: impl Into<String>) -> Self {
        self.secure_uri = Some(uri.into());
        self
    }

    pub fn with_non_secure_uri(mut self, uri: impl Into<String>) -> Self {
        self.non_secure_uri = Some(uri.into());
        self
    }

    pub fn with_status(mut self, status: InstanceStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Location to use for a transport scheme
    ///
    /// `https` maps to the secure location and `http` to the plain one; any
    /// other scheme has no location.
    pub fn uri_for(&self, scheme: &str) -> Option<&str> {
        if scheme.eq_ignore_ascii_case("https") {
            self.secure_uri.as_deref()
        } else if scheme.eq_ignore_ascii_case("http") {
            self.non_secure_uri.as_deref()
        } else {
            None
        }
    }
}

/// Read access to an external service registry
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Fetch the current instances of a service
    ///
    /// Implementations should stop work and return
    /// [`DiscoveryError::Cancelled`] once `cancel` fires.
    async fn get_instances(
        &self,
        service_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ServiceInstance>, DiscoveryError>;

    /// Short name used in logs
    fn describe(&self) -> &str {
        "registry"
    }
}
