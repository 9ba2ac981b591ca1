//! Resolved network endpoints

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Weak};
use thiserror::Error;
use url::{Host, Url};

/// A location that could not be turned into an endpoint
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EndpointParseError {
    #[error("'{0}' is not a valid URI: {1}")]
    InvalidUri(String, String),

    #[error("'{0}' has no host")]
    MissingHost(String),

    #[error("'{0}' has no port and its scheme has no default port")]
    MissingPort(String),
}

/// Network address of an endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EndpointAddress {
    Ip(SocketAddr),
    Dns { host: String, port: u16 },
}

impl EndpointAddress {
    /// Parse the host and port out of an absolute URI
    pub fn parse(uri: &str) -> Result<Self, EndpointParseError> {
        let url = Url::parse(uri)
            .map_err(|e| EndpointParseError::InvalidUri(uri.to_string(), e.to_string()))?;

        let port = url
            .port_or_known_default()
            .ok_or_else(|| EndpointParseError::MissingPort(uri.to_string()))?;

        match url.host() {
            Some(Host::Ipv4(ip)) => Ok(Self::Ip(SocketAddr::new(IpAddr::V4(ip), port))),
            Some(Host::Ipv6(ip)) => Ok(Self::Ip(SocketAddr::new(IpAddr::V6(ip), port))),
            Some(Host::Domain(host)) if !host.is_empty() => Ok(Self::Dns {
                host: host.to_string(),
                port,
            }),
            _ => Err(EndpointParseError::MissingHost(uri.to_string())),
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            Self::Ip(addr) => addr.port(),
            Self::Dns { port, .. } => *port,
        }
    }
}

impl fmt::Display for EndpointAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ip(addr) => write!(f, "{}", addr),
            Self::Dns { host, port } => write!(f, "{}:{}", host, port),
        }
    }
}

/// Identifies the provider that produced an endpoint
#[derive(Debug, PartialEq, Eq)]
pub struct ProviderIdentity {
    pub kind: String,
    pub service_name: String,
}

impl ProviderIdentity {
    pub fn new(kind: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            service_name: service_name.into(),
        }
    }
}

impl fmt::Display for ProviderIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.kind)
    }
}

/// A concrete endpoint and the scheme it was resolved under
///
/// The provider reference is for attribution only and does not keep the
/// provider alive.
#[derive(Debug, Clone)]
pub struct ResolvedEndpoint {
    pub scheme: String,
    pub address: EndpointAddress,
    provider: Weak<ProviderIdentity>,
}

impl ResolvedEndpoint {
    pub fn new(scheme: impl Into<String>, address: EndpointAddress) -> Self {
        Self {
            scheme: scheme.into(),
            address,
            provider: Weak::new(),
        }
    }

    pub(crate) fn with_provider(mut self, provider: Weak<ProviderIdentity>) -> Self {
        self.provider = provider;
        self
    }

    /// The provider that resolved this endpoint, while it is still alive
    pub fn provider(&self) -> Option<Arc<ProviderIdentity>> {
        self.provider.upgrade()
    }

    /// `scheme://host:port`
    pub fn url(&self) -> String {
        format!("{}://{}", self.scheme, self.address)
    }
}

impl PartialEq for ResolvedEndpoint {
    fn eq(&self, other: &Self) -> bool {
        self.scheme == other.scheme && self.address == other.address
    }
}

impl Eq for ResolvedEndpoint {}

impl fmt::Display for ResolvedEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.address)
    }
}
