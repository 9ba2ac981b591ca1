//! Service Discovery for Summit
//!
//! This crate turns the instances a registry reports for a service into the
//! network endpoints a caller should use.
//!
//! ## Features
//!
//! - **Scheme priority** - Resolve `https+http` style preferences, first
//!   scheme with any endpoint wins
//! - **Registry clients** - Eureka over HTTP, or in-memory
//! - **Endpoint providers** - Fresh registry lookup on every call, with
//!   cooperative cancellation
//! - **Client configuration** - Register/discover toggles, fetch interval
//!   reconciliation, credentials from platform service bindings
//!
//! ## Quick Start
//!
//! ### In-Memory Registry (Testing)
//!
//! ```rust,ignore
//! use summit_discovery::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = InMemoryRegistry::new();
//!     registry
//!         .register(
//!             ServiceInstance::new("api-1", "apiservice")
//!                 .with_non_secure_uri("http://localhost:5001/"),
//!         )
//!         .await;
//!
//!     let factory = EndpointProviderFactory::new(Arc::new(registry), DiscoveryOptions::default());
//!     let endpoints = factory
//!         .resolve("https+http://apiservice", &CancellationToken::new())
//!         .await?;
//!
//!     for endpoint in endpoints {
//!         println!("Found: {}", endpoint.url());
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ### Eureka
//!
//! ```rust,ignore
//! use summit_discovery::*;
//!
//! let settings = DiscoverySettings::from_config(&config)?;
//! let mut setup = DiscoverySetup::from_settings(&settings);
//! setup.add_eureka_service_discovery(settings.register, settings.discover, |_| {});
//!
//! let factory = setup.provider_factory()?;
//! ```

pub mod endpoint;
pub mod eureka;
pub mod interval;
pub mod memory;
pub mod provider;
pub mod resolver;
pub mod scheme;
pub mod service;
pub mod settings;
pub mod setup;

pub use endpoint::{EndpointAddress, EndpointParseError, ProviderIdentity, ResolvedEndpoint};
pub use eureka::EurekaRegistryClient;
pub use interval::{
    reconcile, IntervalConfig, DEFAULT_REFRESH_PERIOD, DEFAULT_REGISTRY_FETCH_INTERVAL_SECONDS,
};
pub use memory::InMemoryRegistry;
pub use provider::{EndpointProviderFactory, RegistryEndpointProvider};
pub use resolver::{resolve, resolve_with_provider};
pub use scheme::{AllowedSchemes, SchemePreference, ServiceEndpointQuery};
pub use service::{DiscoveryError, InstanceStatus, RegistryClient, ServiceInstance};
pub use settings::{
    parse_duration, DiscoveryOptions, DiscoverySettings, EurekaClientOptions,
    DEFAULT_EUREKA_SERVER_URL,
};
pub use setup::{
    apply_eureka_binding, configure_eureka, eureka_binding_selection, DiscoverySetup, EUREKA_TAG,
};
pub use tokio_util::sync::CancellationToken;
