// Summit - service discovery and dependency-ordered startup for microservices
//
// This library ties together endpoint resolution against a service registry,
// platform credential bindings, and a resource orchestrator that starts a
// topology in readiness order.

// Re-export the ambient crates
pub use summit_config;
pub use summit_log;

// Re-export optional crates
#[cfg(feature = "bindings")]
pub use summit_bindings;

#[cfg(feature = "discovery")]
pub use summit_discovery;

#[cfg(feature = "host")]
pub use summit_host;

pub use tokio_util::sync::CancellationToken;

// Prelude for common imports
pub mod prelude {
    pub use crate::CancellationToken;
    pub use summit_config::{ConfigManager, Validate};
    pub use summit_log::{Level, LogConfig};

    #[cfg(feature = "bindings")]
    pub use summit_bindings::{BindingResolver, BindingSelection, ServiceBinding};

    #[cfg(feature = "discovery")]
    pub use summit_discovery::{
        DiscoveryError, DiscoveryOptions, DiscoverySettings, DiscoverySetup,
        EndpointProviderFactory, InMemoryRegistry, RegistryClient, ResolvedEndpoint,
        ServiceInstance,
    };

    #[cfg(feature = "host")]
    pub use summit_host::{
        AppModel, HostError, Orchestrator, Resource, ResourceObserver, ResourceState,
        StartupOutcome, StartupReport,
    };
}
