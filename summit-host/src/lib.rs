//! Resource Model and Startup Orchestration for Summit
//!
//! Describe a topology of containers, projects and Java applications, wire
//! them together, and start them so that nothing launches before the
//! resources it waits for are ready.
//!
//! ## Features
//!
//! - **Resource model** - Containers, projects and Java applications with
//!   endpoints, environment, references and health checks
//! - **Wiring helpers** - Registry registration, registry-only references,
//!   management endpoints and the admin server
//! - **Infrastructure** - Config server, Eureka server and admin server
//!   containers with startup timing
//! - **Orchestration** - Concurrent startup gated on wait-for dependencies,
//!   cooperative cancellation and a per-resource report
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use summit_host::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let model = demo_topology()?;
//!     let orchestrator = Orchestrator::new(model)
//!         .with_startup_timeout(std::time::Duration::from_secs(300));
//!
//!     let report = orchestrator
//!         .run(&DryRunLauncher, &CancellationToken::new())
//!         .await?;
//!
//!     if let Some(error) = report.first_error() {
//!         eprintln!("{}", error);
//!     }
//!     Ok(())
//! }
//! ```

pub mod demo;
pub mod error;
pub mod graph;
pub mod infrastructure;
pub mod model;
pub mod observer;
pub mod orchestrator;
pub mod probe;
pub mod report;
pub mod resource;
pub mod state;
pub mod wiring;

pub use demo::{demo_topology, demo_topology_on, demo_topology_with, DemoPorts, DEFAULT_CONFIG_DIRECTORY};
pub use error::{HostError, Result};
pub use graph::ResourceDependencyGraph;
pub use infrastructure::{
    config_server, eureka, spring_boot_admin, ConfigServerSource, CONFIG_SERVER_PORT, EUREKA_PORT,
    IMAGE_REGISTRY, SPRING_BOOT_ADMIN_PORT,
};
pub use model::{AppModel, AppModelBuilder};
pub use observer::{ResourceEvent, ResourceObserver, StartupTimer};
pub use orchestrator::Orchestrator;
pub use probe::{DryRunLauncher, HttpReadinessProbe, ImmediateProbe, ReadinessProbe, ResourceLauncher};
pub use report::{BlockCause, ResourceReport, StartupOutcome, StartupReport};
pub use resource::{
    BindMount, ContainerLifetime, ContainerSpec, Endpoint, EnvironmentEdit, HealthCheck,
    JavaAppSpec, JavaDeployment, ProjectSpec, Resource, ResourceKind,
};
pub use state::ResourceState;
pub use tokio_util::sync::CancellationToken;
pub use wiring::{JavaAppOptions, DEFAULT_ADMIN_CLIENT_HOST, SPRING_BOOT_ADMIN_URL};
