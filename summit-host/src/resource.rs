//! Resource model
//!
//! A [`Resource`] is something the host starts: a container image, a
//! project built from source, or a Java application. What differs between
//! them lives in [`ResourceKind`]; everything the orchestrator needs
//! (environment, references, waits, health check, observers) is shared.

use crate::observer::ResourceObserver;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// A network endpoint exposed by a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    pub scheme: String,
    /// Port on the host
    pub port: Option<u16>,
    /// Port inside the container or process
    pub target_port: Option<u16>,
    pub is_proxied: bool,
    pub is_external: bool,
}

impl Endpoint {
    pub fn http(port: u16) -> Self {
        Self {
            name: "http".to_string(),
            scheme: "http".to_string(),
            port: Some(port),
            target_port: Some(port),
            is_proxied: true,
            is_external: false,
        }
    }

    pub fn with_target_port(mut self, port: u16) -> Self {
        self.target_port = Some(port);
        self
    }

    pub fn not_proxied(mut self) -> Self {
        self.is_proxied = false;
        self
    }

    /// Local URL of the endpoint, when it has a fixed port
    pub fn url(&self) -> Option<String> {
        self.port.map(|port| format!("{}://localhost:{}", self.scheme, port))
    }
}

/// Host directory mounted into a container
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindMount {
    pub source: PathBuf,
    pub target: String,
}

/// Whether a container outlives the host process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ContainerLifetime {
    #[default]
    Session,
    Persistent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub registry: Option<String>,
    pub image: String,
    pub tag: String,
    pub bind_mounts: Vec<BindMount>,
    pub lifetime: ContainerLifetime,
}

impl ContainerSpec {
    pub fn new(image: impl Into<String>, tag: impl Into<String>) -> Self {
        Self {
            registry: None,
            image: image.into(),
            tag: tag.into(),
            bind_mounts: Vec::new(),
            lifetime: ContainerLifetime::Session,
        }
    }

    /// `registry/image:tag`
    pub fn image_reference(&self) -> String {
        match &self.registry {
            Some(registry) => format!("{}/{}:{}", registry, self.image, self.tag),
            None => format!("{}:{}", self.image, self.tag),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectSpec {
    pub project_path: PathBuf,
}

/// How a Java application is run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JavaDeployment {
    /// `java -jar` on the host
    Executable,
    /// A container image holding the application
    Container { image: String, tag: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JavaAppSpec {
    pub working_directory: PathBuf,
    /// Jar path relative to the working directory
    pub jar: String,
    pub port: u16,
    pub otel_agent_path: Option<PathBuf>,
    pub maven_build: bool,
    pub deployment: JavaDeployment,
}

/// What kind of thing a resource is
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ResourceKind {
    Container(ContainerSpec),
    Project(ProjectSpec),
    JavaApp(JavaAppSpec),
}

impl ResourceKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Container(_) => "container",
            Self::Project(_) => "project",
            Self::JavaApp(_) => "java_app",
        }
    }
}

/// Health check used to decide readiness
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheck {
    /// Absolute URL, or a path on the resource's `http` endpoint
    pub path: String,
}

/// Edits applied to the environment after references are materialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvironmentEdit {
    /// Drop every variable whose name starts with the prefix
    RemovePrefix(String),
}

/// A resource the host starts
#[derive(Clone)]
pub struct Resource {
    pub(crate) name: String,
    pub(crate) kind: ResourceKind,
    pub(crate) endpoints: Vec<Endpoint>,
    pub(crate) environment: BTreeMap<String, String>,
    pub(crate) environment_edits: Vec<EnvironmentEdit>,
    pub(crate) references: Vec<String>,
    pub(crate) wait_for: Vec<String>,
    pub(crate) health_check: Option<HealthCheck>,
    pub(crate) observers: Vec<Arc<dyn ResourceObserver>>,
}

impl Resource {
    pub fn new(name: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            name: name.into(),
            kind,
            endpoints: Vec::new(),
            environment: BTreeMap::new(),
            environment_edits: Vec::new(),
            references: Vec::new(),
            wait_for: Vec::new(),
            health_check: None,
            observers: Vec::new(),
        }
    }

    pub fn container(name: impl Into<String>, spec: ContainerSpec) -> Self {
        Self::new(name, ResourceKind::Container(spec))
    }

    pub fn project(name: impl Into<String>, project_path: impl Into<PathBuf>) -> Self {
        Self::new(
            name,
            ResourceKind::Project(ProjectSpec {
                project_path: project_path.into(),
            }),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ResourceKind {
        &self.kind
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// The endpoint named `http`, if any
    pub fn http_endpoint(&self) -> Option<&Endpoint> {
        self.endpoints.iter().find(|e| e.name == "http")
    }

    /// Variables set directly on this resource, before references
    pub fn environment(&self) -> &BTreeMap<String, String> {
        &self.environment
    }

    pub fn references(&self) -> &[String] {
        &self.references
    }

    /// Resources that must be ready before this one starts
    pub fn waits_for(&self) -> &[String] {
        &self.wait_for
    }

    pub fn health_check(&self) -> Option<&HealthCheck> {
        self.health_check.as_ref()
    }

    /// URL polled for readiness
    ///
    /// Relative paths are resolved against the `http` endpoint; `None` when
    /// there is no health check or nothing to resolve it against.
    pub fn health_check_url(&self) -> Option<String> {
        let check = self.health_check.as_ref()?;
        if check.path.starts_with("http://") || check.path.starts_with("https://") {
            return Some(check.path.clone());
        }

        let base = self.http_endpoint()?.url()?;
        if check.path.starts_with('/') {
            Some(format!("{}{}", base, check.path))
        } else {
            Some(format!("{}/{}", base, check.path))
        }
    }

    /// Image tag of a container, used to label startup timings
    pub fn image_tag(&self) -> Option<&str> {
        match &self.kind {
            ResourceKind::Container(spec) => Some(&spec.tag),
            ResourceKind::JavaApp(JavaAppSpec {
                deployment: JavaDeployment::Container { tag, .. },
                ..
            }) => Some(tag),
            _ => None,
        }
    }

    pub fn observers(&self) -> &[Arc<dyn ResourceObserver>] {
        &self.observers
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("endpoints", &self.endpoints)
            .field("environment", &self.environment)
            .field("references", &self.references)
            .field("wait_for", &self.wait_for)
            .field("health_check", &self.health_check)
            .field("observers", &self.observers.len())
            .finish()
    }
}
