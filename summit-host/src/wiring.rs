//! Builder methods that wire resources together
//!
//! Helpers that depend on the kind of resource match on [`ResourceKind`];
//! projects use `__` as the configuration section separator and Java
//! applications use `_`.

use crate::observer::ResourceObserver;
use crate::resource::{
    Endpoint, EnvironmentEdit, HealthCheck, JavaAppSpec, JavaDeployment, Resource, ResourceKind,
};
use std::path::PathBuf;
use std::sync::Arc;

/// Default host name the admin server uses to reach applications
pub const DEFAULT_ADMIN_CLIENT_HOST: &str = "host.docker.internal";

/// Address of the admin server started by [`spring_boot_admin`](crate::spring_boot_admin)
pub const SPRING_BOOT_ADMIN_URL: &str = "http://localhost:9099";

/// Seconds between lease renewals and until expiry, short enough that a
/// stopped instance disappears from the registry quickly
const LEASE_RENEWAL_INTERVAL_SECONDS: &str = "3";
const LEASE_EXPIRATION_DURATION_SECONDS: &str = "9";
const REGISTRY_FETCH_INTERVAL_SECONDS: &str = "3";

/// Options for [`Resource::java_app`]
#[derive(Debug, Clone)]
pub struct JavaAppOptions {
    pub jar: String,
    pub port: u16,
    pub otel_agent_path: Option<PathBuf>,
}

impl Resource {
    /// A Java application run from a jar in `working_directory`
    pub fn java_app(
        name: impl Into<String>,
        working_directory: impl Into<PathBuf>,
        options: JavaAppOptions,
    ) -> Self {
        let port = options.port;
        let mut resource = Self::new(
            name,
            ResourceKind::JavaApp(JavaAppSpec {
                working_directory: working_directory.into(),
                jar: options.jar,
                port,
                otel_agent_path: options.otel_agent_path,
                maven_build: false,
                deployment: JavaDeployment::Executable,
            }),
        );
        resource.endpoints.push(Endpoint::http(port));
        resource.environment.insert("SERVER_PORT".to_string(), port.to_string());
        resource
    }

    /// Build the jar with Maven before starting (Java applications only)
    pub fn with_maven_build(mut self) -> Self {
        if let ResourceKind::JavaApp(spec) = &mut self.kind {
            spec.maven_build = true;
        }
        self
    }

    pub fn with_environment(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.environment.insert(key.into(), value.into());
        self
    }

    pub fn with_endpoint(mut self, endpoint: Endpoint) -> Self {
        self.endpoints.retain(|e| e.name != endpoint.name);
        self.endpoints.push(endpoint);
        self
    }

    pub fn with_http_endpoint(self, port: u16) -> Self {
        self.with_endpoint(Endpoint::http(port))
    }

    /// Expose every http endpoint outside the host
    pub fn with_external_http_endpoints(mut self) -> Self {
        for endpoint in self.endpoints.iter_mut().filter(|e| e.scheme.starts_with("http")) {
            endpoint.is_external = true;
        }
        self
    }

    /// Poll `path` (absolute URL or path on the `http` endpoint) for readiness
    pub fn with_http_health_check(mut self, path: impl Into<String>) -> Self {
        self.health_check = Some(HealthCheck { path: path.into() });
        self
    }

    /// Inject the endpoints of `source` as `services__{source}__{endpoint}__0`
    pub fn with_reference(mut self, source: impl Into<String>) -> Self {
        let source = source.into();
        if !self.references.contains(&source) {
            self.references.push(source);
        }
        self
    }

    /// Hold this resource in `Starting` until `upstream` is ready
    pub fn wait_for(mut self, upstream: impl Into<String>) -> Self {
        let upstream = upstream.into();
        if !self.wait_for.contains(&upstream) {
            self.wait_for.push(upstream);
        }
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn ResourceObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Register this application in the registry under `host_name`
    ///
    /// With `resource_name_as_app_name` the resource name becomes the
    /// registered application name. Containers are left unchanged.
    pub fn with_eureka_registration(mut self, host_name: Option<&str>, resource_name_as_app_name: bool) -> Self {
        let separator = match self.kind {
            ResourceKind::Project(_) => "__",
            ResourceKind::JavaApp(_) => "_",
            ResourceKind::Container(_) => return self,
        };
        let key = |setting: &str| ["Eureka", "Instance", setting].join(separator);

        if let Some(host_name) = host_name {
            self.environment.insert(key("HostName"), host_name.to_string());
        }
        if resource_name_as_app_name {
            self.environment.insert(key("AppName"), self.name.clone());
        }
        self.environment.insert(
            key("LeaseRenewalIntervalInSeconds"),
            LEASE_RENEWAL_INTERVAL_SECONDS.to_string(),
        );
        self.environment.insert(
            key("LeaseExpirationDurationInSeconds"),
            LEASE_EXPIRATION_DURATION_SECONDS.to_string(),
        );
        self
    }

    /// Reference `source` but resolve it through the registry
    ///
    /// The direct `services__{source}__*` variables a reference would inject
    /// are removed, so lookups cannot bypass the registry.
    pub fn with_eureka_reference(self, source: impl Into<String>) -> Self {
        let source = source.into();
        let prefix = format!("services__{}__", source);

        let mut resource = self.with_reference(source).with_environment(
            "Eureka__Client__RegistryFetchIntervalSeconds",
            REGISTRY_FETCH_INTERVAL_SECONDS,
        );
        resource
            .environment_edits
            .push(EnvironmentEdit::RemovePrefix(prefix));
        resource
    }

    /// Expose management endpoints and register with the admin server
    pub fn with_actuators(self) -> Self {
        self.with_actuators_for(DEFAULT_ADMIN_CLIENT_HOST)
    }

    /// [`with_actuators`](Self::with_actuators) with the host name the admin
    /// server uses to reach this application
    pub fn with_actuators_for(self, admin_client_host: &str) -> Self {
        match self.kind {
            ResourceKind::Project(_) => self
                .with_environment("MANAGEMENT__ENDPOINTS__ACTUATOR__EXPOSURE__INCLUDE__0", "*")
                .with_environment("MANAGEMENT__ENDPOINTS__HEALTH__SHOWCOMPONENTS", "Always")
                .with_environment("MANAGEMENT__ENDPOINTS__HEALTH__SHOWDETAILS", "Always")
                .with_environment("MANAGEMENT__ENDPOINTS__HEALTH__LIVENESS__ENABLED", "true")
                .with_environment("MANAGEMENT__ENDPOINTS__HEALTH__READINESS__ENABLED", "true")
                .with_environment("SPRING__BOOT__ADMIN__CLIENT__BASEHOST", admin_client_host)
                .with_environment("SPRING__BOOT__ADMIN__CLIENT__BASESCHEME", "http")
                .with_environment("SPRING__BOOT__ADMIN__CLIENT__URL", SPRING_BOOT_ADMIN_URL),
            ResourceKind::JavaApp(_) => {
                let port = self.endpoints.first().and_then(|e| e.port);
                let resource = self
                    .with_environment("MANAGEMENT_ENDPOINTS_WEB_EXPOSURE_INCLUDE", "*")
                    .with_environment("MANAGEMENT_ENDPOINT_HEALTH_SHOW-COMPONENTS", "always")
                    .with_environment("MANAGEMENT_ENDPOINT_HEALTH_SHOW-DETAILS", "always")
                    .with_environment("SPRING_BOOT_ADMIN_CLIENT_URL", SPRING_BOOT_ADMIN_URL);
                match port {
                    Some(port) => resource.with_environment(
                        "SPRING_BOOT_ADMIN_CLIENT_INSTANCE_MANAGEMENT-BASE-URL",
                        format!("http://{}:{}", admin_client_host, port),
                    ),
                    None => resource,
                }
            }
            ResourceKind::Container(_) => self,
        }
    }
}
