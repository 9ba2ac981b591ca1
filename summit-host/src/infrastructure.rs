//! Well-known infrastructure resources

use crate::error::{HostError, Result};
use crate::observer::StartupTimer;
use crate::resource::{BindMount, ContainerLifetime, ContainerSpec, Endpoint, Resource, ResourceKind};
use std::path::PathBuf;
use std::sync::Arc;
use summit_config::ConfigValidator;

/// Registry hosting the development images
pub const IMAGE_REGISTRY: &str = "steeltoe.azurecr.io";

pub const CONFIG_SERVER_IMAGE: &str = "config-server";
pub const CONFIG_SERVER_TAG: &str = "latest";
pub const CONFIG_SERVER_PORT: u16 = 8888;

pub const EUREKA_IMAGE: &str = "eureka-server";
pub const EUREKA_TAG: &str = "latest";
pub const EUREKA_PORT: u16 = 8761;

pub const SPRING_BOOT_ADMIN_IMAGE: &str = "spring-boot-admin";
pub const SPRING_BOOT_ADMIN_TAG: &str = "latest";
pub const SPRING_BOOT_ADMIN_PORT: u16 = 9099;

/// Where the configuration server reads its configuration from
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigServerSource {
    /// The sample repository baked into the image
    #[default]
    ImageDefault,
    /// A host directory served with the `native` profile
    LocalDirectory(PathBuf),
    /// A Git repository
    Git(String),
}

impl ConfigServerSource {
    /// Pick a source from two optional settings, rejecting both at once
    pub fn from_options(local_directory: Option<&str>, git_uri: Option<&str>) -> Result<Self> {
        ConfigValidator::mutually_exclusive(local_directory, git_uri, ("local_config_directory", "git_uri"))
            .map_err(|e| HostError::ConflictingConfigSource(e.to_string()))?;

        let present = |v: Option<&str>| v.map(str::trim).filter(|s| !s.is_empty()).map(String::from);
        Ok(match (present(local_directory), present(git_uri)) {
            (Some(dir), _) => Self::LocalDirectory(PathBuf::from(dir)),
            (None, Some(uri)) => Self::Git(uri),
            (None, None) => Self::ImageDefault,
        })
    }
}

fn image(name: &str, tag: &str) -> ContainerSpec {
    ContainerSpec {
        registry: Some(IMAGE_REGISTRY.to_string()),
        ..ContainerSpec::new(name, tag)
    }
}

/// Spring Cloud Config Server on port 8888
pub fn config_server(name: impl Into<String>, source: ConfigServerSource) -> Resource {
    let mut spec = image(CONFIG_SERVER_IMAGE, CONFIG_SERVER_TAG);
    let mut environment = Vec::new();

    match source {
        ConfigServerSource::LocalDirectory(dir) => {
            spec.bind_mounts.push(BindMount {
                source: dir,
                target: "/config".to_string(),
            });
            environment.push(("spring.profiles.active", "native".to_string()));
            environment.push((
                "spring.cloud.config.server.native.searchLocations",
                "file:/config".to_string(),
            ));
        }
        ConfigServerSource::Git(uri) => {
            environment.push(("spring.cloud.config.server.git.uri", uri));
        }
        ConfigServerSource::ImageDefault => {}
    }

    let mut resource = Resource::container(name, spec)
        .with_endpoint(Endpoint::http(CONFIG_SERVER_PORT))
        .with_http_health_check(format!("http://localhost:{}/actuator/health", CONFIG_SERVER_PORT))
        .with_observer(Arc::new(StartupTimer::new("ConfigServer")));

    for (key, value) in environment {
        resource = resource.with_environment(key, value);
    }
    resource
}

/// Eureka server on port 8761
pub fn eureka(name: impl Into<String>) -> Resource {
    Resource::container(name, image(EUREKA_IMAGE, EUREKA_TAG))
        .with_endpoint(Endpoint::http(EUREKA_PORT))
        .with_http_health_check(format!("http://localhost:{}", EUREKA_PORT))
        .with_observer(Arc::new(StartupTimer::new("Eureka")))
}

/// Spring Boot Admin server on port 9099
pub fn spring_boot_admin(name: impl Into<String>) -> Resource {
    Resource::container(name, image(SPRING_BOOT_ADMIN_IMAGE, SPRING_BOOT_ADMIN_TAG))
        .with_endpoint(Endpoint::http(SPRING_BOOT_ADMIN_PORT).not_proxied())
        .with_http_health_check("/")
}

impl Resource {
    /// Keep the container running after the host exits (containers only)
    pub fn with_lifetime(mut self, lifetime: ContainerLifetime) -> Self {
        if let ResourceKind::Container(spec) = &mut self.kind {
            spec.lifetime = lifetime;
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn container_spec(resource: &Resource) -> &ContainerSpec {
        match resource.kind() {
            ResourceKind::Container(spec) => spec,
            other => panic!("expected a container, got {}", other.name()),
        }
    }

    #[test]
    fn test_config_server_local_directory() {
        let resource = config_server(
            "config-server",
            ConfigServerSource::LocalDirectory(PathBuf::from("../Configuration")),
        );
        let spec = container_spec(&resource);

        assert_eq!(spec.image_reference(), "steeltoe.azurecr.io/config-server:latest");
        assert_eq!(spec.bind_mounts[0].target, "/config");
        assert_eq!(
            resource.environment().get("spring.profiles.active").map(String::as_str),
            Some("native")
        );
        assert_eq!(
            resource.health_check_url().as_deref(),
            Some("http://localhost:8888/actuator/health")
        );
        assert_eq!(resource.observers().len(), 1);
    }

    #[test]
    fn test_config_server_git() {
        let resource = config_server(
            "config-server",
            ConfigServerSource::Git("https://github.com/myorg/config.git".to_string()),
        );
        assert_eq!(
            resource
                .environment()
                .get("spring.cloud.config.server.git.uri")
                .map(String::as_str),
            Some("https://github.com/myorg/config.git")
        );
        assert!(container_spec(&resource).bind_mounts.is_empty());
    }

    #[test]
    fn test_config_source_options() {
        assert_eq!(
            ConfigServerSource::from_options(None, None).unwrap(),
            ConfigServerSource::ImageDefault
        );
        assert_eq!(
            ConfigServerSource::from_options(Some("../Configuration"), Some("  ")).unwrap(),
            ConfigServerSource::LocalDirectory(PathBuf::from("../Configuration"))
        );
        assert!(matches!(
            ConfigServerSource::from_options(Some("../Configuration"), Some("https://git")),
            Err(HostError::ConflictingConfigSource(_))
        ));
    }

    #[test]
    fn test_eureka_and_admin() {
        let registry = eureka("eureka").with_lifetime(ContainerLifetime::Persistent);
        assert_eq!(registry.health_check_url().as_deref(), Some("http://localhost:8761"));
        assert_eq!(container_spec(&registry).lifetime, ContainerLifetime::Persistent);
        assert_eq!(registry.image_tag(), Some("latest"));

        let admin = spring_boot_admin("sba");
        assert_eq!(admin.health_check_url().as_deref(), Some("http://localhost:9099/"));
        assert!(!admin.http_endpoint().unwrap().is_proxied);
        assert!(admin.observers().is_empty());
    }
}
