//! The sample topology: shared infrastructure plus three applications

use crate::error::Result;
use crate::infrastructure::{config_server, eureka, spring_boot_admin, ConfigServerSource};
use crate::model::AppModel;
use crate::resource::{ContainerLifetime, Resource};
use crate::wiring::JavaAppOptions;
use std::path::PathBuf;

pub const CONFIG_SERVER: &str = "config-server";
pub const EUREKA_SERVER: &str = "eureka";
pub const SPRING_BOOT_ADMIN: &str = "sba";
pub const API_SERVICE: &str = "apiservice";
pub const SPRING_API_SERVICE: &str = "springapp";
pub const WEB_FRONTEND: &str = "webfrontend";

/// Directory served by the configuration server
pub const DEFAULT_CONFIG_DIRECTORY: &str = "../Configuration";

/// Local ports of the two projects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DemoPorts {
    pub api_service: u16,
    pub web_frontend: u16,
}

impl Default for DemoPorts {
    fn default() -> Self {
        Self {
            api_service: 5001,
            web_frontend: 5002,
        }
    }
}

/// The sample topology with configuration read from [`DEFAULT_CONFIG_DIRECTORY`]
pub fn demo_topology() -> Result<AppModel> {
    demo_topology_with(ConfigServerSource::LocalDirectory(PathBuf::from(
        DEFAULT_CONFIG_DIRECTORY,
    )))
}

/// The sample topology with an explicit configuration source
///
/// Both applications wait for all three infrastructure containers, and the
/// web frontend finds them through the registry rather than by direct
/// reference.
pub fn demo_topology_with(config_source: ConfigServerSource) -> Result<AppModel> {
    demo_topology_on(config_source, DemoPorts::default())
}

/// [`demo_topology_with`] with the projects listening on `ports`
pub fn demo_topology_on(config_source: ConfigServerSource, ports: DemoPorts) -> Result<AppModel> {
    let infrastructure = [CONFIG_SERVER, EUREKA_SERVER, SPRING_BOOT_ADMIN];

    let api = infrastructure.iter().fold(
        Resource::project(API_SERVICE, "../ApiService")
            .with_http_endpoint(ports.api_service)
            .with_http_health_check("/health")
            .with_eureka_registration(Some("localhost"), false),
        |resource, upstream| resource.wait_for(*upstream),
    );

    let spring = infrastructure.iter().fold(
        Resource::java_app(
            SPRING_API_SERVICE,
            "../SpringApiService",
            JavaAppOptions {
                jar: "target/SpringApiService-0.0.1-SNAPSHOT.jar".to_string(),
                port: 8081,
                otel_agent_path: Some(PathBuf::from("../agents")),
            },
        )
        .with_maven_build(),
        |resource, upstream| resource.wait_for(*upstream),
    );

    AppModel::builder()
        .with(config_server(CONFIG_SERVER, config_source).with_lifetime(ContainerLifetime::Persistent))
        .with(eureka(EUREKA_SERVER).with_lifetime(ContainerLifetime::Persistent))
        .with(spring_boot_admin(SPRING_BOOT_ADMIN))
        .with(api.with_actuators())
        .with(spring.with_actuators())
        .with(
            Resource::project(WEB_FRONTEND, "../Web")
                .with_http_endpoint(ports.web_frontend)
                .with_external_http_endpoints()
                .with_http_health_check("/health")
                .with_eureka_reference(API_SERVICE)
                .with_eureka_reference(SPRING_API_SERVICE)
                .with_actuators(),
        )
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{HttpReadinessProbe, ReadinessProbe};
    use crate::resource::ResourceKind;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_infrastructure_starts_first() {
        let model = demo_topology().unwrap();
        let order = model.graph().startup_order();

        let position = |name: &str| order.iter().position(|n| n == name).unwrap();
        for app in [API_SERVICE, SPRING_API_SERVICE] {
            for upstream in [CONFIG_SERVER, EUREKA_SERVER, SPRING_BOOT_ADMIN] {
                assert!(position(upstream) < position(app));
            }
        }
        assert_eq!(model.graph().dependencies_of(WEB_FRONTEND), &[] as &[String]);
    }

    #[test]
    fn test_config_server_serves_local_directory() {
        let model = demo_topology().unwrap();
        let config = model.resource(CONFIG_SERVER).unwrap();

        assert_eq!(
            config.environment().get("spring.profiles.active").map(String::as_str),
            Some("native")
        );
        match config.kind() {
            ResourceKind::Container(spec) => {
                assert_eq!(spec.lifetime, ContainerLifetime::Persistent);
                assert_eq!(spec.bind_mounts.len(), 1);
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_frontend_resolves_through_registry() {
        let model = demo_topology().unwrap();
        let env = model.environment(WEB_FRONTEND).unwrap();

        assert_eq!(
            env.get("Eureka__Client__RegistryFetchIntervalSeconds").map(String::as_str),
            Some("3")
        );
        assert!(!env.keys().any(|k| k.starts_with("services__apiservice__")));
        assert!(!env.keys().any(|k| k.starts_with("services__springapp__")));
    }

    #[test]
    fn test_git_source() {
        let model =
            demo_topology_with(ConfigServerSource::Git("https://example.com/config.git".to_string()))
                .unwrap();
        assert_eq!(model.resources().len(), 6);
    }

    #[test]
    fn test_every_health_check_resolves() {
        let model = demo_topology().unwrap();
        for resource in model.resources() {
            if resource.health_check().is_some() {
                assert!(resource.health_check_url().is_some(), "{} has no health url", resource.name());
            }
        }

        let web = model.resource(WEB_FRONTEND).unwrap();
        assert_eq!(web.health_check_url().as_deref(), Some("http://localhost:5002/health"));
        assert!(web.http_endpoint().unwrap().is_external);
        assert!(!model.resource(API_SERVICE).unwrap().http_endpoint().unwrap().is_external);
    }

    #[tokio::test]
    async fn test_projects_become_ready_over_http() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let port = server.address().port();
        let model = demo_topology_on(
            ConfigServerSource::LocalDirectory(PathBuf::from(DEFAULT_CONFIG_DIRECTORY)),
            DemoPorts {
                api_service: port,
                web_frontend: port,
            },
        )
        .unwrap();

        let probe = HttpReadinessProbe::new().with_max_attempts(1);
        for name in [API_SERVICE, WEB_FRONTEND] {
            probe
                .wait_until_ready(model.resource(name).unwrap(), &CancellationToken::new())
                .await
                .unwrap();
        }
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
    }
}
