//! Integration tests for common Summit workflows.
//!
//! These tests verify that the crates fit together the way an application
//! wires them: configuration into discovery, platform bindings into the
//! registry client, and the sample topology through the orchestrator.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use summit::prelude::*;
use summit_bindings::{HostEnvironment, StaticCredentialsSource};
use summit_discovery::eureka::{HTTP_TARGET, TOKEN_TARGET};
use summit_discovery::{
    eureka_binding_selection, AllowedSchemes, EndpointAddress, EurekaRegistryClient, RegistryClient,
};
use summit_host::{demo_topology, BlockCause, DryRunLauncher, ImmediateProbe, ResourceLauncher};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::prelude::*;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn eureka_instance(id: &str, port: u16, secure: bool) -> serde_json::Value {
    json!({
        "instanceId": id,
        "hostName": "localhost",
        "app": "APISERVICE",
        "status": "UP",
        "port": { "$": port, "@enabled": "true" },
        "securePort": { "$": port + 1000, "@enabled": secure.to_string() },
        "metadata": {}
    })
}

async fn eureka_server() -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/eureka/apps/APISERVICE"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "application": {
                "name": "APISERVICE",
                "instance": [
                    eureka_instance("api-1", 5001, true),
                    eureka_instance("api-2", 5002, false)
                ]
            }
        })))
        .mount(&server)
        .await;
    server
}

// =============================================================================
// Discovery Tests
// =============================================================================

#[tokio::test]
async fn test_configuration_to_endpoints() {
    let server = eureka_server().await;

    let config = ConfigManager::new();
    config.load_vars([
        ("Discovery__Discover", "true".to_string()),
        ("Discovery__RefreshPeriod", "00:00:45".to_string()),
        ("Eureka__Client__ServiceUrl", format!("{}/eureka/", server.uri())),
    ]);

    let settings = DiscoverySettings::from_config(&config).unwrap();
    assert_eq!(settings.refresh_period, Duration::from_secs(45));

    let mut setup = DiscoverySetup::from_settings(&settings);
    setup.add_eureka_service_discovery(settings.register, settings.discover, |_| {});

    // The refresh period wins over the default fetch interval
    assert_eq!(setup.eureka_options().unwrap().registry_fetch_interval_seconds, 45);

    let factory = setup.provider_factory().unwrap();
    let endpoints = factory
        .resolve("https+http://apiservice", &CancellationToken::new())
        .await
        .unwrap();

    // Only api-1 has a secure port, and https is preferred
    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0].url(), "https://localhost:6001");
}

#[tokio::test]
async fn test_allowed_schemes_restrict_resolution() {
    let registry = InMemoryRegistry::new();
    registry
        .register(
            ServiceInstance::new("api-1", "apiservice")
                .with_secure_uri("https://10.0.0.5:6001/")
                .with_non_secure_uri("http://10.0.0.5:5001/"),
        )
        .await;

    let options = DiscoveryOptions::default().with_allowed_schemes(AllowedSchemes::only(["http"]));
    let factory = EndpointProviderFactory::new(Arc::new(registry), options);

    let endpoints = factory
        .resolve("https+http://apiservice", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(endpoints.len(), 1);
    assert_eq!(endpoints[0].scheme, "http");
    assert_eq!(endpoints[0].address, EndpointAddress::parse("http://10.0.0.5:5001").unwrap());
}

#[tokio::test]
async fn test_disabled_discovery_resolves_nothing() {
    let setup = DiscoverySetup::default();
    let factory = setup.provider_factory().unwrap();

    assert!(!factory.is_enabled());
    let endpoints = factory
        .resolve("http://apiservice", &CancellationToken::new())
        .await
        .unwrap();
    assert!(endpoints.is_empty());
}

#[tokio::test]
async fn test_unavailable_registry_surfaces_error() {
    let registry = InMemoryRegistry::new();
    registry.set_unavailable(true);

    let factory = EndpointProviderFactory::new(Arc::new(registry), DiscoveryOptions::default());
    let err = factory
        .resolve("http://apiservice", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_unavailable());
}

// =============================================================================
// Binding Tests
// =============================================================================

const VCAP_SERVICES: &str = r#"{
    "p-service-registry": [{
        "name": "registry",
        "label": "p-service-registry",
        "tags": ["eureka"],
        "credentials": {
            "uri": "https://eureka.example.com",
            "client_id": "app-client",
            "client_secret": "s3cr3t",
            "access_token_uri": "https://uaa.example.com/oauth/token"
        }
    }]
}"#;

#[test]
fn test_binding_configures_registry_client() {
    let resolver = BindingResolver::new(
        Arc::new(StaticCredentialsSource::platform(VCAP_SERVICES)),
        HostEnvironment::Production,
    );

    let mut setup = DiscoverySetup::default();
    setup.add_eureka_service_discovery(true, true, |_| {});

    let mut seen = None;
    let applied = setup
        .configure_from_binding(&resolver, &eureka_binding_selection(None), |_, binding| {
            seen = Some(binding.name.clone());
        })
        .unwrap();

    assert!(applied);
    assert_eq!(seen.as_deref(), Some("registry"));

    let options = setup.eureka_options().unwrap();
    assert_eq!(options.service_url, "https://eureka.example.com/eureka/");
    assert_eq!(options.client_id.as_deref(), Some("app-client"));
    assert_eq!(
        options.access_token_uri.as_deref(),
        Some("https://uaa.example.com/oauth/token")
    );
    assert!(setup.provider_factory().unwrap().is_enabled());
}

#[test]
fn test_off_platform_leaves_options_untouched() {
    let resolver = BindingResolver::new(
        Arc::new(StaticCredentialsSource::off_platform()),
        HostEnvironment::Development,
    );

    let mut setup = DiscoverySetup::default();
    setup.add_eureka_service_discovery(false, true, |_| {});

    let applied = setup
        .configure_from_binding(&resolver, &eureka_binding_selection(None), |_, _| {})
        .unwrap();

    assert!(!applied);
    assert_eq!(
        setup.eureka_options().unwrap().service_url,
        summit_discovery::DEFAULT_EUREKA_SERVER_URL
    );
}

// =============================================================================
// Orchestration Tests
// =============================================================================

#[derive(Default)]
struct RecordingLauncher {
    launched: Mutex<Vec<(String, BTreeMap<String, String>)>>,
    failing: Option<&'static str>,
}

#[async_trait]
impl ResourceLauncher for RecordingLauncher {
    async fn launch(
        &self,
        resource: &Resource,
        environment: &BTreeMap<String, String>,
        _cancel: &CancellationToken,
    ) -> Result<(), HostError> {
        self.launched
            .lock()
            .push((resource.name().to_string(), environment.clone()));
        match self.failing {
            Some(name) if name == resource.name() => {
                Err(HostError::failed(name, "image pull failed"))
            }
            _ => Ok(()),
        }
    }
}

#[tokio::test]
async fn test_demo_topology_starts() {
    let orchestrator = Orchestrator::new(demo_topology().unwrap()).with_probe(Arc::new(ImmediateProbe));

    let report = orchestrator
        .run(&DryRunLauncher, &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.resources.len(), 6);
    for resource in &report.resources {
        assert_eq!(orchestrator.state(&resource.name), Some(ResourceState::Ready));
    }
}

#[tokio::test]
async fn test_demo_applications_launch_after_infrastructure() {
    let orchestrator = Orchestrator::new(demo_topology().unwrap()).with_probe(Arc::new(ImmediateProbe));
    let launcher = RecordingLauncher::default();

    orchestrator.run(&launcher, &CancellationToken::new()).await.unwrap();

    let launched = launcher.launched.lock();
    let position = |name: &str| launched.iter().position(|(n, _)| n == name).unwrap();
    for app in ["apiservice", "springapp"] {
        for infrastructure in ["config-server", "eureka", "sba"] {
            assert!(position(infrastructure) < position(app));
        }
    }

    let (_, frontend_env) = &launched[position("webfrontend")];
    assert!(!frontend_env.keys().any(|k| k.starts_with("services__apiservice__")));
}

#[tokio::test]
async fn test_failed_infrastructure_blocks_applications() {
    let orchestrator = Orchestrator::new(demo_topology().unwrap()).with_probe(Arc::new(ImmediateProbe));
    let launcher = RecordingLauncher {
        failing: Some("config-server"),
        ..Default::default()
    };

    let report = orchestrator.run(&launcher, &CancellationToken::new()).await.unwrap();

    assert_eq!(orchestrator.state("config-server"), Some(ResourceState::Failed));
    for app in ["apiservice", "springapp"] {
        match report.outcome(app) {
            Some(StartupOutcome::Blocked { cause, waiting_on }) => {
                assert_eq!(
                    cause,
                    &BlockCause::UpstreamFailed {
                        upstream: "config-server".to_string()
                    }
                );
                assert!(waiting_on.contains(&"config-server".to_string()));
            }
            other => panic!("unexpected outcome for {}: {:?}", app, other),
        }
        assert_eq!(orchestrator.state(app), Some(ResourceState::Starting));
    }

    // Nothing waits for the frontend's references
    assert!(report.get("webfrontend").unwrap().is_ready());
    assert!(report.first_error().is_some());
}

// =============================================================================
// Logging Tests
// =============================================================================

#[test]
fn test_log_config_silences_registry_client() {
    let config = LogConfig::from_lookup(|key| match key {
        "SUMMIT_LOG_LEVEL" => Some("debug".to_string()),
        _ => None,
    })
    .suppress_all(summit_log::registry_client_targets());

    assert_eq!(config.effective_level(), Level::Debug);
    assert!(config.env_filter().is_ok());

    let _guard = summit_log::bootstrap(Level::Warn).unwrap();
    tracing::warn!("bootstrap logging is active");
}

#[derive(Clone, Default)]
struct CapturedTargets(Arc<Mutex<Vec<String>>>);

impl<S: tracing::Subscriber> Layer<S> for CapturedTargets {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        self.0.lock().push(event.metadata().target().to_string());
    }
}

/// Targets of the events seen while fetching from a registry under `config`
async fn registry_event_targets(config: &LogConfig) -> Vec<String> {
    let server = eureka_server().await;
    let captured = CapturedTargets::default();
    let subscriber = tracing_subscriber::registry()
        .with(config.env_filter().unwrap())
        .with(captured.clone());

    let guard = tracing::subscriber::set_default(subscriber);
    let client = EurekaRegistryClient::new(format!("{}/eureka/", server.uri()))
        .unwrap()
        .with_bearer_token("access-token");
    let instances = client
        .get_instances("apiservice", &CancellationToken::new())
        .await
        .unwrap();
    drop(guard);

    assert_eq!(instances.len(), 2);
    let targets = captured.0.lock().clone();
    targets
}

#[tokio::test]
async fn test_registry_client_events_are_suppressed() {
    let verbose = LogConfig::default().with_level(Level::Trace);
    let targets = registry_event_targets(&verbose).await;
    assert!(targets.iter().any(|t| t == HTTP_TARGET));
    assert!(targets.iter().any(|t| t == TOKEN_TARGET));

    let quiet = verbose.suppress_all(summit_log::registry_client_targets());
    let targets = registry_event_targets(&quiet).await;
    assert!(!targets.iter().any(|t| t == HTTP_TARGET || t == TOKEN_TARGET));
    assert!(targets.iter().any(|t| t == "summit_discovery::eureka"));
}
