//! Eureka registry read client

use crate::service::{DiscoveryError, InstanceStatus, RegistryClient, ServiceInstance};
use crate::settings::EurekaClientOptions;
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

/// Target of request and response events
pub const HTTP_TARGET: &str = "summit_discovery::eureka::http";

/// Target of access token events
pub const TOKEN_TARGET: &str = "summit_discovery::eureka::token";

/// Reads application instances from a Eureka server
///
/// Only the read side of the protocol is implemented. Registration and
/// heartbeats belong to the registry client library of the application.
///
/// ```rust,ignore
/// use summit_discovery::*;
///
/// let client = EurekaRegistryClient::new("http://localhost:8761/eureka/")?;
/// let instances = client.get_instances("apiservice", &CancellationToken::new()).await?;
/// ```
#[derive(Debug, Clone)]
pub struct EurekaRegistryClient {
    base_url: String,
    client: reqwest::Client,
    include_all_statuses: bool,
    bearer_token: Option<String>,
}

impl EurekaRegistryClient {
    /// Create new Eureka client for a server URL such as `http://host:8761/eureka/`
    pub fn new(base_url: impl Into<String>) -> Result<Self, DiscoveryError> {
        let base_url = base_url.into();
        url::Url::parse(&base_url).map_err(|e| {
            DiscoveryError::InvalidConfiguration(format!("Invalid Eureka server URL '{}': {}", base_url, e))
        })?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            include_all_statuses: false,
            bearer_token: None,
        })
    }

    pub fn from_options(options: &EurekaClientOptions) -> Result<Self, DiscoveryError> {
        Self::new(options.service_url.clone())
    }

    /// Also return instances that are not `UP`
    pub fn include_all_statuses(mut self, include: bool) -> Self {
        self.include_all_statuses = include;
        self
    }

    /// Send a previously obtained access token with every request
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch(&self, service_name: &str) -> Result<Vec<ServiceInstance>, DiscoveryError> {
        let url = format!("{}/apps/{}", self.base_url, service_name.to_uppercase());

        let mut request = self.client.get(&url).header(ACCEPT, "application/json");
        if let Some(token) = &self.bearer_token {
            debug!(target: TOKEN_TARGET, service = service_name, "Attaching access token to registry request");
            request = request.bearer_auth(token);
        }

        trace!(target: HTTP_TARGET, %url, "Sending registry request");
        let response = request.send().await?;
        debug!(target: HTTP_TARGET, %url, status = response.status().as_u16(), "Registry responded");

        if response.status() == StatusCode::NOT_FOUND {
            debug!(service = service_name, "Application not registered in Eureka");
            return Ok(Vec::new());
        }

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(DiscoveryError::RegistryResponse { status, body });
        }

        let payload: ApplicationResponse = response.json().await?;

        let instances: Vec<ServiceInstance> = payload
            .application
            .instance
            .into_vec()
            .into_iter()
            .map(|info| info.into_instance(service_name))
            .filter(|instance| self.include_all_statuses || instance.status == InstanceStatus::Up)
            .collect();

        debug!(
            "Fetched {} instances of service {} from Eureka",
            instances.len(),
            service_name
        );
        Ok(instances)
    }
}

#[async_trait]
impl RegistryClient for EurekaRegistryClient {
    async fn get_instances(
        &self,
        service_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ServiceInstance>, DiscoveryError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DiscoveryError::Cancelled),
            result = self.fetch(service_name) => result,
        }
    }

    fn describe(&self) -> &str {
        "Eureka"
    }
}

#[derive(Deserialize)]
struct ApplicationResponse {
    application: Application,
}

#[derive(Deserialize)]
struct Application {
    #[serde(default)]
    instance: OneOrMany<InstanceInfo>,
}

/// Eureka collapses single-element arrays into a bare object
#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Self::Many(items) => items,
            Self::One(item) => vec![item],
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceInfo {
    instance_id: Option<String>,
    host_name: String,
    #[serde(default)]
    status: Option<String>,
    port: Option<PortInfo>,
    secure_port: Option<PortInfo>,
    #[serde(default)]
    metadata: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct PortInfo {
    #[serde(rename = "$")]
    port: Value,
    #[serde(rename = "@enabled", default)]
    enabled: Value,
}

impl PortInfo {
    fn enabled_port(&self) -> Option<u16> {
        let enabled = match &self.enabled {
            Value::Bool(b) => *b,
            Value::String(s) => s.eq_ignore_ascii_case("true"),
            _ => false,
        };
        if !enabled {
            return None;
        }

        match &self.port {
            Value::Number(n) => n.as_u64().and_then(|p| u16::try_from(p).ok()),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
    }
}

impl InstanceInfo {
    fn into_instance(self, service_name: &str) -> ServiceInstance {
        let instance_id = self
            .instance_id
            .unwrap_or_else(|| self.host_name.clone());

        let mut instance = ServiceInstance::new(instance_id, service_name).with_status(
            self.status
                .as_deref()
                .map(InstanceStatus::parse)
                .unwrap_or_default(),
        );

        if let Some(port) = self.secure_port.as_ref().and_then(PortInfo::enabled_port) {
            instance = instance.with_secure_uri(format!("https://{}:{}/", self.host_name, port));
        }
        if let Some(port) = self.port.as_ref().and_then(PortInfo::enabled_port) {
            instance = instance.with_non_secure_uri(format!("http://{}:{}/", self.host_name, port));
        }

        for (key, value) in self.metadata {
            if let Value::String(value) = value {
                instance = instance.with_metadata(key, value);
            }
        }

        instance
    }
}
