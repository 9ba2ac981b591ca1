//! Readiness probes and resource launchers

use crate::error::{HostError, Result};
use crate::resource::Resource;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

/// Target of per-request health polling events
pub const PROBE_HTTP_TARGET: &str = "summit_host::probe::http";

/// Starts the process or container behind a resource
#[async_trait]
pub trait ResourceLauncher: Send + Sync {
    /// Start `resource` with its materialized environment
    ///
    /// Returns once the resource has been started, not once it is ready.
    async fn launch(
        &self,
        resource: &Resource,
        environment: &BTreeMap<String, String>,
        cancel: &CancellationToken,
    ) -> Result<()>;
}

/// Launcher that only logs what would be started
#[derive(Debug, Clone, Copy, Default)]
pub struct DryRunLauncher;

#[async_trait]
impl ResourceLauncher for DryRunLauncher {
    async fn launch(
        &self,
        resource: &Resource,
        environment: &BTreeMap<String, String>,
        _cancel: &CancellationToken,
    ) -> Result<()> {
        info!(
            resource = resource.name(),
            kind = resource.kind().name(),
            variables = environment.len(),
            "Would start resource"
        );
        Ok(())
    }
}

/// Decides when a launched resource is ready
#[async_trait]
pub trait ReadinessProbe: Send + Sync {
    /// Wait until `resource` is ready
    ///
    /// Must return [`HostError::Cancelled`] promptly once `cancel` fires.
    async fn wait_until_ready(&self, resource: &Resource, cancel: &CancellationToken) -> Result<()>;
}

/// Treats every resource as ready as soon as it is launched
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateProbe;

#[async_trait]
impl ReadinessProbe for ImmediateProbe {
    async fn wait_until_ready(&self, _resource: &Resource, _cancel: &CancellationToken) -> Result<()> {
        Ok(())
    }
}

/// Polls a resource's HTTP health check until it answers with a success status
#[derive(Debug, Clone)]
pub struct HttpReadinessProbe {
    client: reqwest::Client,
    interval: Duration,
    max_attempts: Option<u32>,
}

impl HttpReadinessProbe {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            interval: Duration::from_secs(1),
            max_attempts: None,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Give up after this many unsuccessful polls
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    async fn is_healthy(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(response) => {
                trace!(target: PROBE_HTTP_TARGET, url, status = response.status().as_u16(), "Health check responded");
                response.status().is_success()
            }
            Err(error) => {
                debug!(target: PROBE_HTTP_TARGET, url, %error, "Health check request failed");
                false
            }
        }
    }
}

impl Default for HttpReadinessProbe {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReadinessProbe for HttpReadinessProbe {
    async fn wait_until_ready(&self, resource: &Resource, cancel: &CancellationToken) -> Result<()> {
        let Some(url) = resource.health_check_url() else {
            return Err(HostError::failed(
                resource.name(),
                "health check has no http endpoint to resolve against",
            ));
        };

        let mut attempts = 0u32;
        loop {
            let healthy = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(HostError::Cancelled { resource: resource.name().to_string() }),
                healthy = self.is_healthy(&url) => healthy,
            };
            if healthy {
                return Ok(());
            }

            attempts += 1;
            if self.max_attempts.is_some_and(|max| attempts >= max) {
                return Err(HostError::failed(
                    resource.name(),
                    format!("{} did not report healthy after {} attempts", url, attempts),
                ));
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(HostError::Cancelled { resource: resource.name().to_string() }),
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
    }
}
