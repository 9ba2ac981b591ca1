//! In-memory registry (for testing and local wiring)

use crate::service::{DiscoveryError, RegistryClient, ServiceInstance};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

/// In-memory registry (for testing/development)
///
/// Service names are matched case-insensitively and instances are returned
/// in registration order.
#[derive(Clone, Default)]
pub struct InMemoryRegistry {
    services: Arc<RwLock<HashMap<String, Vec<ServiceInstance>>>>,
    unavailable: Arc<AtomicBool>,
    latency: Option<Duration>,
}

impl InMemoryRegistry {
    /// Create new in-memory registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every lookup, to exercise cancellation
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Add an instance, replacing one with the same ID
    pub async fn register(&self, instance: ServiceInstance) {
        let mut services = self.services.write().await;
        let instances = services.entry(instance.service_name.to_lowercase()).or_default();

        match instances.iter_mut().find(|i| i.instance_id == instance.instance_id) {
            Some(existing) => *existing = instance,
            None => instances.push(instance),
        }
    }

    /// Remove an instance; returns whether it was registered
    pub async fn deregister(&self, service_name: &str, instance_id: &str) -> bool {
        let mut services = self.services.write().await;
        let Some(instances) = services.get_mut(&service_name.to_lowercase()) else {
            return false;
        };

        let before = instances.len();
        instances.retain(|i| i.instance_id != instance_id);
        before != instances.len()
    }

    /// Clear all registered instances
    pub async fn clear(&self) {
        self.services.write().await.clear();
    }

    /// Get count of registered instances
    pub async fn count(&self) -> usize {
        self.services.read().await.values().map(Vec::len).sum()
    }

    /// Make lookups fail as if the registry were down
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }
}

#[async_trait]
impl RegistryClient for InMemoryRegistry {
    async fn get_instances(
        &self,
        service_name: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ServiceInstance>, DiscoveryError> {
        if let Some(latency) = self.latency {
            tokio::select! {
                _ = cancel.cancelled() => return Err(DiscoveryError::Cancelled),
                _ = tokio::time::sleep(latency) => {}
            }
        }

        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DiscoveryError::RegistryUnavailable(
                "in-memory registry marked unavailable".to_string(),
            ));
        }

        let services = self.services.read().await;
        Ok(services
            .get(&service_name.to_lowercase())
            .cloned()
            .unwrap_or_default())
    }

    fn describe(&self) -> &str {
        "InMemory"
    }
}
