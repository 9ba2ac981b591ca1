//! Registry-backed endpoint providers

use crate::endpoint::{ProviderIdentity, ResolvedEndpoint};
use crate::resolver::resolve_with_provider;
use crate::scheme::{SchemePreference, ServiceEndpointQuery};
use crate::service::{DiscoveryError, RegistryClient};
use crate::settings::DiscoveryOptions;
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Resolves one query against the registry on every call
///
/// Nothing is cached: each [`provide`](Self::provide) fetches the current
/// instances, so concurrent callers each pay their own round trip.
pub struct RegistryEndpointProvider {
    service_name: String,
    schemes: SchemePreference,
    client: Arc<dyn RegistryClient>,
    identity: Arc<ProviderIdentity>,
}

impl RegistryEndpointProvider {
    /// Create a provider, merging the query's schemes with the allow-list once
    pub fn new(
        query: &ServiceEndpointQuery,
        client: Arc<dyn RegistryClient>,
        options: &DiscoveryOptions,
    ) -> Self {
        let identity = Arc::new(ProviderIdentity::new(client.describe(), &query.service_name));

        Self {
            service_name: query.service_name.clone(),
            schemes: query.schemes.apply_allowed(&options.allowed_schemes),
            client,
            identity,
        }
    }

    /// Name of the service this provider looks up
    pub fn host_name(&self) -> &str {
        &self.service_name
    }

    /// Effective scheme preference after applying the allow-list
    pub fn schemes(&self) -> &SchemePreference {
        &self.schemes
    }

    pub fn identity(&self) -> &Arc<ProviderIdentity> {
        &self.identity
    }

    /// Fetch the service's instances and resolve them to endpoints
    ///
    /// Registry failures are returned as-is. A cancelled call returns
    /// [`DiscoveryError::Cancelled`] without logging the result.
    pub async fn provide(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<ResolvedEndpoint>, DiscoveryError> {
        if cancel.is_cancelled() {
            return Err(DiscoveryError::Cancelled);
        }

        let instances = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(DiscoveryError::Cancelled),
            result = self.client.get_instances(&self.service_name, cancel) => result?,
        };

        let endpoints = resolve_with_provider(&self.schemes, &instances, &self.identity);

        info!(
            service = %self.service_name,
            count = endpoints.len(),
            "Instances for service '{}' found in {}: {}.",
            self.service_name,
            self.identity,
            EndpointList(&endpoints)
        );

        Ok(endpoints)
    }
}

impl fmt::Debug for RegistryEndpointProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryEndpointProvider")
            .field("service_name", &self.service_name)
            .field("schemes", &self.schemes)
            .field("registry", &self.identity.kind)
            .finish()
    }
}

impl fmt::Display for RegistryEndpointProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identity.kind)
    }
}

struct EndpointList<'a>(&'a [ResolvedEndpoint]);

impl fmt::Display for EndpointList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, endpoint) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", endpoint.url())?;
        }
        f.write_str("]")
    }
}

/// Creates providers while a registry client is configured
#[derive(Clone)]
pub struct EndpointProviderFactory {
    client: Option<Arc<dyn RegistryClient>>,
    options: DiscoveryOptions,
}

impl EndpointProviderFactory {
    pub fn new(client: Arc<dyn RegistryClient>, options: DiscoveryOptions) -> Self {
        Self {
            client: Some(client),
            options,
        }
    }

    /// A factory that never creates providers
    pub fn disabled(options: DiscoveryOptions) -> Self {
        Self {
            client: None,
            options,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.client.is_some()
    }

    pub fn options(&self) -> &DiscoveryOptions {
        &self.options
    }

    /// Create a provider for the query, or `None` when discovery is disabled
    pub fn try_create_provider(&self, query: &ServiceEndpointQuery) -> Option<RegistryEndpointProvider> {
        let client = self.client.as_ref()?;
        Some(RegistryEndpointProvider::new(query, Arc::clone(client), &self.options))
    }

    /// Parse a query such as `https+http://apiservice` and resolve it once
    ///
    /// Returns no endpoints when discovery is disabled.
    pub async fn resolve(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<ResolvedEndpoint>, DiscoveryError> {
        let query = ServiceEndpointQuery::parse(query)?;

        match self.try_create_provider(&query) {
            Some(provider) => provider.provide(cancel).await,
            None => {
                debug!(%query, "Service discovery is disabled");
                Ok(Vec::new())
            }
        }
    }
}

impl fmt::Debug for EndpointProviderFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EndpointProviderFactory")
            .field("enabled", &self.is_enabled())
            .field("options", &self.options)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRegistry;
    use crate::scheme::AllowedSchemes;
    use crate::service::ServiceInstance;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn registry() -> InMemoryRegistry {
        let registry = InMemoryRegistry::new();
        registry
            .register(
                ServiceInstance::new("api-1", "apiservice")
                    .with_secure_uri("https://localhost:7001/")
                    .with_non_secure_uri("http://localhost:5001/"),
            )
            .await;
        registry
            .register(
                ServiceInstance::new("api-2", "apiservice").with_non_secure_uri("http://localhost:5002/"),
            )
            .await;
        registry
    }

    fn query(s: &str) -> ServiceEndpointQuery {
        ServiceEndpointQuery::parse(s).unwrap()
    }

    struct CountingClient {
        calls: AtomicUsize,
        inner: InMemoryRegistry,
    }

    #[async_trait]
    impl RegistryClient for CountingClient {
        async fn get_instances(
            &self,
            service_name: &str,
            cancel: &CancellationToken,
        ) -> Result<Vec<ServiceInstance>, DiscoveryError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.get_instances(service_name, cancel).await
        }
    }

    #[tokio::test]
    async fn test_provide_prefers_first_scheme() {
        let provider = RegistryEndpointProvider::new(
            &query("https+http://apiservice"),
            Arc::new(registry().await),
            &DiscoveryOptions::default(),
        );

        let endpoints = provider.provide(&CancellationToken::new()).await.unwrap();
        let urls: Vec<String> = endpoints.iter().map(ResolvedEndpoint::url).collect();

        assert_eq!(urls, vec!["https://localhost:7001"]);
        assert_eq!(provider.host_name(), "apiservice");
        assert_eq!(endpoints[0].provider().unwrap().to_string(), "InMemory");
    }

    #[tokio::test]
    async fn test_every_call_reaches_the_registry() {
        let client = Arc::new(CountingClient {
            calls: AtomicUsize::new(0),
            inner: registry().await,
        });
        let provider = RegistryEndpointProvider::new(
            &query("http://apiservice"),
            client.clone(),
            &DiscoveryOptions::default(),
        );

        let cancel = CancellationToken::new();
        provider.provide(&cancel).await.unwrap();
        client.inner.deregister("apiservice", "api-2").await;
        let endpoints = provider.provide(&cancel).await.unwrap();

        assert_eq!(client.calls.load(Ordering::SeqCst), 2);
        assert_eq!(endpoints.len(), 1);
    }

    #[tokio::test]
    async fn test_allow_list_filters_query_schemes() {
        let options = DiscoveryOptions::default().with_allowed_schemes(AllowedSchemes::only(["http"]));
        let provider =
            RegistryEndpointProvider::new(&query("https+http://apiservice"), Arc::new(registry().await), &options);

        assert_eq!(provider.schemes().to_string(), "http");
        let endpoints = provider.provide(&CancellationToken::new()).await.unwrap();
        assert_eq!(endpoints.len(), 2);
    }

    #[tokio::test]
    async fn test_bare_name_with_all_schemes_allowed_is_empty() {
        let provider = RegistryEndpointProvider::new(
            &query("apiservice"),
            Arc::new(registry().await),
            &DiscoveryOptions::default(),
        );
        assert!(provider.provide(&CancellationToken::new()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_registry_failure_propagates() {
        let registry = registry().await;
        registry.set_unavailable(true);
        let provider =
            RegistryEndpointProvider::new(&query("http://apiservice"), Arc::new(registry), &DiscoveryOptions::default());

        let err = provider.provide(&CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, DiscoveryError::RegistryUnavailable(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_while_waiting_on_registry() {
        let slow = registry().await.with_latency(Duration::from_secs(60));
        let provider =
            RegistryEndpointProvider::new(&query("http://apiservice"), Arc::new(slow), &DiscoveryOptions::default());
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            trigger.cancel();
        });

        assert!(matches!(provider.provide(&cancel).await, Err(DiscoveryError::Cancelled)));
    }

    #[tokio::test]
    async fn test_already_cancelled_skips_registry() {
        let client = Arc::new(CountingClient {
            calls: AtomicUsize::new(0),
            inner: registry().await,
        });
        let provider =
            RegistryEndpointProvider::new(&query("http://apiservice"), client.clone(), &DiscoveryOptions::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        assert!(matches!(provider.provide(&cancel).await, Err(DiscoveryError::Cancelled)));
        assert_eq!(client.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_factory() {
        let enabled = EndpointProviderFactory::new(Arc::new(registry().await), DiscoveryOptions::default());
        let disabled = EndpointProviderFactory::disabled(DiscoveryOptions::default());
        let q = query("http://apiservice");

        assert!(enabled.try_create_provider(&q).is_some());
        assert!(disabled.try_create_provider(&q).is_none());

        let cancel = CancellationToken::new();
        assert_eq!(enabled.resolve("http://apiservice", &cancel).await.unwrap().len(), 2);
        assert!(disabled.resolve("http://apiservice", &cancel).await.unwrap().is_empty());
        assert!(matches!(
            enabled.resolve("", &cancel).await,
            Err(DiscoveryError::InvalidQuery(_))
        ));
    }
}
