//! Wiring the Eureka client and endpoint providers for an application

use crate::eureka::EurekaRegistryClient;
use crate::interval::{reconcile, DEFAULT_REFRESH_PERIOD, DEFAULT_REGISTRY_FETCH_INTERVAL_SECONDS};
use crate::provider::EndpointProviderFactory;
use crate::service::{DiscoveryError, RegistryClient};
use crate::settings::{DiscoveryOptions, DiscoverySettings, EurekaClientOptions};
use std::sync::Arc;
use summit_bindings::{has_tag, BindingResolver, BindingSelection, ServiceBinding};
use tracing::trace;

/// Tag that marks a registry service binding
pub const EUREKA_TAG: &str = "eureka";

/// Apply the register/discover toggles and reconcile the fetch interval,
/// then hand the options to `configure`
pub fn configure_eureka<F>(
    options: &mut EurekaClientOptions,
    register: bool,
    discover: bool,
    discovery: &DiscoveryOptions,
    configure: F,
) where
    F: FnOnce(&mut EurekaClientOptions),
{
    options.should_register_with_eureka = register;
    options.should_fetch_registry = discover;

    trace!("Configured Eureka with Register = {}, Discover = {}.", register, discover);

    options.registry_fetch_interval_seconds = reconcile(
        options.registry_fetch_interval_seconds,
        DEFAULT_REGISTRY_FETCH_INTERVAL_SECONDS,
        discovery.refresh_period,
        DEFAULT_REFRESH_PERIOD,
    );

    configure(options);
}

/// Copy registry credentials from a service binding
///
/// Credentials that the binding does not carry leave the options untouched.
pub fn apply_eureka_binding(options: &mut EurekaClientOptions, binding: &ServiceBinding) {
    if let Some(uri) = binding.credential("uri") {
        options.service_url = format!("{}/eureka/", uri);
        trace!("Assigned '{}' in connection string from service binding.", "service_url");
    }
    if let Some(client_id) = binding.credential("client_id") {
        options.client_id = Some(client_id.to_string());
        trace!("Assigned '{}' in connection string from service binding.", "client_id");
    }
    if let Some(secret) = binding.credential("client_secret") {
        options.client_secret = Some(secret.to_string());
        trace!("Assigned '{}' in connection string from service binding.", "client_secret");
    }
    if let Some(token_uri) = binding.credential("access_token_uri") {
        options.access_token_uri = Some(token_uri.to_string());
        trace!("Assigned '{}' in connection string from service binding.", "access_token_uri");
    }
}

/// Select a registry binding by name, or the single one tagged `eureka`
pub fn eureka_binding_selection(name: Option<String>) -> BindingSelection {
    BindingSelection::name_or(name, has_tag(EUREKA_TAG))
}

/// Registry discovery wiring for one application
#[derive(Debug, Clone)]
pub struct DiscoverySetup {
    discovery: DiscoveryOptions,
    client: EurekaClientOptions,
    eureka_configured: bool,
    discover: bool,
}

impl DiscoverySetup {
    pub fn new(discovery: DiscoveryOptions) -> Self {
        Self {
            discovery,
            client: EurekaClientOptions::default(),
            eureka_configured: false,
            discover: false,
        }
    }

    /// Seed the client options from configuration
    pub fn from_settings(settings: &DiscoverySettings) -> Self {
        let mut setup = Self::new(settings.discovery_options());
        setup.client.registry_fetch_interval_seconds = settings.registry_fetch_interval_seconds;
        if let Some(url) = &settings.eureka_server_url {
            setup.client.service_url = url.clone();
        }
        setup.client.client_id = settings.client_id.clone();
        setup.client.client_secret = settings.client_secret.clone();
        setup.client.access_token_uri = settings.access_token_uri.clone();
        setup
    }

    /// Activate registration and/or discovery through Eureka
    ///
    /// With both toggles off nothing is configured and later binding calls
    /// fail with [`DiscoveryError::NotConfigured`].
    pub fn add_eureka_service_discovery<F>(&mut self, register: bool, discover: bool, configure: F) -> &mut Self
    where
        F: FnOnce(&mut EurekaClientOptions),
    {
        if register || discover {
            configure_eureka(&mut self.client, register, discover, &self.discovery, configure);
            self.eureka_configured = true;
        }
        self.discover = discover;
        self
    }

    /// Take registry credentials from the platform's service bindings
    ///
    /// Returns whether a binding was applied.
    pub fn configure_from_binding<F>(
        &mut self,
        resolver: &BindingResolver,
        selection: &BindingSelection,
        configure: F,
    ) -> Result<bool, DiscoveryError>
    where
        F: FnOnce(&mut EurekaClientOptions, &ServiceBinding),
    {
        if !self.eureka_configured {
            return Err(DiscoveryError::NotConfigured(
                "Call add_eureka_service_discovery first.".to_string(),
            ));
        }

        let client = &mut self.client;
        let applied = resolver.apply(selection, |binding| {
            apply_eureka_binding(client, binding);
            configure(client, binding);
        })?;
        Ok(applied)
    }

    pub fn is_eureka_configured(&self) -> bool {
        self.eureka_configured
    }

    pub fn eureka_options(&self) -> Option<&EurekaClientOptions> {
        self.eureka_configured.then_some(&self.client)
    }

    pub fn discovery_options(&self) -> &DiscoveryOptions {
        &self.discovery
    }

    /// Provider factory backed by the configured Eureka server
    pub fn provider_factory(&self) -> Result<EndpointProviderFactory, DiscoveryError> {
        if !self.discover {
            return Ok(EndpointProviderFactory::disabled(self.discovery.clone()));
        }
        let client = EurekaRegistryClient::from_options(&self.client)?;
        Ok(EndpointProviderFactory::new(Arc::new(client), self.discovery.clone()))
    }

    /// Provider factory backed by a caller-supplied registry client
    pub fn provider_factory_with(&self, client: Arc<dyn RegistryClient>) -> EndpointProviderFactory {
        if self.discover {
            EndpointProviderFactory::new(client, self.discovery.clone())
        } else {
            EndpointProviderFactory::disabled(self.discovery.clone())
        }
    }
}

impl Default for DiscoverySetup {
    fn default() -> Self {
        Self::new(DiscoveryOptions::default())
    }
}
