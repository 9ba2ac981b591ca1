//! Scheme-priority endpoint resolution

use crate::endpoint::{EndpointAddress, ProviderIdentity, ResolvedEndpoint};
use crate::scheme::SchemePreference;
use crate::service::ServiceInstance;
use std::sync::{Arc, Weak};
use tracing::debug;

/// Turn registry instances into endpoints for the first scheme that yields any
///
/// Schemes are tried in preference order. Every instance contributes its
/// location for the current scheme, and once a scheme has produced at least
/// one endpoint the lower-priority schemes are not consulted, even if some
/// instances only expose those. Locations that are absent or do not parse
/// are skipped.
pub fn resolve(schemes: &SchemePreference, instances: &[ServiceInstance]) -> Vec<ResolvedEndpoint> {
    resolve_for(schemes, instances, Weak::new())
}

/// [`resolve`], tagging each endpoint with the provider that produced it
pub fn resolve_with_provider(
    schemes: &SchemePreference,
    instances: &[ServiceInstance],
    provider: &Arc<ProviderIdentity>,
) -> Vec<ResolvedEndpoint> {
    resolve_for(schemes, instances, Arc::downgrade(provider))
}

fn resolve_for(
    schemes: &SchemePreference,
    instances: &[ServiceInstance],
    provider: Weak<ProviderIdentity>,
) -> Vec<ResolvedEndpoint> {
    let mut endpoints = Vec::new();

    if instances.is_empty() {
        return endpoints;
    }

    for scheme in schemes.iter() {
        for instance in instances {
            let Some(uri) = instance.uri_for(scheme) else {
                continue;
            };

            match EndpointAddress::parse(uri) {
                Ok(address) => endpoints.push(
                    ResolvedEndpoint::new(scheme, address).with_provider(provider.clone()),
                ),
                Err(error) => debug!(
                    instance = %instance.instance_id,
                    service = %instance.service_name,
                    scheme,
                    %error,
                    "Skipping malformed instance location"
                ),
            }
        }

        if !endpoints.is_empty() {
            break;
        }
    }

    endpoints
}

#[cfg(test)]
mod tests {
    use super::*;

    fn both(id: &str, port: u16) -> ServiceInstance {
        ServiceInstance::new(id, "apiservice")
            .with_secure_uri(format!("https://{}:{}/", id, port + 1000))
            .with_non_secure_uri(format!("http://{}:{}/", id, port))
    }

    fn http_only(id: &str, port: u16) -> ServiceInstance {
        ServiceInstance::new(id, "apiservice").with_non_secure_uri(format!("http://{}:{}/", id, port))
    }

    fn urls(endpoints: &[ResolvedEndpoint]) -> Vec<String> {
        endpoints.iter().map(ResolvedEndpoint::url).collect()
    }

    #[test]
    fn test_empty_instances_short_circuit() {
        assert!(resolve(&SchemePreference::parse("http"), &[]).is_empty());
    }

    #[test]
    fn test_no_schemes_yields_nothing() {
        assert!(resolve(&SchemePreference::default(), &[both("a", 5000)]).is_empty());
    }

    #[test]
    fn test_no_matching_locations_yields_nothing() {
        let instances = vec![ServiceInstance::new("a", "apiservice"), http_only("b", 5000)];
        assert!(resolve(&SchemePreference::parse("https+grpc"), &instances).is_empty());
    }

    #[test]
    fn test_first_successful_scheme_wins_wholesale() {
        let instances = vec![http_only("a", 5000), both("b", 5001), http_only("c", 5002)];
        let endpoints = resolve(&SchemePreference::parse("https+http"), &instances);

        assert_eq!(urls(&endpoints), vec!["https://b:6001"]);
    }

    #[test]
    fn test_falls_back_when_preferred_scheme_has_nothing() {
        let instances = vec![http_only("a", 5000), http_only("b", 5001)];
        let endpoints = resolve(&SchemePreference::parse("https+http"), &instances);

        assert_eq!(urls(&endpoints), vec!["http://a:5000", "http://b:5001"]);
    }

    #[test]
    fn test_preference_order_decides_not_availability() {
        let instances = vec![both("a", 5000)];

        let https_first = resolve(&SchemePreference::parse("https+http"), &instances);
        assert_eq!(urls(&https_first), vec!["https://a:6000"]);

        let http_first = resolve(&SchemePreference::parse("http+https"), &instances);
        assert_eq!(urls(&http_first), vec!["http://a:5000"]);
    }

    #[test]
    fn test_instance_order_is_kept() {
        let instances = vec![both("c", 5002), both("a", 5000), both("b", 5001)];
        let endpoints = resolve(&SchemePreference::parse("http"), &instances);

        assert_eq!(
            urls(&endpoints),
            vec!["http://c:5002", "http://a:5000", "http://b:5001"]
        );
    }

    #[test]
    fn test_malformed_location_is_skipped() {
        let instances = vec![
            ServiceInstance::new("bad", "apiservice").with_secure_uri("https://:not-a-port/"),
            both("good", 5000),
        ];
        let endpoints = resolve(&SchemePreference::parse("https"), &instances);

        assert_eq!(urls(&endpoints), vec!["https://good:6000"]);
    }

    #[test]
    fn test_only_malformed_falls_through_to_next_scheme() {
        let instances = vec![ServiceInstance::new("a", "apiservice")
            .with_secure_uri("::::")
            .with_non_secure_uri("http://a:5000/")];
        let endpoints = resolve(&SchemePreference::parse("https+http"), &instances);

        assert_eq!(urls(&endpoints), vec!["http://a:5000"]);
    }

    #[test]
    fn test_provider_attribution() {
        let identity = Arc::new(ProviderIdentity::new("Eureka", "apiservice"));
        let endpoints =
            resolve_with_provider(&SchemePreference::parse("http"), &[both("a", 5000)], &identity);

        assert!(Arc::ptr_eq(&endpoints[0].provider().unwrap(), &identity));
        assert!(resolve(&SchemePreference::parse("http"), &[both("a", 5000)])[0]
            .provider()
            .is_none());
    }
}
