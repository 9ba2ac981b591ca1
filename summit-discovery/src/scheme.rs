//! Scheme preferences and lookup queries

use crate::service::DiscoveryError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordered list of transport schemes a caller accepts, most preferred first
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemePreference(Vec<String>);

impl SchemePreference {
    pub fn new<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self(
            schemes
                .into_iter()
                .map(|s| s.as_ref().trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
        )
    }

    /// Parse a `+`-delimited preference such as `https+http`
    pub fn parse(s: &str) -> Self {
        Self::new(s.split('+'))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Merge with an allow-list
    ///
    /// A non-empty preference keeps only allowed schemes, in its own order.
    /// An empty preference takes the explicit allow-list, or stays empty
    /// when every scheme is allowed.
    pub fn apply_allowed(&self, allowed: &AllowedSchemes) -> Self {
        match allowed {
            AllowedSchemes::All => self.clone(),
            AllowedSchemes::Only(list) if self.is_empty() => Self::new(list),
            AllowedSchemes::Only(list) => Self(
                self.0
                    .iter()
                    .filter(|s| list.iter().any(|a| a.eq_ignore_ascii_case(s)))
                    .cloned()
                    .collect(),
            ),
        }
    }
}

impl fmt::Display for SchemePreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("+"))
    }
}

/// Which schemes may ever be used for resolution
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllowedSchemes {
    #[default]
    All,
    Only(Vec<String>),
}

impl AllowedSchemes {
    pub fn only<I, S>(schemes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Only(schemes.into_iter().map(Into::into).collect())
    }

    pub fn allows(&self, scheme: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(list) => list.iter().any(|a| a.eq_ignore_ascii_case(scheme)),
        }
    }
}

/// A named lookup such as `https+http://apiservice`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceEndpointQuery {
    pub schemes: SchemePreference,
    pub service_name: String,
    /// Named endpoint selected with a leading `_name.` label
    pub endpoint_name: Option<String>,
}

impl ServiceEndpointQuery {
    pub fn new(service_name: impl Into<String>, schemes: SchemePreference) -> Self {
        Self {
            schemes,
            service_name: service_name.into(),
            endpoint_name: None,
        }
    }

    /// Parse `[schemes://][_endpoint.]service[:port][/path]`
    pub fn parse(input: &str) -> Result<Self, DiscoveryError> {
        let trimmed = input.trim();
        let (schemes, rest) = match trimmed.split_once("://") {
            Some((schemes, rest)) => (SchemePreference::parse(schemes), rest),
            None => (SchemePreference::default(), trimmed),
        };

        let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
        let host = authority.split(':').next().unwrap_or_default();

        let (endpoint_name, service_name) = match host.strip_prefix('_') {
            Some(labelled) => match labelled.split_once('.') {
                Some((endpoint, service)) => (Some(endpoint.to_string()), service),
                None => return Err(DiscoveryError::InvalidQuery(input.to_string())),
            },
            None => (None, host),
        };

        if service_name.is_empty() {
            return Err(DiscoveryError::InvalidQuery(input.to_string()));
        }

        Ok(Self {
            schemes,
            service_name: service_name.to_string(),
            endpoint_name,
        })
    }
}

impl fmt::Display for ServiceEndpointQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.schemes.is_empty() {
            write!(f, "{}://", self.schemes)?;
        }
        if let Some(endpoint) = &self.endpoint_name {
            write!(f, "_{}.", endpoint)?;
        }
        f.write_str(&self.service_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_preference() {
        let schemes = SchemePreference::parse("HTTPS+http");
        assert_eq!(schemes.iter().collect::<Vec<_>>(), vec!["https", "http"]);
        assert_eq!(schemes.to_string(), "https+http");
        assert!(SchemePreference::parse("").is_empty());
        assert_eq!(SchemePreference::parse("https++http").len(), 2);
    }

    #[test]
    fn test_apply_allowed_filters_in_query_order() {
        let schemes = SchemePreference::parse("https+http+grpc");
        let allowed = AllowedSchemes::only(["grpc", "HTTP"]);
        assert_eq!(
            schemes.apply_allowed(&allowed),
            SchemePreference::parse("http+grpc")
        );
        assert_eq!(schemes.apply_allowed(&AllowedSchemes::All), schemes);
    }

    #[test]
    fn test_apply_allowed_to_empty_preference() {
        let empty = SchemePreference::default();
        assert!(empty.apply_allowed(&AllowedSchemes::All).is_empty());
        assert_eq!(
            empty.apply_allowed(&AllowedSchemes::only(["https"])),
            SchemePreference::parse("https")
        );
    }

    #[test]
    fn test_parse_query() {
        let query = ServiceEndpointQuery::parse("https+http://apiservice").unwrap();
        assert_eq!(query.service_name, "apiservice");
        assert_eq!(query.schemes, SchemePreference::parse("https+http"));
        assert_eq!(query.endpoint_name, None);
        assert_eq!(query.to_string(), "https+http://apiservice");

        let query = ServiceEndpointQuery::parse("http://_dashboard.springapp:8081/weatherforecast").unwrap();
        assert_eq!(query.service_name, "springapp");
        assert_eq!(query.endpoint_name.as_deref(), Some("dashboard"));

        let query = ServiceEndpointQuery::parse("apiservice").unwrap();
        assert!(query.schemes.is_empty());
    }

    #[test]
    fn test_parse_query_rejects_missing_name() {
        assert!(ServiceEndpointQuery::parse("https://").is_err());
        assert!(ServiceEndpointQuery::parse("http://_dashboard").is_err());
        assert!(ServiceEndpointQuery::parse("").is_err());
    }
}
