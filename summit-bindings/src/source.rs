//! Where binding credentials come from.

use std::env;

/// Variable holding the bound services.
pub const VCAP_SERVICES: &str = "VCAP_SERVICES";

/// Variable whose presence marks the platform.
pub const VCAP_APPLICATION: &str = "VCAP_APPLICATION";

/// Hosting environment, used to decide whether credentials may be logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostEnvironment {
    Development,
    Staging,
    #[default]
    Production,
}

impl HostEnvironment {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "development" | "dev" => Self::Development,
            "staging" => Self::Staging,
            _ => Self::Production,
        }
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Self::Development)
    }
}

/// Process-wide credentials supplied by the hosting platform.
pub trait CredentialsSource: Send + Sync {
    /// Whether the process runs on the platform at all.
    fn is_platform(&self) -> bool;

    /// The raw credentials blob, if any.
    fn read(&self) -> Option<String>;
}

/// Reads `VCAP_SERVICES` from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvCredentialsSource;

impl CredentialsSource for EnvCredentialsSource {
    fn is_platform(&self) -> bool {
        env::var_os(VCAP_APPLICATION).is_some()
    }

    fn read(&self) -> Option<String> {
        env::var(VCAP_SERVICES).ok()
    }
}

/// Fixed credentials, for tests and local wiring.
#[derive(Debug, Clone, Default)]
pub struct StaticCredentialsSource {
    on_platform: bool,
    services: Option<String>,
}

impl StaticCredentialsSource {
    /// A platform process with the given blob.
    pub fn platform(services: impl Into<String>) -> Self {
        Self {
            on_platform: true,
            services: Some(services.into()),
        }
    }

    /// A platform process that was given no credentials.
    pub fn platform_without_services() -> Self {
        Self {
            on_platform: true,
            services: None,
        }
    }

    /// A process not running on the platform.
    pub fn off_platform() -> Self {
        Self::default()
    }
}

impl CredentialsSource for StaticCredentialsSource {
    fn is_platform(&self) -> bool {
        self.on_platform
    }

    fn read(&self) -> Option<String> {
        self.services.clone()
    }
}

/// A blob that is missing, blank, or `{}` carries no credentials.
pub fn is_absent(blob: Option<&str>) -> bool {
    match blob.map(str::trim) {
        None | Some("") | Some("{}") => true,
        Some(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_absent() {
        assert!(is_absent(None));
        assert!(is_absent(Some("")));
        assert!(is_absent(Some("{}")));
        assert!(is_absent(Some("  {} ")));
        assert!(!is_absent(Some(r#"{"a": []}"#)));
    }

    #[test]
    fn test_host_environment() {
        assert!(HostEnvironment::parse("Development").is_development());
        assert_eq!(HostEnvironment::parse("staging"), HostEnvironment::Staging);
        assert_eq!(HostEnvironment::parse("anything"), HostEnvironment::Production);
    }

    #[test]
    fn test_static_source() {
        let source = StaticCredentialsSource::platform("{}");
        assert!(source.is_platform());
        assert_eq!(source.read().as_deref(), Some("{}"));
        assert!(!StaticCredentialsSource::off_platform().is_platform());
    }
}
