//! Discovery and registry client settings

use crate::interval::{
    IntervalConfig, DEFAULT_REFRESH_PERIOD, DEFAULT_REGISTRY_FETCH_INTERVAL_SECONDS,
};
use crate::scheme::AllowedSchemes;
use crate::service::DiscoveryError;
use serde_json::Value;
use std::time::Duration;
use summit_config::{ConfigManager, ConfigValidator, Validate};

/// Registry server used when nothing else is configured
pub const DEFAULT_EUREKA_SERVER_URL: &str = "http://localhost:8761/eureka/";

/// Settings shared by every endpoint provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// How often resolved endpoints should be refreshed
    pub refresh_period: Duration,

    /// Schemes that may ever be resolved
    pub allowed_schemes: AllowedSchemes,
}

impl DiscoveryOptions {
    pub fn with_refresh_period(mut self, period: Duration) -> Self {
        self.refresh_period = period;
        self
    }

    pub fn with_allowed_schemes(mut self, allowed: AllowedSchemes) -> Self {
        self.allowed_schemes = allowed;
        self
    }
}

impl Default for DiscoveryOptions {
    fn default() -> Self {
        Self {
            refresh_period: DEFAULT_REFRESH_PERIOD,
            allowed_schemes: AllowedSchemes::All,
        }
    }
}

/// Options of the registry client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EurekaClientOptions {
    pub should_register_with_eureka: bool,
    pub should_fetch_registry: bool,
    pub registry_fetch_interval_seconds: u64,
    pub service_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token_uri: Option<String>,
}

impl Default for EurekaClientOptions {
    fn default() -> Self {
        Self {
            should_register_with_eureka: true,
            should_fetch_registry: true,
            registry_fetch_interval_seconds: DEFAULT_REGISTRY_FETCH_INTERVAL_SECONDS,
            service_url: DEFAULT_EUREKA_SERVER_URL.to_string(),
            client_id: None,
            client_secret: None,
            access_token_uri: None,
        }
    }
}

/// Configuration keys read by [`DiscoverySettings::from_config`]
pub mod keys {
    pub const REGISTER: &str = "discovery.register";
    pub const DISCOVER: &str = "discovery.discover";
    pub const REFRESH_PERIOD: &str = "discovery.refresh_period";
    pub const ALLOWED_SCHEMES: &str = "discovery.allowed_schemes";
    pub const REGISTRY_FETCH_INTERVAL: &str = "eureka.client.registry_fetch_interval_seconds";
    pub const SERVICE_URL: &str = "eureka.client.service_url";
    pub const CLIENT_ID: &str = "eureka.client.client_id";
    pub const CLIENT_SECRET: &str = "eureka.client.client_secret";
    pub const ACCESS_TOKEN_URI: &str = "eureka.client.access_token_uri";
}

/// Typed view of the discovery configuration
///
/// ```rust,ignore
/// let config = ConfigManager::builder().load_env().build()?;
/// let settings = DiscoverySettings::from_config(&config)?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySettings {
    pub register: bool,
    pub discover: bool,
    pub registry_fetch_interval_seconds: u64,
    pub refresh_period: Duration,
    pub allowed_schemes: AllowedSchemes,
    pub eureka_server_url: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub access_token_uri: Option<String>,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            register: false,
            discover: false,
            registry_fetch_interval_seconds: DEFAULT_REGISTRY_FETCH_INTERVAL_SECONDS,
            refresh_period: DEFAULT_REFRESH_PERIOD,
            allowed_schemes: AllowedSchemes::All,
            eureka_server_url: None,
            client_id: None,
            client_secret: None,
            access_token_uri: None,
        }
    }
}

impl DiscoverySettings {
    /// Read and validate the settings, falling back to library defaults
    pub fn from_config(config: &ConfigManager) -> Result<Self, DiscoveryError> {
        let defaults = Self::default();

        let refresh_period = match config.get_opt::<Value>(keys::REFRESH_PERIOD)? {
            Some(value) => duration_from_value(&value)?,
            None => defaults.refresh_period,
        };

        let allowed_schemes = match config.get_opt::<Value>(keys::ALLOWED_SCHEMES)? {
            Some(value) => allowed_from_value(&value)?,
            None => defaults.allowed_schemes,
        };

        let settings = Self {
            register: config.get_opt(keys::REGISTER)?.unwrap_or(defaults.register),
            discover: config.get_opt(keys::DISCOVER)?.unwrap_or(defaults.discover),
            registry_fetch_interval_seconds: config
                .get_opt(keys::REGISTRY_FETCH_INTERVAL)?
                .unwrap_or(defaults.registry_fetch_interval_seconds),
            refresh_period,
            allowed_schemes,
            eureka_server_url: config.get_opt(keys::SERVICE_URL)?,
            client_id: config.get_opt(keys::CLIENT_ID)?,
            client_secret: config.get_opt(keys::CLIENT_SECRET)?,
            access_token_uri: config.get_opt(keys::ACCESS_TOKEN_URI)?,
        };

        settings.validate()?;
        Ok(settings)
    }

    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions {
            refresh_period: self.refresh_period,
            allowed_schemes: self.allowed_schemes.clone(),
        }
    }

    pub fn interval(&self) -> IntervalConfig {
        IntervalConfig::new(self.registry_fetch_interval_seconds, self.refresh_period)
    }
}

impl Validate for DiscoverySettings {
    fn validate(&self) -> summit_config::Result<()> {
        ConfigValidator::positive(
            self.registry_fetch_interval_seconds,
            keys::REGISTRY_FETCH_INTERVAL,
        )?;
        if self.refresh_period.is_zero() {
            return Err(summit_config::ConfigError::ValidationError(format!(
                "{} must be greater than zero",
                keys::REFRESH_PERIOD
            )));
        }
        if let Some(url) = &self.eureka_server_url {
            ConfigValidator::is_url(url, keys::SERVICE_URL)?;
        }
        if let Some(uri) = &self.access_token_uri {
            ConfigValidator::is_url(uri, keys::ACCESS_TOKEN_URI)?;
        }
        Ok(())
    }
}

fn duration_from_value(value: &Value) -> Result<Duration, DiscoveryError> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(Duration::from_secs)
            .ok_or_else(|| invalid(keys::REFRESH_PERIOD, &n.to_string())),
        Value::String(s) => parse_duration(s),
        other => Err(invalid(keys::REFRESH_PERIOD, &other.to_string())),
    }
}

fn allowed_from_value(value: &Value) -> Result<AllowedSchemes, DiscoveryError> {
    let schemes: Vec<String> = match value {
        Value::String(s) => s
            .split([',', '+', ';'])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        Value::Array(items) => items
            .iter()
            .filter_map(Value::as_str)
            .map(String::from)
            .collect(),
        // Keys such as `allowed_schemes__0` arrive as an object of indices
        Value::Object(map) => map.values().filter_map(Value::as_str).map(String::from).collect(),
        other => return Err(invalid(keys::ALLOWED_SCHEMES, &other.to_string())),
    };

    if schemes.is_empty() || schemes.iter().any(|s| s == "*") {
        Ok(AllowedSchemes::All)
    } else {
        Ok(AllowedSchemes::only(schemes))
    }
}

fn invalid(key: &str, value: &str) -> DiscoveryError {
    DiscoveryError::InvalidConfiguration(format!("'{}' is not a valid value for {}", value, key))
}

/// Parse a duration written as plain seconds, with a unit suffix
/// (`500ms`, `10s`, `1m`, `2h`), or as `hh:mm:ss`
pub fn parse_duration(input: &str) -> Result<Duration, DiscoveryError> {
    let s = input.trim();
    let bad = || invalid(keys::REFRESH_PERIOD, input);

    if s.contains(':') {
        let parts: Vec<&str> = s.split(':').collect();
        let [h, m, sec] = parts.as_slice() else {
            return Err(bad());
        };
        let hours: u64 = h.parse().map_err(|_| bad())?;
        let minutes: u64 = m.parse().map_err(|_| bad())?;
        let seconds: f64 = sec.parse().map_err(|_| bad())?;
        if minutes >= 60 || !(0.0..60.0).contains(&seconds) {
            return Err(bad());
        }
        let whole = hours
            .checked_mul(3600)
            .and_then(|secs| secs.checked_add(minutes * 60))
            .ok_or_else(bad)?;
        let fraction = Duration::try_from_secs_f64(seconds).map_err(|_| bad())?;
        return Duration::from_secs(whole).checked_add(fraction).ok_or_else(bad);
    }

    let split = s.find(|c: char| !c.is_ascii_digit() && c != '.').unwrap_or(s.len());
    let (number, unit) = s.split_at(split);
    let amount: f64 = number.parse().map_err(|_| bad())?;
    if !amount.is_finite() || amount < 0.0 {
        return Err(bad());
    }

    let seconds = match unit.trim() {
        "" | "s" => amount,
        "ms" => amount / 1000.0,
        "m" => amount * 60.0,
        "h" => amount * 3600.0,
        _ => return Err(bad()),
    };
    Duration::try_from_secs_f64(seconds).map_err(|_| bad())
}
