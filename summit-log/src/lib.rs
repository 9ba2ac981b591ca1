//! Summit Logging
//!
//! Builds `tracing` subscribers for Summit processes from an explicit
//! [`LogConfig`] value.
//!
//! # Features
//!
//! - **Environment-controlled**: `SUMMIT_DEBUG=1` enables debug logging
//! - **Structured output**: JSON (default), pretty, or compact lines
//! - **Explicit filtering**: noisy targets are silenced through an ordered
//!   list of [`FilterDirective`]s owned by the caller
//! - **Bootstrap logging**: a scoped subscriber for use before configuration
//!   has been loaded
//!
//! # Usage
//!
//! ```rust,no_run
//! use summit_log::{LogConfig, Level};
//!
//! let config = LogConfig::from_env()
//!     .with_level(Level::Debug)
//!     .suppress_all(summit_log::registry_client_targets());
//!
//! summit_log::init(&config);
//! tracing::info!(service = "apiservice", "starting");
//! ```
//!
//! # Environment Variables
//!
//! - `SUMMIT_DEBUG=1` - Enable debug logging
//! - `SUMMIT_LOG_LEVEL=trace|debug|info|warn|error|off` - Set log level
//! - `SUMMIT_LOG_FORMAT=pretty|json|compact` - Set output format
//! - `SUMMIT_LOG_COLOR=1|0` - Enable/disable colors
//! - `SUMMIT_LOG_TIMESTAMPS=1|0` - Include timestamps
//! - `SUMMIT_LOG_TARGET=1|0` - Include the event target

use std::env;
use std::fmt;
use thiserror::Error;
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::filter::{Directive, EnvFilter};
use tracing_subscriber::fmt::time::{ChronoLocal, ChronoUtc};
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised while building or installing a subscriber.
#[derive(Debug, Error)]
pub enum LogError {
    /// A filter directive could not be parsed.
    #[error("Invalid filter directive '{directive}': {reason}")]
    InvalidDirective { directive: String, reason: String },

    /// A global subscriber was already installed.
    #[error("Global subscriber already installed: {0}")]
    AlreadyInstalled(String),
}

// ============================================================================
// Log Levels
// ============================================================================

/// Log level for Summit logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum Level {
    /// Trace level (most verbose)
    Trace = 0,
    /// Debug level
    Debug = 1,
    /// Info level
    Info = 2,
    /// Warning level
    Warn = 3,
    /// Error level (least verbose)
    Error = 4,
    /// Off (no logging)
    Off = 5,
}

impl Level {
    /// Get level from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Level::Trace),
            "debug" => Some(Level::Debug),
            "info" | "information" => Some(Level::Info),
            "warn" | "warning" => Some(Level::Warn),
            "error" => Some(Level::Error),
            "off" | "none" => Some(Level::Off),
            _ => None,
        }
    }

    /// Get the directive spelling understood by `EnvFilter`.
    pub fn as_directive(&self) -> &'static str {
        match self {
            Level::Trace => "trace",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warn => "warn",
            Level::Error => "error",
            Level::Off => "off",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_directive().to_uppercase())
    }
}

// ============================================================================
// Log Format
// ============================================================================

/// Output format for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Multi-line human readable output
    Pretty,
    /// Compact single-line format
    Compact,
    /// JSON format for structured logging
    Json,
}

impl Format {
    /// Get format from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pretty" => Some(Format::Pretty),
            "compact" => Some(Format::Compact),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

// ============================================================================
// Filter Directives
// ============================================================================

/// A per-target level override, rendered as `target=level`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterDirective {
    pub target: String,
    pub level: Level,
}

impl FilterDirective {
    pub fn new(target: impl Into<String>, level: Level) -> Self {
        Self {
            target: target.into(),
            level,
        }
    }

    /// Silence every event emitted under `target`.
    pub fn off(target: impl Into<String>) -> Self {
        Self::new(target, Level::Off)
    }

    fn to_directive(&self) -> Result<Directive, LogError> {
        let rendered = self.to_string();
        rendered
            .parse::<Directive>()
            .map_err(|e| LogError::InvalidDirective {
                directive: rendered,
                reason: e.to_string(),
            })
    }
}

impl fmt::Display for FilterDirective {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.target, self.level.as_directive())
    }
}

/// Targets used by the registry HTTP client.
pub fn registry_client_targets() -> Vec<&'static str> {
    vec![
        "summit_discovery::eureka::http",
        "summit_discovery::eureka::token",
        "reqwest::connect",
    ]
}

/// Targets of the per-request health polling done while waiting for
/// resources such as the admin server to become ready.
pub fn health_probe_targets() -> Vec<&'static str> {
    vec!["summit_host::probe::http"]
}

// ============================================================================
// Configuration
// ============================================================================

/// Logging configuration.
///
/// Built once by the caller and handed to [`init`], [`try_init`] or
/// [`subscriber`]. Nothing in this crate keeps a copy after the subscriber
/// is built.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Whether debug mode is enabled
    pub debug: bool,
    /// Minimum log level
    pub level: Level,
    /// Output format
    pub format: Format,
    /// Whether colors are enabled
    pub color: bool,
    /// Whether to include timestamps
    pub timestamps: bool,
    /// Whether to include the event target
    pub target: bool,
    /// Per-target overrides, applied in order
    pub directives: Vec<FilterDirective>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            debug: false,
            level: Level::Info,
            format: Format::Json,
            color: false,
            timestamps: true,
            target: true,
            directives: Vec::new(),
        }
    }
}

impl LogConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let flag = |key: &str| lookup(key).map(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        let debug = flag("SUMMIT_DEBUG").unwrap_or(false);

        let level = lookup("SUMMIT_LOG_LEVEL")
            .and_then(|s| Level::parse(&s))
            .unwrap_or(if debug { Level::Debug } else { Level::Info });

        let format = lookup("SUMMIT_LOG_FORMAT")
            .and_then(|s| Format::parse(&s))
            .unwrap_or(Format::Json);

        let color = flag("SUMMIT_LOG_COLOR")
            .unwrap_or_else(|| lookup("NO_COLOR").is_none() && lookup("TERM").is_some());

        Self {
            debug,
            level,
            format,
            color: color && format != Format::Json,
            timestamps: flag("SUMMIT_LOG_TIMESTAMPS").unwrap_or(true),
            target: flag("SUMMIT_LOG_TARGET").unwrap_or(true),
            directives: Vec::new(),
        }
    }

    /// Configuration for logging before the application is configured.
    pub fn bootstrap(level: Level) -> Self {
        Self {
            level,
            format: Format::Compact,
            ..Self::default()
        }
    }

    pub fn with_level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = format;
        self
    }

    /// Append a per-target override.
    pub fn with_directive(mut self, directive: FilterDirective) -> Self {
        self.directives.push(directive);
        self
    }

    /// Silence a target entirely.
    pub fn suppress(self, target: impl Into<String>) -> Self {
        self.with_directive(FilterDirective::off(target))
    }

    /// Silence several targets, keeping their order.
    pub fn suppress_all<I, T>(self, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        targets.into_iter().fold(self, |config, target| config.suppress(target))
    }

    /// Effective minimum level once the debug flag is applied.
    pub fn effective_level(&self) -> Level {
        if self.debug && self.level > Level::Debug {
            Level::Debug
        } else {
            self.level
        }
    }

    /// Build the event filter for this configuration.
    pub fn env_filter(&self) -> Result<EnvFilter, LogError> {
        let mut filter = EnvFilter::new(self.effective_level().as_directive());
        for directive in &self.directives {
            filter = filter.add_directive(directive.to_directive()?);
        }
        Ok(filter)
    }
}

// ============================================================================
// Subscribers
// ============================================================================

fn fmt_layer<S>(config: &LogConfig) -> Box<dyn Layer<S> + Send + Sync>
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(config.color)
        .with_target(config.target);

    match (config.format, config.timestamps) {
        (Format::Json, true) => layer.json().with_timer(ChronoUtc::rfc_3339()).boxed(),
        (Format::Json, false) => layer.json().without_time().boxed(),
        (Format::Pretty, true) => layer
            .pretty()
            .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S%.3f".to_string()))
            .boxed(),
        (Format::Pretty, false) => layer.pretty().without_time().boxed(),
        (Format::Compact, true) => layer
            .compact()
            .with_timer(ChronoLocal::new("%H:%M:%S".to_string()))
            .boxed(),
        (Format::Compact, false) => layer.compact().without_time().boxed(),
    }
}

/// Create a subscriber for the given configuration.
pub fn subscriber(
    config: &LogConfig,
) -> Result<impl tracing::Subscriber + Send + Sync + 'static, LogError> {
    let filter = config.env_filter()?;
    Ok(tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer(config)))
}

/// Install the subscriber as the process default.
pub fn try_init(config: &LogConfig) -> Result<(), LogError> {
    let subscriber = subscriber(config)?;
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| LogError::AlreadyInstalled(e.to_string()))
}

/// Install the subscriber, ignoring a subscriber that is already in place.
pub fn init(config: &LogConfig) {
    if let Err(e) = try_init(config) {
        eprintln!("summit-log: {}", e);
    }
}

/// Scoped subscriber for logging before configuration has been loaded.
///
/// Events go to the bootstrap subscriber until the returned guard is dropped.
pub fn bootstrap(level: Level) -> Result<DefaultGuard, LogError> {
    let subscriber = subscriber(&LogConfig::bootstrap(level))?;
    Ok(tracing::subscriber::set_default(subscriber))
}

// ============================================================================
// Tests
// ============================================================================
