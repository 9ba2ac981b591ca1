//! Startup transition observers

use crate::error::HostError;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::info;

/// Identity of a resource at the moment of a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceEvent {
    pub resource: String,
    /// Image tag or version of the resource, when it has one
    pub image_tag: Option<String>,
    pub at: DateTime<Utc>,
}

/// Callbacks invoked synchronously by the orchestrator on state transitions
///
/// `before_start` always runs before `on_ready` or `on_failed` for the same
/// resource. Nothing is guaranteed about the order across resources.
pub trait ResourceObserver: Send + Sync {
    /// The resource entered `Starting`
    fn before_start(&self, _event: &ResourceEvent) {}

    /// The resource entered `Ready`, `elapsed` after `before_start`
    fn on_ready(&self, _event: &ResourceEvent, _elapsed: Duration) {}

    /// The resource entered `Failed`
    fn on_failed(&self, _event: &ResourceEvent, _error: &HostError) {}
}

/// Logs how long a resource took to become ready
///
/// A timing entry is kept per resource from `before_start` until readiness
/// has been logged, so one timer can be shared by several resources.
#[derive(Debug)]
pub struct StartupTimer {
    label: String,
    started: Mutex<HashMap<String, Instant>>,
}

impl StartupTimer {
    /// `label` names the resource type in the log line, e.g. `ConfigServer`
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            started: Mutex::new(HashMap::new()),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Drop the entry for `resource`, returning the time since it started
    fn finish(&self, resource: &str) -> Option<Duration> {
        self.started.lock().remove(resource).map(|started| started.elapsed())
    }
}

impl ResourceObserver for StartupTimer {
    fn before_start(&self, event: &ResourceEvent) {
        self.started.lock().insert(event.resource.clone(), Instant::now());
    }

    fn on_ready(&self, event: &ResourceEvent, _elapsed: Duration) {
        let Some(elapsed) = self.finish(&event.resource) else {
            return;
        };
        let tag = event.image_tag.as_deref().unwrap_or("none");

        info!(
            target: "summit_host::startup",
            resource = %event.resource,
            tag,
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "{} startup time for tag {}: {:?}",
            self.label,
            tag,
            elapsed
        );
    }

    fn on_failed(&self, event: &ResourceEvent, _error: &HostError) {
        self.finish(&event.resource);
    }
}
