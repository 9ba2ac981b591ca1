//! Dependency-aware startup orchestration
//!
//! Every resource is driven concurrently through
//! `NotStarted -> Starting -> Ready | Failed`. A resource with wait-for
//! dependencies enters `Starting` right away but is only launched once all
//! of them are `Ready`. If one of them fails, or the run is cancelled, the
//! resource stays in `Starting` and is reported as blocked.

use crate::error::{HostError, Result};
use crate::model::AppModel;
use crate::observer::{ResourceEvent, ResourceObserver};
use crate::probe::{HttpReadinessProbe, ReadinessProbe, ResourceLauncher};
use crate::report::{BlockCause, ResourceReport, StartupOutcome, StartupReport};
use crate::resource::Resource;
use crate::state::ResourceState;
use chrono::{DateTime, Utc};
use futures_util::future::{join_all, try_join_all};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Readiness {
    Pending,
    Ready,
    Never,
}

type Gates<'a> = HashMap<&'a str, watch::Sender<Readiness>>;

#[derive(Debug, Default)]
struct Slot {
    state: ResourceState,
    started_at: Option<DateTime<Utc>>,
    timer: Option<Instant>,
}

/// Starts the resources of an [`AppModel`] in dependency order
pub struct Orchestrator {
    model: Arc<AppModel>,
    probe: Arc<dyn ReadinessProbe>,
    observers: Vec<Arc<dyn ResourceObserver>>,
    startup_timeout: Option<Duration>,
    started: AtomicBool,
    slots: HashMap<String, Mutex<Slot>>,
}

impl Orchestrator {
    pub fn new(model: AppModel) -> Self {
        Self::from_shared(Arc::new(model))
    }

    pub fn from_shared(model: Arc<AppModel>) -> Self {
        let slots = model
            .resources()
            .iter()
            .map(|r| (r.name().to_string(), Mutex::new(Slot::default())))
            .collect();

        Self {
            model,
            probe: Arc::new(HttpReadinessProbe::default()),
            observers: Vec::new(),
            startup_timeout: None,
            started: AtomicBool::new(false),
            slots,
        }
    }

    /// Replace the default HTTP readiness probe
    pub fn with_probe(mut self, probe: Arc<dyn ReadinessProbe>) -> Self {
        self.probe = probe;
        self
    }

    /// Observe every resource, in addition to each resource's own observers
    pub fn with_observer(mut self, observer: Arc<dyn ResourceObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Cancel whatever has not become ready after `timeout`
    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = Some(timeout);
        self
    }

    pub fn model(&self) -> &AppModel {
        &self.model
    }

    /// Current state of a resource
    pub fn state(&self, name: &str) -> Option<ResourceState> {
        self.slots.get(name).map(|slot| slot.lock().state)
    }

    /// Start every resource and wait until each has settled
    ///
    /// Returns when all resources are ready, failed or blocked, or once
    /// `cancel` fires (or the startup timeout elapses) and the remaining
    /// resources have been released. An orchestrator runs at most once.
    pub async fn run(
        &self,
        launcher: &dyn ResourceLauncher,
        cancel: &CancellationToken,
    ) -> Result<StartupReport> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(HostError::AlreadyStarted);
        }

        let cancel = cancel.child_token();
        let gates: Gates<'_> = self
            .model
            .resources()
            .iter()
            .map(|r| (r.name(), watch::channel(Readiness::Pending).0))
            .collect();

        info!(resources = self.model.resources().len(), "Starting resources");

        let all = join_all(
            self.model
                .resources()
                .iter()
                .map(|resource| self.start_resource(resource, launcher, &gates, &cancel)),
        );

        let resources = match self.startup_timeout {
            Some(timeout) => {
                tokio::pin!(all);
                tokio::select! {
                    reports = &mut all => reports,
                    _ = tokio::time::sleep(timeout) => {
                        warn!(?timeout, "Startup timed out, cancelling resources that are not ready");
                        cancel.cancel();
                        all.await
                    }
                }
            }
            None => all.await,
        };

        let report = StartupReport { resources };
        info!(
            ready = report.ready().count(),
            failed = report.failed().count(),
            blocked = report.blocked().count(),
            "Startup finished"
        );
        Ok(report)
    }

    async fn start_resource(
        &self,
        resource: &Resource,
        launcher: &dyn ResourceLauncher,
        gates: &Gates<'_>,
        cancel: &CancellationToken,
    ) -> ResourceReport {
        let report = self.drive(resource, launcher, gates, cancel).await;

        let readiness = if report.is_ready() {
            Readiness::Ready
        } else {
            Readiness::Never
        };
        if let Some(gate) = gates.get(resource.name()) {
            gate.send_replace(readiness);
        }

        report
    }

    async fn drive(
        &self,
        resource: &Resource,
        launcher: &dyn ResourceLauncher,
        gates: &Gates<'_>,
        cancel: &CancellationToken,
    ) -> ResourceReport {
        let name = resource.name();

        if let Err(error) = self.transition(name, ResourceState::Starting) {
            return self.report(name, StartupOutcome::Failed { reason: error.to_string() });
        }
        let event = event_for(resource);
        self.notify(resource, |observer| observer.before_start(&event));

        let upstream = self.model.graph().dependencies_of(name);
        if !upstream.is_empty() {
            debug!(resource = name, waiting_on = ?upstream, "Waiting for dependencies");

            let gate = try_join_all(upstream.iter().map(|u| wait_ready(gates, u)));
            tokio::select! {
                biased;
                result = gate => {
                    if let Err(failed) = result {
                        // An upstream released by cancellation is not a failure.
                        let cause = if cancel.is_cancelled() && self.state(&failed) != Some(ResourceState::Failed) {
                            BlockCause::Cancelled
                        } else {
                            warn!(resource = name, upstream = %failed, "Dependency will never become ready");
                            BlockCause::UpstreamFailed { upstream: failed }
                        };
                        return self.report(
                            name,
                            StartupOutcome::Blocked {
                                waiting_on: self.not_ready(upstream),
                                cause,
                            },
                        );
                    }
                }
                _ = cancel.cancelled() => {
                    let waiting_on = self.not_ready(upstream);
                    debug!(resource = name, ?waiting_on, "Cancelled while waiting for dependencies");
                    return self.report(
                        name,
                        StartupOutcome::Blocked {
                            waiting_on,
                            cause: BlockCause::Cancelled,
                        },
                    );
                }
            }
        }

        let result = match self.model.environment(name) {
            Ok(environment) => {
                let started = async {
                    launcher.launch(resource, &environment, cancel).await?;
                    if resource.health_check().is_some() {
                        self.probe.wait_until_ready(resource, cancel).await
                    } else {
                        Ok(())
                    }
                };

                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(HostError::Cancelled { resource: name.to_string() }),
                    result = started => result,
                }
            }
            Err(error) => Err(error),
        };

        match result {
            Ok(()) => self.mark_ready(resource),
            Err(HostError::Cancelled { .. }) => {
                debug!(resource = name, "Startup cancelled");
                self.report(name, StartupOutcome::Cancelled)
            }
            Err(error) => self.mark_failed(resource, error),
        }
    }

    fn mark_ready(&self, resource: &Resource) -> ResourceReport {
        let name = resource.name();
        let elapsed = match self.transition(name, ResourceState::Ready) {
            Ok(elapsed) => elapsed,
            Err(error) => return self.report(name, StartupOutcome::Failed { reason: error.to_string() }),
        };

        let event = event_for(resource);
        self.notify(resource, |observer| observer.on_ready(&event, elapsed));

        info!(
            resource = name,
            tag = resource.image_tag().unwrap_or("none"),
            elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            "Resource {} is ready after {:?}",
            name,
            elapsed
        );
        self.report(name, StartupOutcome::Ready { elapsed })
    }

    fn mark_failed(&self, resource: &Resource, error: HostError) -> ResourceReport {
        let name = resource.name();
        if let Err(transition) = self.transition(name, ResourceState::Failed) {
            warn!(resource = name, %transition, "Could not record failure");
        }

        let event = event_for(resource);
        self.notify(resource, |observer| observer.on_failed(&event, &error));

        warn!(resource = name, %error, "Resource failed to start");
        self.report(name, StartupOutcome::Failed { reason: error.to_string() })
    }

    /// Move a resource to `to`, returning the time spent in `Starting`
    fn transition(&self, name: &str, to: ResourceState) -> Result<Duration> {
        let slot = self.slots.get(name).ok_or_else(|| HostError::UnknownResource {
            resource: name.to_string(),
            missing: name.to_string(),
        })?;
        let mut slot = slot.lock();

        let from = slot.state;
        if !from.can_transition_to(to) {
            return Err(HostError::InvalidTransition {
                resource: name.to_string(),
                from,
                to,
            });
        }

        slot.state = to;
        let elapsed = match to {
            ResourceState::Starting => {
                slot.started_at = Some(Utc::now());
                slot.timer = Some(Instant::now());
                Duration::ZERO
            }
            _ => slot.timer.take().map(|t| t.elapsed()).unwrap_or_default(),
        };

        debug!(resource = name, %from, %to, "Resource state changed");
        Ok(elapsed)
    }

    fn notify<F>(&self, resource: &Resource, f: F)
    where
        F: Fn(&dyn ResourceObserver),
    {
        for observer in self.observers.iter().chain(resource.observers()) {
            f(observer.as_ref());
        }
    }

    fn not_ready(&self, upstream: &[String]) -> Vec<String> {
        upstream
            .iter()
            .filter(|u| self.state(u) != Some(ResourceState::Ready))
            .cloned()
            .collect()
    }

    fn report(&self, name: &str, outcome: StartupOutcome) -> ResourceReport {
        let (state, started_at) = self
            .slots
            .get(name)
            .map(|slot| {
                let slot = slot.lock();
                (slot.state, slot.started_at)
            })
            .unwrap_or_default();

        ResourceReport {
            name: name.to_string(),
            state,
            outcome,
            started_at,
            finished_at: Utc::now(),
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("resources", &self.model.resources().len())
            .field("observers", &self.observers.len())
            .field("startup_timeout", &self.startup_timeout)
            .field("started", &self.started.load(Ordering::SeqCst))
            .finish()
    }
}

fn event_for(resource: &Resource) -> ResourceEvent {
    ResourceEvent {
        resource: resource.name().to_string(),
        image_tag: resource.image_tag().map(String::from),
        at: Utc::now(),
    }
}

/// Resolves once `upstream` is ready; fails with its name if it never will be
async fn wait_ready(gates: &Gates<'_>, upstream: &str) -> std::result::Result<(), String> {
    let Some(gate) = gates.get(upstream) else {
        return Err(upstream.to_string());
    };

    let mut receiver = gate.subscribe();
    let readiness = match receiver.wait_for(|r| *r != Readiness::Pending).await {
        Ok(readiness) => *readiness,
        Err(_) => Readiness::Never,
    };

    if readiness == Readiness::Ready {
        Ok(())
    } else {
        Err(upstream.to_string())
    }
}
