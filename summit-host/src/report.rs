//! Startup results

use crate::error::HostError;
use crate::state::ResourceState;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Why a resource never got past its wait-for gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockCause {
    /// An upstream resource will never become ready
    UpstreamFailed { upstream: String },
    /// Orchestration was cancelled while waiting
    Cancelled,
}

/// How the startup of one resource ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StartupOutcome {
    Ready { elapsed: Duration },
    Failed { reason: String },
    /// Still `Starting`, waiting for upstream resources that are not ready
    Blocked {
        waiting_on: Vec<String>,
        cause: BlockCause,
    },
    /// Cancelled after the gate opened, while launching or probing
    Cancelled,
}

/// Final state of one resource
#[derive(Debug, Clone, Serialize)]
pub struct ResourceReport {
    pub name: String,
    pub state: ResourceState,
    pub outcome: StartupOutcome,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: DateTime<Utc>,
}

impl ResourceReport {
    pub fn is_ready(&self) -> bool {
        matches!(self.outcome, StartupOutcome::Ready { .. })
    }

    pub fn is_blocked(&self) -> bool {
        matches!(self.outcome, StartupOutcome::Blocked { .. })
    }

    /// The outcome as an error, `None` when the resource became ready
    pub fn error(&self) -> Option<HostError> {
        let resource = self.name.clone();
        match &self.outcome {
            StartupOutcome::Ready { .. } => None,
            StartupOutcome::Failed { reason } => Some(HostError::Failed {
                resource,
                reason: reason.clone(),
            }),
            StartupOutcome::Blocked {
                cause: BlockCause::UpstreamFailed { upstream },
                ..
            } => Some(HostError::UpstreamFailed {
                resource,
                upstream: upstream.clone(),
            }),
            StartupOutcome::Blocked {
                cause: BlockCause::Cancelled,
                ..
            }
            | StartupOutcome::Cancelled => Some(HostError::Cancelled { resource }),
        }
    }
}

/// Outcome of a whole orchestration run, in declaration order
#[derive(Debug, Clone, Default, Serialize)]
pub struct StartupReport {
    pub resources: Vec<ResourceReport>,
}

impl StartupReport {
    pub fn get(&self, name: &str) -> Option<&ResourceReport> {
        self.resources.iter().find(|r| r.name == name)
    }

    pub fn outcome(&self, name: &str) -> Option<&StartupOutcome> {
        self.get(name).map(|r| &r.outcome)
    }

    pub fn is_success(&self) -> bool {
        self.resources.iter().all(ResourceReport::is_ready)
    }

    pub fn ready(&self) -> impl Iterator<Item = &ResourceReport> {
        self.resources.iter().filter(|r| r.is_ready())
    }

    pub fn blocked(&self) -> impl Iterator<Item = &ResourceReport> {
        self.resources.iter().filter(|r| r.is_blocked())
    }

    pub fn failed(&self) -> impl Iterator<Item = &ResourceReport> {
        self.resources
            .iter()
            .filter(|r| matches!(r.outcome, StartupOutcome::Failed { .. }))
    }

    /// First error in declaration order
    pub fn first_error(&self) -> Option<HostError> {
        self.resources.iter().find_map(ResourceReport::error)
    }
}
