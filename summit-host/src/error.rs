//! Host errors

use crate::state::ResourceState;
use thiserror::Error;

/// Errors raised while modelling or starting resources
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HostError {
    #[error("Resource '{resource}' refers to unknown resource '{missing}'")]
    UnknownResource { resource: String, missing: String },

    #[error("Resource '{0}' is defined more than once")]
    DuplicateResource(String),

    #[error("Resources wait for each other in a cycle: {}", .0.join(" -> "))]
    DependencyCycle(Vec<String>),

    #[error("Resource '{resource}' failed to start: {reason}")]
    Failed { resource: String, reason: String },

    #[error("Resource '{resource}' cannot start because '{upstream}' did not become ready")]
    UpstreamFailed { resource: String, upstream: String },

    #[error("Startup of resource '{resource}' was cancelled")]
    Cancelled { resource: String },

    #[error("Orchestration has already been started")]
    AlreadyStarted,

    #[error("{0}")]
    ConflictingConfigSource(String),

    #[error("Resource '{resource}' cannot move from {from} to {to}")]
    InvalidTransition {
        resource: String,
        from: ResourceState,
        to: ResourceState,
    },
}

impl HostError {
    pub fn failed(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::Failed {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Result type for host operations
pub type Result<T> = std::result::Result<T, HostError>;
