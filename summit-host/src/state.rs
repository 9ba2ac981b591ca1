//! Per-resource startup state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Startup state of one resource
///
/// `NotStarted -> Starting -> Ready | Failed`. `Ready` and `Failed` are
/// terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    #[default]
    NotStarted,
    Starting,
    Ready,
    Failed,
}

impl ResourceState {
    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(self, next: ResourceState) -> bool {
        matches!(
            (self, next),
            (Self::NotStarted, Self::Starting)
                | (Self::Starting, Self::Ready)
                | (Self::Starting, Self::Failed)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::NotStarted => "NotStarted",
            Self::Starting => "Starting",
            Self::Ready => "Ready",
            Self::Failed => "Failed",
        };
        f.write_str(s)
    }
}
