//! Run and node status — the canonical execution states reported by a run.

use serde::{Deserialize, Serialize};

/// Status of a whole run.
///
/// `Idle → Running → {Success, Error, Stopped}`. Terminal states only leave
/// through an explicit reset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Idle,
    Running,
    Success,
    Error,
    Stopped,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Success | RunStatus::Error | RunStatus::Stopped)
    }
}

/// Status of a single node within a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeStatus {
    #[default]
    Pending,
    Running,
    Success,
    Error,
    Stopped,
}

/// Outcome recorded in a [`NodeExecutionResult`](super::NodeExecutionResult).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeResultStatus {
    Success,
    Error,
}
