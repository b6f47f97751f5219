//! Flow-level error types.

use super::NodeError;
use crate::dsl::ValidationReport;
use thiserror::Error;

/// Flow-level errors
#[derive(Debug, Clone, Error)]
pub enum FlowError {
    #[error("Flow parse error: {0}")]
    DslParseError(String),
    #[error("No start node found")]
    NoStartNode,
    #[error("Environment {0} not found")]
    EnvironmentNotFound(String),
    #[error("Max steps exceeded: {0}")]
    MaxStepsExceeded(usize),
    #[error("Flow execution timed out")]
    Timeout,
    #[error("A run is already in progress")]
    AlreadyRunning,
    #[error("Validation failed")]
    ValidationFailed(Box<ValidationReport>),
    #[error("Node {node_id} failed: {error}")]
    NodeFailed { node_id: String, error: NodeError },
    #[error("Flow execution stopped")]
    Stopped,
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl FlowError {
    pub fn is_stopped(&self) -> bool {
        matches!(self, FlowError::Stopped)
    }

    /// The id of the node that raised the failure, if any.
    pub fn failed_node(&self) -> Option<&str> {
        match self {
            FlowError::NodeFailed { node_id, .. } => Some(node_id),
            _ => None,
        }
    }
}

impl From<NodeError> for FlowError {
    fn from(value: NodeError) -> Self {
        match value {
            NodeError::Cancelled => FlowError::Stopped,
            other => FlowError::InternalError(other.to_string()),
        }
    }
}
