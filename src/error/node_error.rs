use thiserror::Error;

use crate::sandbox::SandboxError;

/// Node-level errors
#[derive(Debug, Clone, Error)]
pub enum NodeError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Lookup error: {0}")]
    LookupError(String),
    #[error("Variable not found: {0}")]
    VariableNotFound(String),
    #[error("Type error: {0}")]
    TypeError(String),
    #[error("Execution error: {0}")]
    ExecutionError(String),
    #[error("HTTP error: {0}")]
    HttpError(String),
    #[error("Script error: {0}")]
    ScriptError(String),
    #[error("Map script error: {0}")]
    MapScriptError(String),
    #[error("Serialization error: {0}")]
    SerializationError(String),
    #[error("Execution cancelled")]
    Cancelled,
}

impl NodeError {
    /// Cancellation is reported as a stopped run, never as a node failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, NodeError::Cancelled)
    }
}

impl From<serde_json::Error> for NodeError {
    fn from(e: serde_json::Error) -> Self {
        NodeError::SerializationError(e.to_string())
    }
}

impl From<SandboxError> for NodeError {
    fn from(e: SandboxError) -> Self {
        NodeError::ScriptError(e.to_string())
    }
}
