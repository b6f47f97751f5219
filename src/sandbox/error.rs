use super::types::ScriptLog;

/// Sandbox errors
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Code too large (max {max} bytes, got {actual} bytes)")]
    CodeTooLarge { max: usize, actual: usize },

    #[error("Compilation error: {0}")]
    CompilationError(String),

    #[error("{0}")]
    ExecutionError(String),

    #[error("Resource limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    /// A failure that happened after the script wrote to the console.
    #[error("{error}")]
    WithLogs {
        error: Box<SandboxError>,
        logs: Vec<ScriptLog>,
    },
}

impl SandboxError {
    /// Console output the script produced before it failed.
    pub fn console_logs(&self) -> &[ScriptLog] {
        match self {
            SandboxError::WithLogs { logs, .. } => logs,
            _ => &[],
        }
    }

    pub(crate) fn with_logs(self, logs: Vec<ScriptLog>) -> Self {
        if logs.is_empty() {
            return self;
        }
        SandboxError::WithLogs {
            error: Box::new(self),
            logs,
        }
    }

    /// Classifies a boa error message.
    pub(crate) fn from_js_error(message: String) -> Self {
        if message.starts_with("SyntaxError") {
            SandboxError::CompilationError(message)
        } else if message.contains("Maximum loop iteration limit")
            || message.contains("Maximum recursion limit")
        {
            SandboxError::LimitExceeded(message)
        } else {
            SandboxError::ExecutionError(message)
        }
    }
}
