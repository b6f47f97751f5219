use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

use crate::domain::execution::LogLevel;

use super::error::SandboxError;

// ================================
// ScriptCapability Trait
// ================================

/// Executes user-authored code against a restricted set of bindings.
///
/// Implementations must isolate the script: a throwing or invalid script is
/// reported as `Err`, never as a panic, and the script sees nothing beyond
/// the bindings it is given. Effects come back in the [`ScriptOutcome`];
/// nothing is applied to the run until the caller does so.
#[async_trait::async_trait]
pub trait ScriptCapability: Send + Sync {
    async fn run(&self, request: ScriptRequest) -> Result<ScriptOutcome, SandboxError>;
}

/// Selects the parameter list the user code is compiled with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptKind {
    /// Map node: `(input, flowVars)`, the return value is the result.
    Transform,
    /// Script node: `(flowVars, setVar, getVar, console)`.
    Logic,
    /// Request hook: `(request, environment, response, setEnv, getEnv, console)`.
    PreRequest,
    PostRequest,
}

/// Values visible to a script.
#[derive(Debug, Clone, Default)]
pub struct ScriptBindings {
    /// Map input; `None` is passed as `undefined`.
    pub input: Option<Value>,
    pub flow_vars: HashMap<String, Value>,
    /// Fallback for `getEnv` once flow variables miss.
    pub env_vars: BTreeMap<String, String>,
    pub request: Option<Value>,
    pub response: Option<Value>,
    pub environment: Option<Value>,
}

#[derive(Debug, Clone)]
pub struct ScriptRequest {
    pub code: String,
    pub kind: ScriptKind,
    pub bindings: ScriptBindings,
}

impl ScriptRequest {
    pub fn new(code: impl Into<String>, kind: ScriptKind, bindings: ScriptBindings) -> Self {
        Self {
            code: code.into(),
            kind,
            bindings,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScriptLog {
    pub level: LogLevel,
    pub msg: String,
}

/// Result of a successful script run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptOutcome {
    /// Return value; `None` when the script returned `undefined`.
    pub value: Option<Value>,
    /// Flow variables as the script left them.
    pub flow_vars: HashMap<String, Value>,
    pub logs: Vec<ScriptLog>,
    /// The request binding as the script left it.
    pub request: Option<Value>,
}

impl ScriptOutcome {
    /// Changes relative to `before`: `(key, Some(value))` for writes and
    /// `(key, None)` for deletions.
    pub fn flow_var_changes(
        &self,
        before: &HashMap<String, Value>,
    ) -> Vec<(String, Option<Value>)> {
        let mut changes: Vec<(String, Option<Value>)> = self
            .flow_vars
            .iter()
            .filter(|(k, v)| before.get(*k) != Some(*v))
            .map(|(k, v)| (k.clone(), Some(v.clone())))
            .collect();
        changes.extend(
            before
                .keys()
                .filter(|k| !self.flow_vars.contains_key(*k))
                .map(|k| (k.clone(), None)),
        );
        changes.sort_by(|a, b| a.0.cmp(&b.0));
        changes
    }
}

/// Limits applied to every script run.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScriptConfig {
    /// Max code length (bytes)
    pub max_code_length: usize,
    pub loop_iteration_limit: u64,
    pub recursion_limit: usize,
    /// Freeze global objects before user code runs
    pub freeze_globals: bool,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            max_code_length: 1_000_000, // 1MB
            loop_iteration_limit: 1_000_000,
            recursion_limit: 512,
            freeze_globals: true,
        }
    }
}
