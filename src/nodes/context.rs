use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;

use crate::core::cancellation::CancellationHandle;
use crate::core::event_bus::ExecutionCallbacks;
use crate::core::http_client::HttpExecutor;
use crate::core::repository::FlowRepository;
use crate::core::runtime_context::RuntimeContext;
use crate::domain::execution::{ExecutionContext, LogEntry, LogLevel};
use crate::domain::model::Environment;
use crate::error::NodeError;
use crate::sandbox::ScriptCapability;
use crate::template::resolve_template;

/// Run context shared by every path of one run.
///
/// Never hold the guard across an `.await`.
pub type SharedContext = Arc<RwLock<ExecutionContext>>;

/// External collaborators available to node executors.
#[derive(Clone)]
pub struct NodeServices {
    pub repository: Arc<dyn FlowRepository>,
    pub http: Arc<dyn HttpExecutor>,
    pub scripts: Arc<dyn ScriptCapability>,
}

/// Everything a node executor may touch while it runs.
pub struct NodeContext<'a> {
    pub node_id: &'a str,
    pub context: &'a SharedContext,
    /// Enabled variables of the run's environment.
    pub env_vars: &'a BTreeMap<String, String>,
    pub environment: Option<&'a Environment>,
    pub services: &'a NodeServices,
    pub callbacks: &'a dyn ExecutionCallbacks,
    pub runtime: &'a RuntimeContext,
    pub cancel: &'a CancellationHandle,
}

impl NodeContext<'_> {
    /// Appends to `context.logs` and reports through `onLog`.
    pub fn log(&self, level: LogLevel, msg: impl Into<String>) {
        let msg = msg.into();
        self.context.write().logs.push(LogEntry {
            ts: self.runtime.now_millis(),
            level,
            msg: msg.clone(),
        });
        self.callbacks.on_log(level, &msg);
    }

    pub fn resolve(&self, template: &str) -> String {
        let ctx = self.context.read();
        resolve_template(template, &ctx.flow_vars, self.env_vars)
    }

    pub fn get_var(&self, key: &str) -> Option<Value> {
        self.context.read().get_var(key).cloned()
    }

    pub fn set_var(&self, key: impl Into<String>, value: Value) {
        self.context.write().set_var(key, value);
    }

    pub fn flow_vars(&self) -> HashMap<String, Value> {
        self.context.read().flow_vars.clone()
    }

    /// Publishes a snapshot of the context through `onContextUpdate`.
    pub fn publish(&self) {
        let snapshot = self.context.read().clone();
        self.callbacks.on_context_update(&snapshot);
    }

    pub fn ensure_not_cancelled(&self) -> Result<(), NodeError> {
        if self.cancel.is_cancelled() {
            return Err(NodeError::Cancelled);
        }
        Ok(())
    }
}
