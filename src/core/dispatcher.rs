//! Graph traversal engine.
//!
//! Traversal is recursive and depth-first. After a node finishes its own
//! work the dispatcher follows the route it returned: the first outgoing
//! edge, the matching condition branch, every item of a loop (sequentially)
//! or every outgoing edge of a parallel node (concurrently, fail-fast).

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use serde_json::{json, Value};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::core::cancellation::{CancelReason, CancellationHandle};
use crate::core::event_bus::ExecutionCallbacks;
use crate::core::runtime_context::RuntimeContext;
use crate::domain::execution::{
    ExecutionContext, LogEntry, LogLevel, NodeExecutionResult, NodeResultStatus,
};
use crate::domain::model::{Environment, Flow};
use crate::error::{FlowError, FlowResult, NodeError};
use crate::graph::{EdgeType, FlowGraph};
use crate::nodes::{execute_node, LoopPlan, NodeContext, NodeOutcome, NodeServices, Route, SharedContext};
use crate::sandbox::ScriptConfig;

/// Configuration for the flow engine
#[derive(Debug, Clone, serde::Deserialize, serde::Serialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Node executions per run, loop iterations included; 0 = unlimited.
    pub max_steps: usize,
    /// Wall-clock limit per run; 0 = unlimited.
    pub max_execution_time_secs: u64,
    pub script: ScriptConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            max_steps: 0,
            max_execution_time_secs: 0,
            script: ScriptConfig::default(),
        }
    }
}

type Traversal = Pin<Box<dyn Future<Output = FlowResult<()>> + Send>>;

/// State shared by every path of one run.
struct RunState {
    flow_id: String,
    graph: Arc<FlowGraph>,
    services: NodeServices,
    callbacks: Arc<dyn ExecutionCallbacks>,
    runtime: RuntimeContext,
    config: EngineConfig,
    context: SharedContext,
    env_vars: BTreeMap<String, String>,
    environment: Option<Environment>,
    steps: AtomicUsize,
}

/// Executes one flow against a fresh [`ExecutionContext`].
pub struct FlowDispatcher {
    flow_id: String,
    environment_id: Option<String>,
    graph: Arc<FlowGraph>,
    services: NodeServices,
    callbacks: Arc<dyn ExecutionCallbacks>,
    runtime: RuntimeContext,
    config: EngineConfig,
    context: SharedContext,
}

impl FlowDispatcher {
    pub fn new(
        flow: &Flow,
        services: NodeServices,
        callbacks: Arc<dyn ExecutionCallbacks>,
        runtime: RuntimeContext,
        config: EngineConfig,
    ) -> Self {
        Self {
            flow_id: flow.id.clone(),
            environment_id: flow.environment_id.clone().filter(|id| !id.is_empty()),
            graph: Arc::new(FlowGraph::build(flow)),
            services,
            callbacks,
            runtime,
            config,
            context: Arc::new(RwLock::new(ExecutionContext::new(flow.initial_variables()))),
        }
    }

    /// Live context of this run.
    pub fn context(&self) -> SharedContext {
        self.context.clone()
    }

    pub fn context_snapshot(&self) -> ExecutionContext {
        self.context.read().clone()
    }

    /// Runs the flow until every path has ended, failed or observed
    /// cancellation.
    ///
    /// Returns `FlowError::Stopped` for a user stop and `FlowError::Timeout`
    /// when `max_execution_time_secs` elapsed.
    pub async fn execute(&self, cancel: &CancellationHandle) -> FlowResult<()> {
        info!(flow_id = %self.flow_id, "flow run started");

        let result = self.execute_inner(cancel).await;
        let result = match result {
            Err(FlowError::Stopped) if cancel.reason() == Some(CancelReason::TimedOut) => {
                Err(FlowError::Timeout)
            }
            other => other,
        };

        match &result {
            Ok(()) => info!(flow_id = %self.flow_id, "flow run succeeded"),
            Err(FlowError::Stopped) => {
                info!(flow_id = %self.flow_id, "flow run stopped");
                self.log(LogLevel::Info, "Flow execution stopped");
            }
            Err(e) => {
                warn!(flow_id = %self.flow_id, error = %e, "flow run failed");
                let msg = match e {
                    FlowError::NodeFailed { error, .. } => error.to_string(),
                    other => other.to_string(),
                };
                self.log(LogLevel::Error, msg);
            }
        }
        self.callbacks.on_context_update(&self.context_snapshot());
        result
    }

    async fn execute_inner(&self, cancel: &CancellationHandle) -> FlowResult<()> {
        let environment = match &self.environment_id {
            Some(id) => Some(
                self.services
                    .repository
                    .get_environment(id)
                    .await
                    .ok_or_else(|| FlowError::EnvironmentNotFound(id.clone()))?,
            ),
            None => None,
        };
        let env_vars = environment
            .as_ref()
            .map(Environment::enabled_variables)
            .unwrap_or_default();

        let start_id = self
            .graph
            .start_node()
            .map(|n| n.id.clone())
            .ok_or(FlowError::NoStartNode)?;

        let state = Arc::new(RunState {
            flow_id: self.flow_id.clone(),
            graph: self.graph.clone(),
            services: self.services.clone(),
            callbacks: self.callbacks.clone(),
            runtime: self.runtime.clone(),
            config: self.config.clone(),
            context: self.context.clone(),
            env_vars,
            environment,
            steps: AtomicUsize::new(0),
        });

        let timer = (self.config.max_execution_time_secs > 0).then(|| {
            let limit = Duration::from_secs(self.config.max_execution_time_secs);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                cancel.cancel_with(CancelReason::TimedOut);
            })
        });

        let result = state.visit(start_id, cancel.clone()).await;

        if let Some(timer) = timer {
            timer.abort();
        }
        result
    }

    fn log(&self, level: LogLevel, msg: impl Into<String>) {
        let msg = msg.into();
        self.context.write().logs.push(LogEntry {
            ts: self.runtime.now_millis(),
            level,
            msg: msg.clone(),
        });
        self.callbacks.on_log(level, &msg);
    }
}

impl RunState {
    fn visit(self: &Arc<Self>, node_id: String, cancel: CancellationHandle) -> Traversal {
        let state = self.clone();
        Box::pin(async move { state.visit_inner(&node_id, &cancel).await })
    }

    async fn visit_inner(self: &Arc<Self>, node_id: &str, cancel: &CancellationHandle) -> FlowResult<()> {
        if cancel.is_cancelled() {
            return Err(FlowError::Stopped);
        }
        let Some(node) = self.graph.get_node(node_id) else {
            return Ok(());
        };
        self.count_step()?;

        debug!(flow_id = %self.flow_id, node_id, node_type = node.type_name(), "node started");
        self.callbacks.on_node_start(node_id);
        let start_time = self.runtime.now_millis();

        let result = {
            let ctx = NodeContext {
                node_id,
                context: &self.context,
                env_vars: &self.env_vars,
                environment: self.environment.as_ref(),
                services: &self.services,
                callbacks: self.callbacks.as_ref(),
                runtime: &self.runtime,
                cancel,
            };
            execute_node(node, &ctx).await
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(error) => return Err(self.fail_node(node_id, start_time, error)),
        };

        match outcome.route.clone() {
            Route::Next => {
                self.succeed_node(node_id, start_time, outcome);
                match self.graph.first_successor(node_id) {
                    Some(next) => self.visit(next.to_string(), cancel.clone()).await,
                    None => Ok(()),
                }
            }
            Route::Branch(result) => {
                self.succeed_node(node_id, start_time, outcome);
                // No matching edge ends the path quietly.
                match self
                    .graph
                    .get_successor_by_edge_type(node_id, &EdgeType::branch(result))
                {
                    Some(next) => self.visit(next.to_string(), cancel.clone()).await,
                    None => Ok(()),
                }
            }
            Route::End => {
                self.succeed_node(node_id, start_time, outcome);
                Ok(())
            }
            Route::Iterate(plan) => {
                let result = self.run_loop(node_id, plan, cancel).await;
                self.finish_container(node_id, start_time, outcome, result)
            }
            Route::FanOut => {
                let result = self.run_parallel(node_id, cancel).await;
                self.finish_container(node_id, start_time, outcome, result)
            }
        }
    }

    /// Binds each item and re-runs the downstream subgraph. Completed
    /// iterations keep their effects when a later one fails.
    async fn run_loop(
        self: &Arc<Self>,
        node_id: &str,
        plan: LoopPlan,
        cancel: &CancellationHandle,
    ) -> FlowResult<()> {
        let next = self.graph.first_successor(node_id).map(str::to_string);
        let total = plan.items.len();

        for (index, item) in plan.items.into_iter().enumerate() {
            if cancel.is_cancelled() {
                return Err(FlowError::Stopped);
            }
            debug!(flow_id = %self.flow_id, node_id, index, total, "loop iteration");
            {
                let mut ctx = self.context.write();
                ctx.set_var(plan.item_var.clone(), item);
                if let Some(index_var) = &plan.index_var {
                    ctx.set_var(index_var.clone(), json!(index));
                }
            }
            self.publish();

            if let Some(next) = &next {
                self.visit(next.clone(), cancel.clone()).await?;
            }
        }
        Ok(())
    }

    /// Runs every outgoing edge concurrently. The first failure cancels the
    /// remaining branches; the join reports it once all branches returned.
    async fn run_parallel(self: &Arc<Self>, node_id: &str, cancel: &CancellationHandle) -> FlowResult<()> {
        let targets: Vec<String> = self
            .graph
            .get_successors(node_id)
            .into_iter()
            .map(str::to_string)
            .collect();
        info!(flow_id = %self.flow_id, node_id, branches = targets.len(), "parallel fan-out");

        let branch_cancel = cancel.child();
        let mut join_set: JoinSet<FlowResult<()>> = JoinSet::new();
        for target in targets {
            join_set.spawn(self.visit(target, branch_cancel.clone()));
        }

        let mut first_error: Option<FlowError> = None;
        let mut stopped = false;
        while let Some(joined) = join_set.join_next().await {
            let result = joined.unwrap_or_else(|e| Err(FlowError::InternalError(e.to_string())));
            match result {
                Ok(()) => {}
                Err(FlowError::Stopped) => stopped = true,
                Err(e) => {
                    if first_error.is_none() {
                        debug!(flow_id = %self.flow_id, node_id, error = %e, "branch failed, cancelling siblings");
                        branch_cancel.cancel();
                        first_error = Some(e);
                    }
                }
            }
        }
        info!(flow_id = %self.flow_id, node_id, "parallel join complete");

        match first_error {
            Some(e) => Err(e),
            None if stopped || cancel.is_cancelled() => Err(FlowError::Stopped),
            None => Ok(()),
        }
    }

    fn count_step(&self) -> FlowResult<()> {
        let steps = self.steps.fetch_add(1, Ordering::AcqRel) + 1;
        if self.config.max_steps > 0 && steps > self.config.max_steps {
            return Err(FlowError::MaxStepsExceeded(self.config.max_steps));
        }
        Ok(())
    }

    /// Completes a loop or parallel node after its downstream work.
    fn finish_container(
        &self,
        node_id: &str,
        start_time: i64,
        outcome: NodeOutcome,
        result: FlowResult<()>,
    ) -> FlowResult<()> {
        match result {
            Ok(()) => {
                self.succeed_node(node_id, start_time, outcome);
                Ok(())
            }
            Err(FlowError::Stopped) => {
                self.callbacks.on_node_stopped(node_id);
                Err(FlowError::Stopped)
            }
            Err(e) => {
                let message = match &e {
                    FlowError::NodeFailed { error, .. } => error.to_string(),
                    other => other.to_string(),
                };
                self.record_error(node_id, start_time, &message);
                Err(e)
            }
        }
    }

    fn succeed_node(&self, node_id: &str, start_time: i64, outcome: NodeOutcome) {
        let end_time = self.runtime.now_millis();
        let data = outcome.data;
        self.context.write().record_result(NodeExecutionResult {
            node_id: node_id.to_string(),
            status: NodeResultStatus::Success,
            start_time,
            end_time,
            request: outcome.request,
            response: outcome.response,
            error: None,
            data: data.clone(),
        });
        debug!(flow_id = %self.flow_id, node_id, "node succeeded");
        self.callbacks.on_node_success(node_id, data.as_ref());
        self.publish();
    }

    fn fail_node(&self, node_id: &str, start_time: i64, error: NodeError) -> FlowError {
        if error.is_cancelled() {
            debug!(flow_id = %self.flow_id, node_id, "node stopped");
            self.callbacks.on_node_stopped(node_id);
            return FlowError::Stopped;
        }
        self.record_error(node_id, start_time, &error.to_string());
        FlowError::NodeFailed {
            node_id: node_id.to_string(),
            error,
        }
    }

    fn record_error(&self, node_id: &str, start_time: i64, message: &str) {
        let end_time = self.runtime.now_millis();
        self.context.write().record_result(NodeExecutionResult {
            node_id: node_id.to_string(),
            status: NodeResultStatus::Error,
            start_time,
            end_time,
            request: None,
            response: None,
            error: Some(message.to_string()),
            data: None,
        });
        warn!(flow_id = %self.flow_id, node_id, error = message, "node failed");
        self.callbacks.on_node_error(node_id, message);
        self.publish();
    }

    fn publish(&self) {
        let snapshot = self.context.read().clone();
        self.callbacks.on_context_update(&snapshot);
    }
}
