//! High-level flow runner and builder.
//!
//! [`FlowRunner`] (constructed via [`FlowRunnerBuilder`]) is the main entry
//! point for executing a flow. It wires the repository, the HTTP executor
//! and the script runner into a [`FlowDispatcher`] per run and reports
//! through a [`RunTracker`].

use std::sync::Arc;

use tracing::{error, info};

use crate::core::{
    CancellationHandle, EngineConfig, EventSender, FlowDispatcher, FlowRepository, HttpExecutor,
    HttpPoolConfig, InMemoryRepository, ReqwestHttpExecutor, RuntimeContext,
};
use crate::domain::model::Flow;
use crate::dsl::{validate_flow, ValidationReport};
use crate::error::{FlowError, FlowResult};
use crate::nodes::NodeServices;
use crate::sandbox::{BoaScriptRunner, ScriptCapability};

use super::handle::FlowRunHandle;
use super::tracker::{RunSnapshot, RunTracker};

/// Runs flows one at a time against a shared set of collaborators.
///
/// Use [`FlowRunner::builder()`](Self::builder) to obtain a
/// [`FlowRunnerBuilder`].
pub struct FlowRunner {
    services: NodeServices,
    runtime: RuntimeContext,
    config: EngineConfig,
    tracker: Arc<RunTracker>,
    validate: bool,
}

impl FlowRunner {
    pub fn builder() -> FlowRunnerBuilder {
        FlowRunnerBuilder::default()
    }

    pub fn tracker(&self) -> &Arc<RunTracker> {
        &self.tracker
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn validate(&self, flow: &Flow) -> ValidationReport {
        validate_flow(flow)
    }

    /// Launch `flow` in the background and return a handle to it.
    ///
    /// Fails with `AlreadyRunning` while a previous run has not finished and
    /// with `ValidationFailed` when validation is enabled and the flow has
    /// errors. Must be called within a tokio runtime.
    pub fn start(&self, flow: &Flow) -> FlowResult<FlowRunHandle> {
        if self.validate {
            let report = validate_flow(flow);
            if !report.is_valid {
                return Err(FlowError::ValidationFailed(Box::new(report)));
            }
        }

        let cancel = CancellationHandle::new();
        self.tracker.begin(flow, cancel.clone())?;
        info!(flow_id = %flow.id, flow_name = %flow.name, "starting flow run");

        let dispatcher = FlowDispatcher::new(
            flow,
            self.services.clone(),
            self.tracker.clone(),
            self.runtime.clone(),
            self.config.clone(),
        );
        let tracker = self.tracker.clone();
        let run_cancel = cancel.clone();
        let join = tokio::spawn(async move {
            // A panicking collaborator must still leave the tracker terminal.
            let result = tokio::spawn(async move { dispatcher.execute(&run_cancel).await })
                .await
                .unwrap_or_else(|e| {
                    error!(error = %e, "flow run task panicked");
                    Err(FlowError::InternalError(format!("run task failed: {}", e)))
                });
            tracker.finish(&result);
            result
        });

        Ok(FlowRunHandle::new(self.tracker.clone(), cancel, join))
    }

    /// Run `flow` to completion and return the final snapshot.
    ///
    /// Engine failures end up in the snapshot (`status`, `error`). A run
    /// that cannot start, or whose task died, returns `Err`.
    pub async fn run(&self, flow: &Flow) -> FlowResult<RunSnapshot> {
        let handle = self.start(flow)?;
        match handle.join().await {
            Err(e @ FlowError::InternalError(_)) => Err(e),
            _ => Ok(self.tracker.snapshot()),
        }
    }

    /// Stop the current run, if any.
    pub fn stop(&self) -> bool {
        self.tracker.stop()
    }

    /// Return a finished run to `idle`.
    pub fn reset(&self) -> FlowResult<()> {
        self.tracker.reset()
    }
}

/// Builder for [`FlowRunner`].
#[derive(Default)]
pub struct FlowRunnerBuilder {
    repository: Option<Arc<dyn FlowRepository>>,
    http: Option<Arc<dyn HttpExecutor>>,
    http_pool: HttpPoolConfig,
    scripts: Option<Arc<dyn ScriptCapability>>,
    config: EngineConfig,
    runtime: Option<RuntimeContext>,
    observer: Option<EventSender>,
    validate: bool,
}

impl FlowRunnerBuilder {
    /// Collection/environment source. Defaults to an empty in-memory one.
    pub fn repository(mut self, repository: Arc<dyn FlowRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// HTTP collaborator. Defaults to a [`ReqwestHttpExecutor`] built from
    /// [`http_pool`](Self::http_pool).
    pub fn http_executor(mut self, http: Arc<dyn HttpExecutor>) -> Self {
        self.http = Some(http);
        self
    }

    pub fn http_pool(mut self, config: HttpPoolConfig) -> Self {
        self.http_pool = config;
        self
    }

    /// Script capability. Defaults to a [`BoaScriptRunner`] using
    /// `config.script`.
    pub fn script_runner(mut self, scripts: Arc<dyn ScriptCapability>) -> Self {
        self.scripts = Some(scripts);
        self
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn runtime(mut self, runtime: RuntimeContext) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// Receive every callback as a [`FlowEvent`](crate::core::FlowEvent).
    pub fn observer(mut self, sender: EventSender) -> Self {
        self.observer = Some(sender);
        self
    }

    /// Refuse to start flows whose validation report has errors.
    pub fn validate_before_run(mut self, validate: bool) -> Self {
        self.validate = validate;
        self
    }

    pub fn build(self) -> FlowResult<FlowRunner> {
        let http: Arc<dyn HttpExecutor> = match self.http {
            Some(http) => http,
            None => Arc::new(
                ReqwestHttpExecutor::new(self.http_pool)
                    .map_err(|e| FlowError::InternalError(e.to_string()))?,
            ),
        };
        let scripts: Arc<dyn ScriptCapability> = match self.scripts {
            Some(scripts) => scripts,
            None => Arc::new(BoaScriptRunner::new(self.config.script.clone())),
        };
        let repository = self
            .repository
            .unwrap_or_else(|| Arc::new(InMemoryRepository::new()));
        let runtime = self.runtime.unwrap_or_default();

        let mut tracker = RunTracker::new(runtime.clone());
        if let Some(sender) = self.observer {
            tracker = tracker.with_observer(sender);
        }

        Ok(FlowRunner {
            services: NodeServices {
                repository,
                http,
                scripts,
            },
            runtime,
            config: self.config,
            tracker: Arc::new(tracker),
            validate: self.validate,
        })
    }
}
