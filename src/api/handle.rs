use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::core::CancellationHandle;
use crate::domain::execution::{ExecutionContext, RunStatus, TimelineEvent};
use crate::error::{FlowError, FlowResult};

use super::tracker::{RunSnapshot, RunTracker};

/// Handle to one launched run.
pub struct FlowRunHandle {
    tracker: Arc<RunTracker>,
    cancel: CancellationHandle,
    join: JoinHandle<FlowResult<()>>,
}

impl FlowRunHandle {
    pub(crate) fn new(
        tracker: Arc<RunTracker>,
        cancel: CancellationHandle,
        join: JoinHandle<FlowResult<()>>,
    ) -> Self {
        Self {
            tracker,
            cancel,
            join,
        }
    }

    /// Return the current run status (non-blocking).
    pub fn status(&self) -> RunStatus {
        self.tracker.status()
    }

    /// Request cooperative cancellation of this run.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Block until the run reaches a terminal status.
    pub async fn wait(&self) -> RunStatus {
        self.tracker.wait().await
    }

    pub fn timeline(&self) -> Vec<TimelineEvent> {
        self.tracker.timeline()
    }

    pub fn context(&self) -> ExecutionContext {
        self.tracker.context()
    }

    pub fn snapshot(&self) -> RunSnapshot {
        self.tracker.snapshot()
    }

    /// Wait for the run task and return the engine's result.
    pub async fn join(self) -> FlowResult<()> {
        self.join
            .await
            .map_err(|e| FlowError::InternalError(format!("run task failed: {}", e)))?
    }
}
