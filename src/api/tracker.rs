//! Run-scoped state tracker fed by the engine's callbacks.

use std::collections::HashMap;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use tokio::sync::watch;
use tracing::debug;

use crate::core::{CancellationHandle, ChannelObserver, EventSender, ExecutionCallbacks, FlowEvent, RuntimeContext};
use crate::domain::execution::{
    ExecutionContext, LogLevel, NodeStatus, RunStatus, TimelineEvent, TimelineEventType,
};
use crate::domain::model::{Flow, NodeKind};
use crate::error::{FlowError, FlowResult};

/// Point-in-time copy of everything a [`RunTracker`] knows.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSnapshot {
    pub status: RunStatus,
    pub node_statuses: HashMap<String, NodeStatus>,
    pub timeline: Vec<TimelineEvent>,
    pub context: ExecutionContext,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Default)]
struct TrackerState {
    node_names: HashMap<String, String>,
    node_statuses: HashMap<String, NodeStatus>,
    timeline: Vec<TimelineEvent>,
    context: ExecutionContext,
    cancel: Option<CancellationHandle>,
    error: Option<String>,
}

impl TrackerState {
    fn name_of<'a>(&'a self, node_id: &'a str) -> &'a str {
        self.node_names.get(node_id).map(String::as_str).unwrap_or(node_id)
    }
}

/// 运行状态跟踪器
///
/// Status machine `idle → running → {success, error, stopped}` plus the
/// per-node status map, the append-only timeline and the latest context
/// snapshot. One tracker serves one run at a time; [`reset`](Self::reset)
/// returns a finished run to `idle`.
pub struct RunTracker {
    runtime: RuntimeContext,
    status_tx: watch::Sender<RunStatus>,
    state: Mutex<TrackerState>,
    observer: Option<ChannelObserver>,
}

impl RunTracker {
    pub fn new(runtime: RuntimeContext) -> Self {
        let (status_tx, _) = watch::channel(RunStatus::Idle);
        Self {
            runtime,
            status_tx,
            state: Mutex::new(TrackerState::default()),
            observer: None,
        }
    }

    /// Forward every callback as a [`FlowEvent`] as well.
    pub fn with_observer(mut self, sender: EventSender) -> Self {
        self.observer = Some(ChannelObserver::new(sender));
        self
    }

    pub fn status(&self) -> RunStatus {
        *self.status_tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<RunStatus> {
        self.status_tx.subscribe()
    }

    pub fn node_status(&self, node_id: &str) -> Option<NodeStatus> {
        self.state.lock().node_statuses.get(node_id).copied()
    }

    pub fn timeline(&self) -> Vec<TimelineEvent> {
        self.state.lock().timeline.clone()
    }

    pub fn context(&self) -> ExecutionContext {
        self.state.lock().context.clone()
    }

    /// Message of the error that ended the last run.
    pub fn last_error(&self) -> Option<String> {
        self.state.lock().error.clone()
    }

    pub fn snapshot(&self) -> RunSnapshot {
        let state = self.state.lock();
        RunSnapshot {
            status: self.status(),
            node_statuses: state.node_statuses.clone(),
            timeline: state.timeline.clone(),
            context: state.context.clone(),
            error: state.error.clone(),
        }
    }

    /// Enter `running` for `flow`, clearing the previous run.
    pub(crate) fn begin(&self, flow: &Flow, cancel: CancellationHandle) -> FlowResult<()> {
        let mut state = self.state.lock();
        if self.status() == RunStatus::Running {
            return Err(FlowError::AlreadyRunning);
        }
        *state = TrackerState {
            node_names: flow
                .nodes
                .iter()
                .map(|n| (n.id.clone(), display_name(&n.id, &n.kind)))
                .collect(),
            node_statuses: flow
                .nodes
                .iter()
                .map(|n| (n.id.clone(), NodeStatus::Pending))
                .collect(),
            context: ExecutionContext::new(flow.initial_variables()),
            cancel: Some(cancel),
            ..Default::default()
        };
        self.status_tx.send_replace(RunStatus::Running);
        Ok(())
    }

    /// Record the run's outcome and enter the matching terminal status.
    pub(crate) fn finish(&self, result: &FlowResult<()>) -> RunStatus {
        let (status, error) = match result {
            Ok(()) => (RunStatus::Success, None),
            Err(FlowError::Stopped) => (RunStatus::Stopped, None),
            Err(FlowError::NodeFailed { error, .. }) => (RunStatus::Error, Some(error.to_string())),
            Err(e) => (RunStatus::Error, Some(e.to_string())),
        };
        {
            let mut state = self.state.lock();
            state.cancel = None;
            state.error = error.clone();
            // Nodes left running by a dead run task never reported back.
            if status == RunStatus::Error {
                for node_status in state.node_statuses.values_mut() {
                    if *node_status == NodeStatus::Running {
                        *node_status = NodeStatus::Error;
                    }
                }
            }
        }
        if let Some(observer) = &self.observer {
            observer.send(FlowEvent::RunFinished {
                status,
                error,
                timestamp: chrono::Utc::now(),
            });
        }
        self.status_tx.send_replace(status);
        status
    }

    /// Cancel the running run. Returns `false` when nothing is running.
    pub fn stop(&self) -> bool {
        match &self.state.lock().cancel {
            Some(cancel) if self.status() == RunStatus::Running => {
                cancel.cancel();
                true
            }
            _ => false,
        }
    }

    /// Return a finished run to `idle` and drop its state.
    pub fn reset(&self) -> FlowResult<()> {
        let mut state = self.state.lock();
        if self.status() == RunStatus::Running {
            return Err(FlowError::AlreadyRunning);
        }
        *state = TrackerState::default();
        self.status_tx.send_replace(RunStatus::Idle);
        Ok(())
    }

    /// Wait while a run is in progress and return the status it ended in.
    /// Returns immediately when no run is in progress.
    pub async fn wait(&self) -> RunStatus {
        let mut rx = self.status_tx.subscribe();
        loop {
            let status = *rx.borrow_and_update();
            if status != RunStatus::Running {
                return status;
            }
            if rx.changed().await.is_err() {
                return *rx.borrow();
            }
        }
    }

    fn push_event(
        &self,
        node_id: &str,
        node_status: NodeStatus,
        event_type: TimelineEventType,
        describe: impl FnOnce(&str) -> String,
        data: Option<Value>,
    ) {
        let mut state = self.state.lock();
        let message = describe(state.name_of(node_id));
        state.node_statuses.insert(node_id.to_string(), node_status);
        let event = TimelineEvent {
            id: self.runtime.next_id(),
            ts: self.runtime.now_millis(),
            node_id: node_id.to_string(),
            event_type,
            message,
            data,
        };
        state.timeline.push(event);
    }
}

impl ExecutionCallbacks for RunTracker {
    fn on_node_start(&self, node_id: &str) {
        self.push_event(
            node_id,
            NodeStatus::Running,
            TimelineEventType::Start,
            |name| format!("Node {} started", name),
            None,
        );
        if let Some(observer) = &self.observer {
            observer.on_node_start(node_id);
        }
    }

    fn on_node_success(&self, node_id: &str, data: Option<&Value>) {
        self.push_event(
            node_id,
            NodeStatus::Success,
            TimelineEventType::Success,
            |name| format!("Node {} completed", name),
            data.cloned(),
        );
        if let Some(observer) = &self.observer {
            observer.on_node_success(node_id, data);
        }
    }

    fn on_node_error(&self, node_id: &str, error: &str) {
        self.push_event(
            node_id,
            NodeStatus::Error,
            TimelineEventType::Error,
            |name| format!("Node {} failed: {}", name, error),
            None,
        );
        if let Some(observer) = &self.observer {
            observer.on_node_error(node_id, error);
        }
    }

    fn on_node_stopped(&self, node_id: &str) {
        self.push_event(
            node_id,
            NodeStatus::Stopped,
            TimelineEventType::Stopped,
            |name| format!("Node {} stopped", name),
            None,
        );
        if let Some(observer) = &self.observer {
            observer.on_node_stopped(node_id);
        }
    }

    fn on_log(&self, level: LogLevel, msg: &str) {
        debug!(level = level.as_str(), "{}", msg);
        if let Some(observer) = &self.observer {
            observer.on_log(level, msg);
        }
    }

    fn on_context_update(&self, context: &ExecutionContext) {
        self.state.lock().context = context.clone();
        if let Some(observer) = &self.observer {
            observer.on_context_update(context);
        }
    }
}

/// Label used in timeline messages: a request node's name, else its id.
fn display_name(id: &str, kind: &NodeKind) -> String {
    match kind {
        NodeKind::Request(data) => data
            .name
            .as_deref()
            .filter(|n| !n.is_empty())
            .unwrap_or(id)
            .to_string(),
        _ => id.to_string(),
    }
}
