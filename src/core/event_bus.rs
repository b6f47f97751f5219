use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::domain::execution::{ExecutionContext, LogLevel, RunStatus};

/// Observability hooks the engine reports through. These are the only way
/// results leave a run.
///
/// Implementations are called synchronously from the executing task and
/// must not block.
pub trait ExecutionCallbacks: Send + Sync {
    fn on_node_start(&self, node_id: &str);
    fn on_node_success(&self, node_id: &str, data: Option<&Value>);
    fn on_node_error(&self, node_id: &str, error: &str);
    /// The node observed cancellation while running.
    fn on_node_stopped(&self, node_id: &str) {
        let _ = node_id;
    }
    fn on_log(&self, level: LogLevel, msg: &str);
    fn on_context_update(&self, context: &ExecutionContext);
}

/// Callbacks that discard everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCallbacks;

impl ExecutionCallbacks for NoopCallbacks {
    fn on_node_start(&self, _node_id: &str) {}
    fn on_node_success(&self, _node_id: &str, _data: Option<&Value>) {}
    fn on_node_error(&self, _node_id: &str, _error: &str) {}
    fn on_log(&self, _level: LogLevel, _msg: &str) {}
    fn on_context_update(&self, _context: &ExecutionContext) {}
}

/// 流程事件 - 通过事件通道传递
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum FlowEvent {
    NodeStarted {
        node_id: String,
        timestamp: DateTime<Utc>,
    },
    NodeSucceeded {
        node_id: String,
        data: Option<Value>,
        timestamp: DateTime<Utc>,
    },
    NodeFailed {
        node_id: String,
        error: String,
        timestamp: DateTime<Utc>,
    },
    NodeStopped {
        node_id: String,
        timestamp: DateTime<Utc>,
    },
    Log {
        level: LogLevel,
        msg: String,
        timestamp: DateTime<Utc>,
    },
    ContextUpdated {
        context: Box<ExecutionContext>,
    },
    RunFinished {
        status: RunStatus,
        error: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl FlowEvent {
    pub fn node_id(&self) -> Option<&str> {
        match self {
            FlowEvent::NodeStarted { node_id, .. }
            | FlowEvent::NodeSucceeded { node_id, .. }
            | FlowEvent::NodeFailed { node_id, .. }
            | FlowEvent::NodeStopped { node_id, .. } => Some(node_id),
            _ => None,
        }
    }
}

/// 事件发送器
pub type EventSender = mpsc::UnboundedSender<FlowEvent>;

/// 事件接收器
pub type EventReceiver = mpsc::UnboundedReceiver<FlowEvent>;

/// 创建事件通道
pub fn create_event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// Forwards every callback as a [`FlowEvent`]. A dropped receiver is ignored.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: EventSender,
}

impl ChannelObserver {
    pub fn new(tx: EventSender) -> Self {
        Self { tx }
    }

    pub fn send(&self, event: FlowEvent) {
        let _ = self.tx.send(event);
    }
}

impl ExecutionCallbacks for ChannelObserver {
    fn on_node_start(&self, node_id: &str) {
        self.send(FlowEvent::NodeStarted {
            node_id: node_id.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn on_node_success(&self, node_id: &str, data: Option<&Value>) {
        self.send(FlowEvent::NodeSucceeded {
            node_id: node_id.to_string(),
            data: data.cloned(),
            timestamp: Utc::now(),
        });
    }

    fn on_node_error(&self, node_id: &str, error: &str) {
        self.send(FlowEvent::NodeFailed {
            node_id: node_id.to_string(),
            error: error.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn on_node_stopped(&self, node_id: &str) {
        self.send(FlowEvent::NodeStopped {
            node_id: node_id.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn on_log(&self, level: LogLevel, msg: &str) {
        self.send(FlowEvent::Log {
            level,
            msg: msg.to_string(),
            timestamp: Utc::now(),
        });
    }

    fn on_context_update(&self, context: &ExecutionContext) {
        self.send(FlowEvent::ContextUpdated {
            context: Box::new(context.clone()),
        });
    }
}
