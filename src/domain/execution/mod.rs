//! Run-scoped execution state and status types.

mod context;
mod status;
mod timeline;

pub use context::{parse_body, ExecutionContext, LogEntry, LogLevel, NodeExecutionResult};
pub use status::{NodeResultStatus, NodeStatus, RunStatus};
pub use timeline::{TimelineEvent, TimelineEventType};
