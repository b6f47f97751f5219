use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use crate::domain::execution::LogLevel;
use crate::domain::model::DelayNodeData;
use crate::error::NodeError;
use crate::nodes::{NodeContext, NodeExecutor, NodeOutcome};

/// Sleeps for `ms` milliseconds. Cancellation aborts the wait immediately.
pub struct DelayNodeExecutor;

#[async_trait]
impl NodeExecutor for DelayNodeExecutor {
    type Data = DelayNodeData;

    async fn execute(
        &self,
        data: &DelayNodeData,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutcome, NodeError> {
        tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => {
                debug!(node_id = ctx.node_id, "delay cancelled");
                return Err(NodeError::Cancelled);
            }
            _ = tokio::time::sleep(Duration::from_millis(data.ms)) => {}
        }

        ctx.log(LogLevel::Info, format!("Delayed {}ms", data.ms));
        Ok(NodeOutcome::next())
    }
}
