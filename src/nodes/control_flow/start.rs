use async_trait::async_trait;

use crate::error::NodeError;
use crate::nodes::{NodeContext, NodeExecutor, NodeOutcome};

/// 开始节点执行器
pub struct StartNodeExecutor;

#[async_trait]
impl NodeExecutor for StartNodeExecutor {
    type Data = ();

    async fn execute(&self, _data: &(), _ctx: &NodeContext<'_>) -> Result<NodeOutcome, NodeError> {
        // Flow variables are seeded before the start node runs.
        Ok(NodeOutcome::next())
    }
}

/// Passes through to its single successor. Upstream failures are not
/// intercepted.
pub struct ErrorHandlerNodeExecutor;

#[async_trait]
impl NodeExecutor for ErrorHandlerNodeExecutor {
    type Data = ();

    async fn execute(&self, _data: &(), _ctx: &NodeContext<'_>) -> Result<NodeOutcome, NodeError> {
        Ok(NodeOutcome::next())
    }
}
