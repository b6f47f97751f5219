use async_trait::async_trait;

use crate::domain::execution::LogLevel;
use crate::error::NodeError;
use crate::nodes::{NodeContext, NodeExecutor, NodeOutcome};

/// 结束节点执行器
///
/// Ends the current path only; sibling parallel branches keep running.
pub struct EndNodeExecutor;

#[async_trait]
impl NodeExecutor for EndNodeExecutor {
    type Data = ();

    async fn execute(&self, _data: &(), ctx: &NodeContext<'_>) -> Result<NodeOutcome, NodeError> {
        ctx.log(LogLevel::Info, "Flow completed successfully");
        Ok(NodeOutcome::end())
    }
}
