use async_trait::async_trait;

use crate::domain::model::ParallelNodeData;
use crate::error::NodeError;
use crate::nodes::{NodeContext, NodeExecutor, NodeOutcome, Route};

/// Fans out to every outgoing edge. `branches` is informational only.
pub struct ParallelNodeExecutor;

#[async_trait]
impl NodeExecutor for ParallelNodeExecutor {
    type Data = ParallelNodeData;

    async fn execute(
        &self,
        _data: &ParallelNodeData,
        _ctx: &NodeContext<'_>,
    ) -> Result<NodeOutcome, NodeError> {
        Ok(NodeOutcome::new(Route::FanOut))
    }
}
