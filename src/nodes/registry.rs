use crate::domain::model::{FlowNode, NodeKind};
use crate::error::NodeError;

use super::control_flow::{
    ConditionNodeExecutor, DelayNodeExecutor, EndNodeExecutor, ErrorHandlerNodeExecutor,
    StartNodeExecutor,
};
use super::data_transform::{
    ExtractNodeExecutor, HttpRequestNodeExecutor, LogNodeExecutor, MapNodeExecutor,
    ScriptNodeExecutor, SetVarNodeExecutor,
};
use super::flow::{LoopNodeExecutor, ParallelNodeExecutor};
use super::{NodeContext, NodeExecutor, NodeOutcome};

/// 节点分发 - 按节点类型选择执行器
///
/// The match is exhaustive, so a new [`NodeKind`] does not compile until it
/// has an executor.
pub async fn execute_node(node: &FlowNode, ctx: &NodeContext<'_>) -> Result<NodeOutcome, NodeError> {
    match &node.kind {
        NodeKind::Start => StartNodeExecutor.execute(&(), ctx).await,
        NodeKind::End => EndNodeExecutor.execute(&(), ctx).await,
        NodeKind::Request(data) => HttpRequestNodeExecutor.execute(data, ctx).await,
        NodeKind::Extract(data) => ExtractNodeExecutor.execute(data, ctx).await,
        NodeKind::Condition(data) => ConditionNodeExecutor.execute(data, ctx).await,
        NodeKind::SetVar(data) => SetVarNodeExecutor.execute(data, ctx).await,
        NodeKind::Delay(data) => DelayNodeExecutor.execute(data, ctx).await,
        NodeKind::Log(data) => LogNodeExecutor.execute(data, ctx).await,
        NodeKind::Loop(data) => LoopNodeExecutor.execute(data, ctx).await,
        NodeKind::Parallel(data) => ParallelNodeExecutor.execute(data, ctx).await,
        NodeKind::Map(data) => MapNodeExecutor.execute(data, ctx).await,
        NodeKind::Script(data) => ScriptNodeExecutor.execute(data, ctx).await,
        NodeKind::ErrorHandler => ErrorHandlerNodeExecutor.execute(&(), ctx).await,
    }
}
