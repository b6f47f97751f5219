//! Condition node: compares two operands and picks the `"true"` or
//! `"false"` edge.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::execution::LogLevel;
use crate::domain::model::{ConditionNodeData, LeftOperandKind, RightOperandKind};
use crate::error::NodeError;
use crate::evaluator::{evaluate, extract_path, to_js_string};
use crate::nodes::{NodeContext, NodeExecutor, NodeOutcome};

pub struct ConditionNodeExecutor;

impl ConditionNodeExecutor {
    fn left_operand(
        data: &ConditionNodeData,
        ctx: &NodeContext<'_>,
    ) -> Result<Option<Value>, NodeError> {
        let context = ctx.context.read();
        match data.left.kind {
            LeftOperandKind::FlowVar => Ok(context.get_var(&data.left.value).cloned()),
            LeftOperandKind::LastStatus => {
                Ok(context.last_response.as_ref().map(|r| json!(r.status)))
            }
            LeftOperandKind::LastResponseBodyPath => {
                let response = context
                    .last_response
                    .as_ref()
                    .ok_or_else(|| NodeError::ExecutionError("No response available".into()))?;
                // An unparseable body leaves the operand undefined.
                Ok(serde_json::from_str::<Value>(&response.body)
                    .ok()
                    .and_then(|parsed| extract_path(Some(&parsed), &data.left.value)))
            }
        }
    }

    fn right_operand(data: &ConditionNodeData, ctx: &NodeContext<'_>) -> Option<Value> {
        match data.right.kind {
            RightOperandKind::Literal => Some(data.right.value.clone()),
            RightOperandKind::FlowVar => {
                let name = to_js_string(Some(&data.right.value));
                ctx.get_var(&name)
            }
        }
    }
}

#[async_trait]
impl NodeExecutor for ConditionNodeExecutor {
    type Data = ConditionNodeData;

    async fn execute(
        &self,
        data: &ConditionNodeData,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutcome, NodeError> {
        let left = Self::left_operand(data, ctx)?;
        let right = Self::right_operand(data, ctx);
        let result = evaluate(left.as_ref(), data.op, right.as_ref());

        ctx.log(
            LogLevel::Info,
            format!(
                "Condition: {} {} {} = {}",
                to_js_string(left.as_ref()),
                data.op.as_str(),
                to_js_string(right.as_ref()),
                result
            ),
        );

        Ok(NodeOutcome::branch(result).with_data(json!({ "result": result })))
    }
}
