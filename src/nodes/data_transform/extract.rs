use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::execution::LogLevel;
use crate::domain::model::{ExtractNodeData, ExtractSource};
use crate::error::NodeError;
use crate::evaluator::extract_path;
use crate::nodes::{NodeContext, NodeExecutor, NodeOutcome};

/// Copies a value found by path into a flow variable.
pub struct ExtractNodeExecutor;

impl ExtractNodeExecutor {
    fn source(data: &ExtractNodeData, ctx: &NodeContext<'_>) -> Result<Option<Value>, NodeError> {
        match data.from {
            ExtractSource::LastResponseBody => ctx
                .context
                .read()
                .last_response_value()
                .map(Some)
                .ok_or_else(|| NodeError::ExecutionError("No response available".into())),
            ExtractSource::FlowVar => {
                let name = data
                    .flow_var_name
                    .as_deref()
                    .filter(|n| !n.is_empty())
                    .ok_or_else(|| {
                        NodeError::ConfigError("Flow variable name not specified".into())
                    })?;
                Ok(ctx.get_var(name))
            }
        }
    }
}

#[async_trait]
impl NodeExecutor for ExtractNodeExecutor {
    type Data = ExtractNodeData;

    async fn execute(
        &self,
        data: &ExtractNodeData,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutcome, NodeError> {
        let source = Self::source(data, ctx)?;
        // A missing segment is stored as null.
        let extracted = extract_path(source.as_ref(), &data.json_path).unwrap_or(Value::Null);

        ctx.set_var(data.to_flow_var.clone(), extracted.clone());
        ctx.publish();

        ctx.log(
            LogLevel::Info,
            format!("Extracted \"{}\" → {}", data.json_path, data.to_flow_var),
        );
        Ok(NodeOutcome::next().with_data(json!({ &data.to_flow_var: extracted })))
    }
}
