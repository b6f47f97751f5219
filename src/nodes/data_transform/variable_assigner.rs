use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::execution::LogLevel;
use crate::domain::model::{LogNodeData, SetVarNodeData};
use crate::error::NodeError;
use crate::nodes::{NodeContext, NodeExecutor, NodeOutcome};

/// 变量赋值节点执行器
///
/// The template is resolved and stored as a string.
pub struct SetVarNodeExecutor;

#[async_trait]
impl NodeExecutor for SetVarNodeExecutor {
    type Data = SetVarNodeData;

    async fn execute(
        &self,
        data: &SetVarNodeData,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutcome, NodeError> {
        let value = ctx.resolve(&data.value_template);
        ctx.set_var(data.key.clone(), Value::String(value.clone()));
        ctx.publish();

        ctx.log(LogLevel::Info, format!("Set {} = {}", data.key, value));
        Ok(NodeOutcome::next().with_data(json!({ &data.key: value })))
    }
}

/// 日志节点执行器
pub struct LogNodeExecutor;

#[async_trait]
impl NodeExecutor for LogNodeExecutor {
    type Data = LogNodeData;

    async fn execute(
        &self,
        data: &LogNodeData,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutcome, NodeError> {
        let message = ctx.resolve(&data.message_template);
        ctx.log(LogLevel::Info, message.clone());
        Ok(NodeOutcome::next().with_data(json!({ "message": message })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::context::test_support::Harness;

    #[tokio::test]
    async fn test_set_var_resolves_template() {
        let mut harness = Harness::new();
        harness.env_vars.insert("scheme".into(), "Bearer".into());
        harness.set_var("token", json!("abc123"));

        let data = SetVarNodeData {
            key: "authHeader".into(),
            value_template: "{{scheme}} {{token}}".into(),
        };
        SetVarNodeExecutor.execute(&data, &harness.ctx()).await.unwrap();

        assert_eq!(harness.var("authHeader"), Some(json!("Bearer abc123")));
        assert_eq!(harness.logs(), vec!["Set authHeader = Bearer abc123"]);
    }

    #[tokio::test]
    async fn test_set_var_keeps_unresolved_placeholder() {
        let harness = Harness::new();
        let data = SetVarNodeData {
            key: "x".into(),
            value_template: "id={{missing}}".into(),
        };
        SetVarNodeExecutor.execute(&data, &harness.ctx()).await.unwrap();
        assert_eq!(harness.var("x"), Some(json!("id={{missing}}")));
    }

    #[tokio::test]
    async fn test_log_node_does_not_mutate_vars() {
        let harness = Harness::new();
        harness.set_var("count", json!(3));
        let data = LogNodeData {
            message_template: "count is {{count}}".into(),
        };
        let result = LogNodeExecutor.execute(&data, &harness.ctx()).await.unwrap();
        assert_eq!(harness.logs(), vec!["count is 3"]);
        assert_eq!(result.data, Some(json!({"message": "count is 3"})));
        assert_eq!(harness.context.read().flow_vars.len(), 1);
    }
}
