//! Loop Node executor.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::domain::model::LoopNodeData;
use crate::error::NodeError;
use crate::nodes::{LoopPlan, NodeContext, NodeExecutor, NodeOutcome, Route};

/// Validates the loop source and hands the items to the traversal, which
/// binds each one and re-runs the downstream subgraph.
pub struct LoopNodeExecutor;

#[async_trait]
impl NodeExecutor for LoopNodeExecutor {
    type Data = LoopNodeData;

    async fn execute(
        &self,
        data: &LoopNodeData,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutcome, NodeError> {
        let items = match ctx.get_var(&data.array_var) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(NodeError::TypeError(format!(
                    "Variable {} is not an array",
                    data.array_var
                )))
            }
        };

        let count = items.len();
        Ok(NodeOutcome::new(Route::Iterate(LoopPlan {
            items,
            item_var: data.item_var.clone(),
            index_var: data.index_var.clone().filter(|v| !v.is_empty()),
        }))
        .with_data(json!({ "iterations": count })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::context::test_support::Harness;

    fn data(index_var: Option<&str>) -> LoopNodeData {
        LoopNodeData {
            array_var: "items".into(),
            item_var: "x".into(),
            index_var: index_var.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_loop_plans_iterations() {
        let harness = Harness::new();
        harness.set_var("items", json!([1, 2, 3]));
        let outcome = LoopNodeExecutor
            .execute(&data(Some("i")), &harness.ctx())
            .await
            .unwrap();
        match outcome.route {
            Route::Iterate(plan) => {
                assert_eq!(plan.items, vec![json!(1), json!(2), json!(3)]);
                assert_eq!(plan.item_var, "x");
                assert_eq!(plan.index_var.as_deref(), Some("i"));
            }
            other => panic!("expected Iterate, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_non_array_source_is_fatal() {
        let harness = Harness::new();
        harness.set_var("items", json!("1,2,3"));
        let err = LoopNodeExecutor
            .execute(&data(None), &harness.ctx())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Type error: Variable items is not an array");
    }

    #[tokio::test]
    async fn test_missing_source_is_fatal() {
        let harness = Harness::new();
        let result = LoopNodeExecutor.execute(&data(None), &harness.ctx()).await;
        assert!(matches!(result, Err(NodeError::TypeError(_))));
    }

    #[tokio::test]
    async fn test_empty_index_var_ignored() {
        let harness = Harness::new();
        harness.set_var("items", json!([]));
        let outcome = LoopNodeExecutor
            .execute(&data(Some("")), &harness.ctx())
            .await
            .unwrap();
        assert!(matches!(outcome.route, Route::Iterate(ref p) if p.index_var.is_none()));
    }
}
