use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::domain::model::{MapNodeData, ScriptNodeData};
use crate::error::NodeError;
use crate::nodes::{NodeContext, NodeExecutor, NodeOutcome};
use crate::sandbox::{ScriptBindings, ScriptKind, ScriptLog, ScriptOutcome, ScriptRequest};

/// Applies a finished script's flow variable writes and forwards its
/// console output. Nothing is applied when the script failed.
pub(crate) fn apply_script_effects(
    ctx: &NodeContext<'_>,
    before: &std::collections::HashMap<String, Value>,
    outcome: &ScriptOutcome,
) {
    let changes = outcome.flow_var_changes(before);
    if !changes.is_empty() {
        let mut context = ctx.context.write();
        for (key, value) in changes {
            match value {
                Some(value) => context.set_var(key, value),
                None => {
                    context.flow_vars.remove(&key);
                }
            }
        }
    }
    forward_console(ctx, &outcome.logs);
}

/// Sends script console lines to the run log, in order.
pub(crate) fn forward_console(ctx: &NodeContext<'_>, logs: &[ScriptLog]) {
    for log in logs {
        ctx.log(log.level, log.msg.clone());
    }
}

/// 代码执行节点执行器 (map)
///
/// Runs `transformScript` with `(input, flowVars)` and stores the returned
/// value in `outputVar`.
pub struct MapNodeExecutor;

#[async_trait]
impl NodeExecutor for MapNodeExecutor {
    type Data = MapNodeData;

    async fn execute(
        &self,
        data: &MapNodeData,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutcome, NodeError> {
        let flow_vars = ctx.flow_vars();
        let bindings = ScriptBindings {
            input: flow_vars.get(&data.input_var).cloned(),
            flow_vars: flow_vars.clone(),
            env_vars: ctx.env_vars.clone(),
            ..Default::default()
        };
        let request = ScriptRequest::new(&data.transform_script, ScriptKind::Transform, bindings);

        let outcome = match ctx.services.scripts.run(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                forward_console(ctx, e.console_logs());
                return Err(NodeError::MapScriptError(e.to_string()));
            }
        };
        ctx.ensure_not_cancelled()?;

        apply_script_effects(ctx, &flow_vars, &outcome);
        let value = outcome.value.unwrap_or(Value::Null);
        ctx.set_var(data.output_var.clone(), value.clone());
        ctx.publish();

        debug!(node_id = ctx.node_id, output_var = %data.output_var, "map applied");
        Ok(NodeOutcome::next().with_data(json!({ &data.output_var: value })))
    }
}

/// 代码执行节点执行器 (script)
///
/// Runs user code with `(flowVars, setVar, getVar, console)`.
pub struct ScriptNodeExecutor;

#[async_trait]
impl NodeExecutor for ScriptNodeExecutor {
    type Data = ScriptNodeData;

    async fn execute(
        &self,
        data: &ScriptNodeData,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutcome, NodeError> {
        let flow_vars = ctx.flow_vars();
        let bindings = ScriptBindings {
            flow_vars: flow_vars.clone(),
            env_vars: ctx.env_vars.clone(),
            ..Default::default()
        };
        let request = ScriptRequest::new(&data.script, ScriptKind::Logic, bindings);

        let outcome = match ctx.services.scripts.run(request).await {
            Ok(outcome) => outcome,
            Err(e) => {
                forward_console(ctx, e.console_logs());
                return Err(NodeError::ScriptError(e.to_string()));
            }
        };
        ctx.ensure_not_cancelled()?;

        apply_script_effects(ctx, &flow_vars, &outcome);
        ctx.publish();

        Ok(NodeOutcome::next())
    }
}
