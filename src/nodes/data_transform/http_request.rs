//! Request node: resolves, sends and records one HTTP exchange.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::domain::execution::{parse_body, LogLevel};
use crate::domain::model::{AuthType, BodyType, HttpRequest, RequestNodeData, RequestRef};
use crate::error::NodeError;
use crate::nodes::{NodeContext, NodeExecutor, NodeOutcome};
use crate::sandbox::{ScriptBindings, ScriptKind, ScriptRequest};

use super::code::{apply_script_effects, forward_console};

/// HTTP 请求节点执行器
pub struct HttpRequestNodeExecutor;

impl HttpRequestNodeExecutor {
    async fn load_request(
        data: &RequestNodeData,
        ctx: &NodeContext<'_>,
    ) -> Result<HttpRequest, NodeError> {
        match &data.request_ref {
            RequestRef::Adhoc { request } => Ok(request.as_ref().clone()),
            RequestRef::CollectionRequest {
                collection_id,
                request_id,
            } => {
                let repository = &ctx.services.repository;
                if repository.get_collection(collection_id).await.is_none() {
                    return Err(NodeError::LookupError(format!(
                        "Collection {} not found",
                        collection_id
                    )));
                }
                repository
                    .get_request_in_collection(collection_id, request_id)
                    .await
                    .ok_or_else(|| {
                        NodeError::LookupError(format!("Request {} not found", request_id))
                    })
            }
        }
    }

    /// Substitutes placeholders in the URL, header and query values, raw
    /// body content and bearer token.
    pub fn resolve_request(request: &HttpRequest, ctx: &NodeContext<'_>) -> HttpRequest {
        let mut resolved = request.clone();
        resolved.url = ctx.resolve(&request.url);
        for header in &mut resolved.headers {
            header.value = ctx.resolve(&header.value);
        }
        for param in &mut resolved.query_params {
            param.value = ctx.resolve(&param.value);
        }
        if resolved.body.body_type == BodyType::Raw {
            resolved.body.content = ctx.resolve(&request.body.content);
        }
        if resolved.auth.auth_type == AuthType::Bearer {
            if let Some(token) = request.auth.token.as_deref().filter(|t| !t.is_empty()) {
                resolved.auth.token = Some(ctx.resolve(token));
            }
        }
        resolved
    }

    /// Runs a pre- or post-request hook. Failures are logged, never raised.
    /// A pre-request hook may rewrite the request.
    async fn run_hook(
        kind: ScriptKind,
        code: &str,
        request: &mut HttpRequest,
        ctx: &NodeContext<'_>,
    ) -> Result<(), NodeError> {
        let flow_vars = ctx.flow_vars();
        let response = match kind {
            ScriptKind::PostRequest => ctx
                .context
                .read()
                .last_response
                .as_ref()
                .map(serde_json::to_value)
                .transpose()?,
            _ => None,
        };
        let bindings = ScriptBindings {
            flow_vars: flow_vars.clone(),
            env_vars: ctx.env_vars.clone(),
            request: Some(serde_json::to_value(&*request)?),
            response,
            environment: ctx.environment.map(serde_json::to_value).transpose()?,
            ..Default::default()
        };

        let result = ctx
            .services
            .scripts
            .run(ScriptRequest::new(code, kind, bindings))
            .await;
        ctx.ensure_not_cancelled()?;

        match result {
            Ok(outcome) => {
                apply_script_effects(ctx, &flow_vars, &outcome);
                if kind == ScriptKind::PreRequest {
                    if let Some(edited) = outcome.request {
                        match serde_json::from_value::<HttpRequest>(edited) {
                            Ok(edited) => *request = edited,
                            Err(e) => {
                                warn!(node_id = ctx.node_id, error = %e, "ignoring malformed request edit")
                            }
                        }
                    }
                }
            }
            Err(e) => {
                forward_console(ctx, e.console_logs());
                ctx.log(LogLevel::Error, format!("Script error: {}", e));
            }
        }
        ctx.publish();
        Ok(())
    }
}

#[async_trait]
impl NodeExecutor for HttpRequestNodeExecutor {
    type Data = RequestNodeData;

    async fn execute(
        &self,
        data: &RequestNodeData,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutcome, NodeError> {
        let template = Self::load_request(data, ctx).await?;
        let mut request = Self::resolve_request(&template, ctx);

        if let Some(script) = template.pre_request_script.as_deref().filter(|s| !s.is_empty()) {
            Self::run_hook(ScriptKind::PreRequest, script, &mut request, ctx).await?;
        }

        ctx.ensure_not_cancelled()?;
        info!(
            node_id = ctx.node_id,
            method = request.method.as_str(),
            url = %request.url,
            "executing request"
        );
        let response = ctx.services.http.execute(&request, ctx.cancel).await?;
        info!(
            node_id = ctx.node_id,
            status = response.status,
            time_ms = response.time_ms,
            "request finished"
        );

        {
            let mut context = ctx.context.write();
            context.last_request = Some(request.clone());
            context.last_response = Some(response.clone());
        }
        ctx.publish();

        if let Some(error) = &response.error {
            return Err(NodeError::HttpError(error.clone()));
        }

        if let Some(name) = data.save_response_as.as_deref().filter(|n| !n.is_empty()) {
            ctx.set_var(name, parse_body(&response.body));
            ctx.publish();
        }

        if let Some(script) = template.post_request_script.as_deref().filter(|s| !s.is_empty()) {
            Self::run_hook(ScriptKind::PostRequest, script, &mut request, ctx).await?;
        }

        let summary: Value = json!({
            "status": response.status,
            "statusText": response.status_text,
            "timeMs": response.time_ms,
            "sizeBytes": response.size_bytes,
        });
        Ok(NodeOutcome::next()
            .with_data(summary)
            .with_exchange(request, response))
    }
}
