use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{json, Value};

use reqflow::core::{
    CancellationHandle, HttpExecutor, InMemoryRepository, NoopCallbacks, RuntimeContext,
};
use reqflow::domain::execution::ExecutionContext;
use reqflow::domain::model::{
    Collection, ConditionNodeData, ConditionOp, ExtractNodeData, ExtractSource, FlowNode,
    HttpMethod, HttpRequest, HttpResponse, LeftOperand, LeftOperandKind, LoopNodeData,
    MapNodeData, NodeKind, RequestNodeData, RequestRef, RightOperand, RightOperandKind,
    ScriptNodeData,
};
use reqflow::error::NodeError;
use reqflow::nodes::{execute_node, NodeContext, NodeServices, Route, SharedContext};
use reqflow::sandbox::{BoaScriptRunner, ScriptConfig};

struct CannedHttp {
    response: HttpResponse,
    seen: Mutex<Vec<HttpRequest>>,
}

#[async_trait]
impl HttpExecutor for CannedHttp {
    async fn execute(
        &self,
        request: &HttpRequest,
        cancel: &CancellationHandle,
    ) -> Result<HttpResponse, NodeError> {
        if cancel.is_cancelled() {
            return Err(NodeError::Cancelled);
        }
        self.seen.lock().unwrap().push(request.clone());
        Ok(self.response.clone())
    }
}

struct Fixture {
    context: SharedContext,
    env_vars: BTreeMap<String, String>,
    services: NodeServices,
    http: Arc<CannedHttp>,
    runtime: RuntimeContext,
    cancel: CancellationHandle,
}

impl Fixture {
    fn new(response: HttpResponse, repository: InMemoryRepository) -> Self {
        let http = Arc::new(CannedHttp {
            response,
            seen: Mutex::new(Vec::new()),
        });
        Self {
            context: Arc::new(RwLock::new(ExecutionContext::default())),
            env_vars: [("baseUrl".to_string(), "https://api.test".to_string())]
                .into_iter()
                .collect(),
            services: NodeServices {
                repository: Arc::new(repository),
                http: http.clone(),
                scripts: Arc::new(BoaScriptRunner::new(ScriptConfig::default())),
            },
            http,
            runtime: RuntimeContext::fake(42, "t"),
            cancel: CancellationHandle::new(),
        }
    }

    fn simple() -> Self {
        Self::new(HttpResponse::new(200, "OK", "{}"), InMemoryRepository::new())
    }

    async fn run(&self, node: &FlowNode) -> Result<reqflow::nodes::NodeOutcome, NodeError> {
        let ctx = NodeContext {
            node_id: &node.id,
            context: &self.context,
            env_vars: &self.env_vars,
            environment: None,
            services: &self.services,
            callbacks: &NoopCallbacks,
            runtime: &self.runtime,
            cancel: &self.cancel,
        };
        execute_node(node, &ctx).await
    }

    fn set(&self, key: &str, value: Value) {
        self.context.write().set_var(key, value);
    }

    fn var(&self, key: &str) -> Option<Value> {
        self.context.read().get_var(key).cloned()
    }
}

fn collection() -> Collection {
    let mut login = HttpRequest::new(HttpMethod::Post, "{{baseUrl}}/login")
        .with_header("X-User", "{{user}}");
    login.id = "login".into();
    Collection {
        id: "c1".into(),
        name: "Auth".into(),
        requests: vec![login],
        ..Default::default()
    }
}

fn request_node(save_as: Option<&str>) -> FlowNode {
    FlowNode::new(
        "r1",
        NodeKind::Request(RequestNodeData {
            request_ref: RequestRef::CollectionRequest {
                collection_id: "c1".into(),
                request_id: "login".into(),
            },
            name: None,
            save_response_as: save_as.map(str::to_string),
        }),
    )
}

#[tokio::test]
async fn test_request_resolves_templates_and_saves_response() {
    let fixture = Fixture::new(
        HttpResponse::new(201, "Created", r#"{"auth":{"token":"abc123"}}"#),
        InMemoryRepository::new().with_collection(collection()),
    );
    fixture.set("user", json!("ada"));

    let outcome = fixture.run(&request_node(Some("login"))).await.unwrap();
    assert_eq!(outcome.route, Route::Next);

    let sent = fixture.http.seen.lock().unwrap().clone();
    assert_eq!(sent[0].url, "https://api.test/login");
    assert_eq!(sent[0].headers[0].value, "ada");
    assert_eq!(fixture.var("login"), Some(json!({"auth": {"token": "abc123"}})));
    assert_eq!(
        fixture.context.read().last_response.as_ref().map(|r| r.status),
        Some(201)
    );
}

#[tokio::test]
async fn test_request_missing_collection_is_lookup_error() {
    let fixture = Fixture::simple();
    let err = fixture.run(&request_node(None)).await.unwrap_err();
    assert!(matches!(err, NodeError::LookupError(_)));
    assert_eq!(err.to_string(), "Lookup error: Collection c1 not found");
}

#[tokio::test]
async fn test_extract_then_condition_on_status() {
    let fixture = Fixture::new(
        HttpResponse::new(200, "OK", r#"{"items":[{"id":7},{"id":9}]}"#),
        InMemoryRepository::new().with_collection(collection()),
    );
    fixture.run(&request_node(None)).await.unwrap();

    let extract = FlowNode::new(
        "x1",
        NodeKind::Extract(ExtractNodeData {
            from: ExtractSource::LastResponseBody,
            flow_var_name: None,
            json_path: "items.1.id".into(),
            to_flow_var: "second".into(),
        }),
    );
    fixture.run(&extract).await.unwrap();
    assert_eq!(fixture.var("second"), Some(json!(9)));

    let condition = FlowNode::new(
        "c1",
        NodeKind::Condition(ConditionNodeData {
            left: LeftOperand {
                kind: LeftOperandKind::LastStatus,
                value: String::new(),
            },
            op: ConditionOp::Equals,
            right: RightOperand {
                kind: RightOperandKind::Literal,
                value: json!("200"),
            },
        }),
    );
    let outcome = fixture.run(&condition).await.unwrap();
    assert_eq!(outcome.route, Route::Branch(true));
}

#[tokio::test]
async fn test_extract_without_response_fails() {
    let fixture = Fixture::simple();
    let extract = FlowNode::new(
        "x1",
        NodeKind::Extract(ExtractNodeData {
            from: ExtractSource::LastResponseBody,
            flow_var_name: None,
            json_path: "a".into(),
            to_flow_var: "a".into(),
        }),
    );
    assert!(fixture.run(&extract).await.is_err());
    assert!(fixture.var("a").is_none());
}

#[tokio::test]
async fn test_loop_plan_over_array() {
    let fixture = Fixture::simple();
    fixture.set("items", json!(["a", "b"]));
    let node = FlowNode::new(
        "l1",
        NodeKind::Loop(LoopNodeData {
            array_var: "items".into(),
            item_var: "item".into(),
            index_var: Some("i".into()),
        }),
    );
    match fixture.run(&node).await.unwrap().route {
        Route::Iterate(plan) => {
            assert_eq!(plan.items, vec![json!("a"), json!("b")]);
            assert_eq!(plan.item_var, "item");
            assert_eq!(plan.index_var.as_deref(), Some("i"));
        }
        other => panic!("unexpected route {:?}", other),
    }
}

#[tokio::test]
async fn test_map_and_script_share_flow_vars() {
    let fixture = Fixture::simple();
    fixture.set("prices", json!([10, 20, 30]));

    let map = FlowNode::new(
        "m1",
        NodeKind::Map(MapNodeData {
            input_var: "prices".into(),
            transform_script: "return input.reduce(function(a, b) { return a + b; }, 0);".into(),
            output_var: "total".into(),
        }),
    );
    fixture.run(&map).await.unwrap();
    assert_eq!(fixture.var("total"), Some(json!(60)));

    let script = FlowNode::new(
        "s1",
        NodeKind::Script(ScriptNodeData {
            script: r#"setVar("withTax", getVar("total") * 1.5);"#.into(),
        }),
    );
    fixture.run(&script).await.unwrap();
    assert_eq!(fixture.var("withTax"), Some(json!(90)));
}

#[tokio::test]
async fn test_request_observes_cancellation() {
    let fixture = Fixture::new(
        HttpResponse::new(200, "OK", "{}"),
        InMemoryRepository::new().with_collection(collection()),
    );
    fixture.cancel.cancel();
    let err = fixture.run(&request_node(None)).await.unwrap_err();
    assert!(err.is_cancelled());
    assert!(fixture.context.read().last_response.is_none());
}
