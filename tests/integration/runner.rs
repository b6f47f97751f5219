mod helpers;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use helpers::{flow_from_json, runner, FakeHttp};
use reqflow::core::{CancellationHandle, HttpExecutor, InMemoryRepository};
use reqflow::domain::model::{
    Collection, Environment, EnvironmentVariable, HttpMethod, HttpRequest, HttpResponse,
};
use reqflow::{
    create_event_channel, EngineConfig, FlowError, FlowEvent, FlowRunner, NodeError, NodeStatus,
    RunStatus, RuntimeContext, TimelineEventType,
};

fn auth_collection() -> Collection {
    let mut login = HttpRequest::new(HttpMethod::Post, "https://api.test/login");
    login.id = "login".into();
    Collection {
        id: "auth".into(),
        name: "Auth".into(),
        requests: vec![login],
        ..Default::default()
    }
}

fn adhoc(url: &str) -> serde_json::Value {
    json!({"kind": "adhoc", "request": {"method": "GET", "url": url}})
}

#[tokio::test]
async fn test_login_token_flows_into_header() {
    let http = Arc::new(FakeHttp::new().route(
        "https://api.test/login",
        200,
        r#"{"auth":{"token":"abc123"}}"#,
    ));
    let flow = flow_from_json(json!({
        "id": "login-flow",
        "name": "Login",
        "nodes": [
            {"id": "start", "type": "start", "position": {"x": 0, "y": 0}},
            {"id": "req", "type": "request", "position": {"x": 0, "y": 1},
             "data": {"requestRef": {"kind": "collectionRequest", "collectionId": "auth", "requestId": "login"}}},
            {"id": "token", "type": "extract", "position": {"x": 0, "y": 2},
             "data": {"from": "lastResponseBody", "jsonPath": "auth.token", "toFlowVar": "token"}},
            {"id": "header", "type": "setVar", "position": {"x": 0, "y": 3},
             "data": {"key": "authHeader", "valueTemplate": "Bearer {{token}}"}},
            {"id": "end", "type": "end", "position": {"x": 0, "y": 4}}
        ],
        "edges": [
            {"id": "e1", "source": "start", "target": "req"},
            {"id": "e2", "source": "req", "target": "token"},
            {"id": "e3", "source": "token", "target": "header"},
            {"id": "e4", "source": "header", "target": "end"}
        ]
    }));

    let runner = runner(http.clone(), InMemoryRepository::new().with_collection(auth_collection()));
    let snapshot = runner.run(&flow).await.unwrap();

    assert_eq!(snapshot.status, RunStatus::Success);
    assert_eq!(snapshot.context.flow_vars["authHeader"], json!("Bearer abc123"));
    assert_eq!(http.seen_urls(), vec!["https://api.test/login".to_string()]);

    // start then success for every node, in order
    assert_eq!(snapshot.timeline.len(), 10);
    for pair in snapshot.timeline.chunks(2) {
        assert_eq!(pair[0].event_type, TimelineEventType::Start);
        assert_eq!(pair[1].event_type, TimelineEventType::Success);
        assert_eq!(pair[0].node_id, pair[1].node_id);
    }
    assert_eq!(snapshot.context.results.len(), 5);
    assert_eq!(
        snapshot.context.results["req"]
            .response
            .as_ref()
            .map(|r| r.status),
        Some(200)
    );
}

#[tokio::test]
async fn test_loop_runs_downstream_once_per_item() {
    let flow = flow_from_json(json!({
        "id": "loop-flow",
        "name": "Loop",
        "variables": {"items": {"value": [1, 2, 3]}, "seen": ""},
        "nodes": [
            {"id": "start", "type": "start"},
            {"id": "loop", "type": "loop", "data": {"arrayVar": "items", "itemVar": "x", "indexVar": "i"}},
            {"id": "append", "type": "setVar", "data": {"key": "seen", "valueTemplate": "{{seen}}{{x}}"}},
            {"id": "log", "type": "log", "data": {"messageTemplate": "item {{i}} = {{x}}"}}
        ],
        "edges": [
            {"id": "e1", "source": "start", "target": "loop"},
            {"id": "e2", "source": "loop", "target": "append"},
            {"id": "e3", "source": "append", "target": "log"}
        ]
    }));

    let snapshot = runner(Arc::new(FakeHttp::new()), InMemoryRepository::new())
        .run(&flow)
        .await
        .unwrap();

    assert_eq!(snapshot.status, RunStatus::Success);
    assert_eq!(snapshot.context.flow_vars["x"], json!(3));
    assert_eq!(snapshot.context.flow_vars["i"], json!(2));
    assert_eq!(snapshot.context.flow_vars["seen"], json!("123"));
    let log_starts = snapshot
        .timeline
        .iter()
        .filter(|e| e.node_id == "log" && e.event_type == TimelineEventType::Start)
        .count();
    assert_eq!(log_starts, 3);
    let logged: Vec<&str> = snapshot
        .context
        .logs
        .iter()
        .map(|l| l.msg.as_str())
        .filter(|m| m.starts_with("item "))
        .collect();
    assert_eq!(logged, vec!["item 0 = 1", "item 1 = 2", "item 2 = 3"]);

    // one result per node id, from the last iteration
    assert_eq!(snapshot.context.results.len(), 4);
    let append = &snapshot.context.results["append"];
    assert_eq!(append.data, Some(json!({"seen": "123"})));
    assert_eq!(
        snapshot.context.results["log"].data,
        Some(json!({"message": "item 2 = 3"}))
    );

    // the loop node completes after its iterations
    let loop_success = snapshot
        .timeline
        .iter()
        .position(|e| e.node_id == "loop" && e.event_type == TimelineEventType::Success)
        .unwrap();
    assert_eq!(loop_success, snapshot.timeline.len() - 1);
}

#[tokio::test]
async fn test_parallel_branch_failure_keeps_sibling_effects() {
    let flow = flow_from_json(json!({
        "id": "par-flow",
        "name": "Parallel",
        "nodes": [
            {"id": "start", "type": "start"},
            {"id": "fan", "type": "parallel", "data": {"branches": 2}},
            {"id": "ok", "type": "setVar", "data": {"key": "a", "valueTemplate": "done"}},
            {"id": "wait", "type": "delay", "data": {"ms": 20}},
            {"id": "broken", "type": "request", "data": {"requestRef": adhoc("https://down.test/")}}
        ],
        "edges": [
            {"id": "e1", "source": "start", "target": "fan"},
            {"id": "e2", "source": "fan", "target": "ok"},
            {"id": "e3", "source": "fan", "target": "wait"},
            {"id": "e4", "source": "wait", "target": "broken"}
        ]
    }));

    let snapshot = runner(Arc::new(FakeHttp::new()), InMemoryRepository::new())
        .run(&flow)
        .await
        .unwrap();

    assert_eq!(snapshot.status, RunStatus::Error);
    assert_eq!(snapshot.context.flow_vars["a"], json!("done"));
    assert_eq!(snapshot.node_statuses["broken"], NodeStatus::Error);
    assert_eq!(snapshot.node_statuses["fan"], NodeStatus::Error);
    assert!(snapshot
        .timeline
        .iter()
        .any(|e| e.node_id == "broken" && e.event_type == TimelineEventType::Error));
    assert!(snapshot.error.as_deref().unwrap_or_default().contains("connection refused"));
    assert!(snapshot.context.last_response.as_ref().is_some_and(|r| r.status == 0));
}

#[tokio::test]
async fn test_stop_during_delay_skips_downstream() {
    let flow = flow_from_json(json!({
        "id": "stop-flow",
        "name": "Stop",
        "nodes": [
            {"id": "start", "type": "start"},
            {"id": "sleep", "type": "delay", "data": {"ms": 60000}},
            {"id": "after", "type": "setVar", "data": {"key": "after", "valueTemplate": "ran"}}
        ],
        "edges": [
            {"id": "e1", "source": "start", "target": "sleep"},
            {"id": "e2", "source": "sleep", "target": "after"}
        ]
    }));

    let runner = runner(Arc::new(FakeHttp::new()), InMemoryRepository::new());
    let handle = runner.start(&flow).unwrap();
    while runner.tracker().node_status("sleep") != Some(NodeStatus::Running) {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    handle.stop();

    assert_eq!(handle.wait().await, RunStatus::Stopped);
    let snapshot = handle.snapshot();
    assert!(!snapshot.context.flow_vars.contains_key("after"));
    assert_eq!(snapshot.node_statuses["after"], NodeStatus::Pending);
    assert_eq!(snapshot.node_statuses["sleep"], NodeStatus::Stopped);
    assert!(!snapshot
        .timeline
        .iter()
        .any(|e| e.event_type == TimelineEventType::Error));
    assert!(snapshot
        .context
        .logs
        .iter()
        .any(|l| l.msg == "Flow execution stopped"));
}

#[tokio::test]
async fn test_stop_aborts_in_flight_request() {
    let http = Arc::new(
        FakeHttp::new()
            .route("https://slow.test/", 200, "{}")
            .with_delay(Duration::from_secs(60)),
    );
    let flow = flow_from_json(json!({
        "id": "slow-flow",
        "name": "Slow",
        "nodes": [
            {"id": "start", "type": "start"},
            {"id": "slow", "type": "request", "data": {"requestRef": adhoc("https://slow.test/")}}
        ],
        "edges": [{"id": "e1", "source": "start", "target": "slow"}]
    }));

    let runner = runner(http.clone(), InMemoryRepository::new());
    let handle = runner.start(&flow).unwrap();
    while http.seen_urls().is_empty() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert!(runner.stop());
    assert_eq!(handle.wait().await, RunStatus::Stopped);
    assert!(handle.context().last_response.is_none());
}

#[tokio::test]
async fn test_environment_variables_resolve_when_enabled() {
    let env = Environment {
        id: "dev".into(),
        name: "Dev".into(),
        variables: vec![
            EnvironmentVariable {
                id: "v1".into(),
                key: "baseUrl".into(),
                value: "https://env.test".into(),
                enabled: true,
            },
            EnvironmentVariable {
                id: "v2".into(),
                key: "secret".into(),
                value: "hunter2".into(),
                enabled: false,
            },
        ],
        ..Default::default()
    };
    let http = Arc::new(FakeHttp::new().route("https://env.test/ping/{{secret}}", 204, ""));
    let flow = flow_from_json(json!({
        "id": "env-flow",
        "name": "Env",
        "environmentId": "dev",
        "nodes": [
            {"id": "start", "type": "start"},
            {"id": "ping", "type": "request", "data": {"requestRef": adhoc("{{baseUrl}}/ping/{{secret}}")}}
        ],
        "edges": [{"id": "e1", "source": "start", "target": "ping"}]
    }));

    let snapshot = runner(http.clone(), InMemoryRepository::new().with_environment(env))
        .run(&flow)
        .await
        .unwrap();

    assert_eq!(snapshot.status, RunStatus::Success);
    assert_eq!(http.seen_urls(), vec!["https://env.test/ping/{{secret}}".to_string()]);
}

#[tokio::test]
async fn test_missing_environment_fails_before_any_node() {
    let flow = flow_from_json(json!({
        "id": "env-flow",
        "name": "Env",
        "environmentId": "nope",
        "nodes": [{"id": "start", "type": "start"}],
        "edges": []
    }));
    let snapshot = runner(Arc::new(FakeHttp::new()), InMemoryRepository::new())
        .run(&flow)
        .await
        .unwrap();
    assert_eq!(snapshot.status, RunStatus::Error);
    assert_eq!(snapshot.error.as_deref(), Some("Environment nope not found"));
    assert!(snapshot.timeline.is_empty());
}

#[tokio::test]
async fn test_condition_routes_on_status_and_hooks_run() {
    let http = Arc::new(FakeHttp::new().route("https://api.test/health", 503, r#"{"ok":false}"#));
    let flow = flow_from_json(json!({
        "id": "branch-flow",
        "name": "Branch",
        "nodes": [
            {"id": "start", "type": "start"},
            {"id": "health", "type": "request", "data": {"requestRef": {"kind": "adhoc", "request": {
                "method": "GET",
                "url": "https://api.test/health",
                "postRequestScript": "setEnv('seenStatus', response.status);"
            }}}},
            {"id": "ok", "type": "condition", "data": {
                "left": {"kind": "lastStatus"},
                "op": "lt",
                "right": {"kind": "literal", "value": 400}
            }},
            {"id": "up", "type": "setVar", "data": {"key": "state", "valueTemplate": "up"}},
            {"id": "down", "type": "setVar", "data": {"key": "state", "valueTemplate": "down"}}
        ],
        "edges": [
            {"id": "e1", "source": "start", "target": "health"},
            {"id": "e2", "source": "health", "target": "ok"},
            {"id": "e3", "source": "ok", "target": "up", "sourceHandle": "true"},
            {"id": "e4", "source": "ok", "target": "down", "sourceHandle": "false"}
        ]
    }));

    let snapshot = runner(http, InMemoryRepository::new())
        .run(&flow)
        .await
        .unwrap();

    assert_eq!(snapshot.status, RunStatus::Success);
    assert_eq!(snapshot.context.flow_vars["state"], json!("down"));
    assert_eq!(snapshot.context.flow_vars["seenStatus"], json!(503));
    assert_eq!(snapshot.node_statuses["up"], NodeStatus::Pending);
    assert!(snapshot
        .context
        .logs
        .iter()
        .any(|l| l.msg == "Condition: 503 lt 400 = false"));
}

#[tokio::test]
async fn test_cycle_hits_step_limit() {
    let flow = flow_from_json(json!({
        "id": "cycle",
        "name": "Cycle",
        "nodes": [
            {"id": "start", "type": "start"},
            {"id": "a", "type": "log", "data": {"messageTemplate": "a"}},
            {"id": "b", "type": "log", "data": {"messageTemplate": "b"}}
        ],
        "edges": [
            {"id": "e1", "source": "start", "target": "a"},
            {"id": "e2", "source": "a", "target": "b"},
            {"id": "e3", "source": "b", "target": "a"}
        ]
    }));
    let runner = FlowRunner::builder()
        .http_executor(Arc::new(FakeHttp::new()))
        .config(EngineConfig {
            max_steps: 25,
            ..EngineConfig::default()
        })
        .runtime(RuntimeContext::fake(0, "evt"))
        .build()
        .unwrap();

    let snapshot = runner.run(&flow).await.unwrap();
    assert_eq!(snapshot.status, RunStatus::Error);
    assert_eq!(snapshot.error.as_deref(), Some("Max steps exceeded: 25"));
}

#[tokio::test]
async fn test_observer_sees_whole_run() {
    let (tx, mut rx) = create_event_channel();
    let runner = FlowRunner::builder()
        .http_executor(Arc::new(FakeHttp::new()))
        .observer(tx)
        .build()
        .unwrap();
    let flow = flow_from_json(json!({
        "id": "obs",
        "name": "Observed",
        "nodes": [
            {"id": "start", "type": "start"},
            {"id": "end", "type": "end"}
        ],
        "edges": [{"id": "e1", "source": "start", "target": "end"}]
    }));
    runner.run(&flow).await.unwrap();
    drop(runner);

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    assert!(matches!(events.first(), Some(FlowEvent::NodeStarted { node_id, .. }) if node_id == "start"));
    assert!(matches!(
        events.last(),
        Some(FlowEvent::RunFinished { status: RunStatus::Success, .. })
    ));
    assert!(events
        .iter()
        .any(|e| matches!(e, FlowEvent::Log { msg, .. } if msg == "Flow completed successfully")));
}

#[tokio::test]
async fn test_large_loop_completes_with_default_config() {
    let items: Vec<u32> = (1..=4000).collect();
    let flow = flow_from_json(json!({
        "id": "big-loop",
        "name": "Big loop",
        "variables": {"items": items},
        "nodes": [
            {"id": "start", "type": "start"},
            {"id": "loop", "type": "loop", "data": {"arrayVar": "items", "itemVar": "x"}},
            {"id": "a", "type": "setVar", "data": {"key": "a", "valueTemplate": "{{x}}"}},
            {"id": "b", "type": "setVar", "data": {"key": "b", "valueTemplate": "{{a}}"}},
            {"id": "c", "type": "setVar", "data": {"key": "c", "valueTemplate": "{{b}}"}}
        ],
        "edges": [
            {"id": "e1", "source": "start", "target": "loop"},
            {"id": "e2", "source": "loop", "target": "a"},
            {"id": "e3", "source": "a", "target": "b"},
            {"id": "e4", "source": "b", "target": "c"}
        ]
    }));

    let snapshot = runner(Arc::new(FakeHttp::new()), InMemoryRepository::new())
        .run(&flow)
        .await
        .unwrap();

    assert_eq!(snapshot.status, RunStatus::Success);
    assert_eq!(snapshot.error, None);
    assert_eq!(snapshot.context.flow_vars["x"], json!(4000));
    assert_eq!(snapshot.context.flow_vars["c"], json!("4000"));
}

struct PanickingHttp;

#[async_trait]
impl HttpExecutor for PanickingHttp {
    async fn execute(
        &self,
        _request: &HttpRequest,
        _cancel: &CancellationHandle,
    ) -> Result<HttpResponse, NodeError> {
        panic!("executor bug");
    }
}

#[tokio::test]
async fn test_panicking_collaborator_ends_run_in_error() {
    let runner = FlowRunner::builder()
        .http_executor(Arc::new(PanickingHttp))
        .runtime(RuntimeContext::fake(0, "evt"))
        .build()
        .unwrap();
    let flow = flow_from_json(json!({
        "id": "panic",
        "name": "Panic",
        "nodes": [
            {"id": "start", "type": "start"},
            {"id": "req", "type": "request", "data": {"requestRef": adhoc("https://api.test/")}}
        ],
        "edges": [{"id": "e1", "source": "start", "target": "req"}]
    }));

    let err = runner.run(&flow).await.unwrap_err();
    assert!(matches!(err, FlowError::InternalError(_)));

    let tracker = runner.tracker();
    assert_eq!(tracker.status(), RunStatus::Error);
    let waited = tokio::time::timeout(Duration::from_secs(2), tracker.wait()).await;
    assert_eq!(waited.ok(), Some(RunStatus::Error));
    assert!(tracker.last_error().is_some_and(|e| e.contains("run task failed")));
    assert_eq!(tracker.node_status("req"), Some(NodeStatus::Error));

    assert!(runner.reset().is_ok());
    assert_eq!(tracker.status(), RunStatus::Idle);
}
