//! Shared fixtures for end-to-end runs.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use reqflow::core::{CancellationHandle, HttpExecutor, InMemoryRepository};
use reqflow::domain::model::{HttpRequest, HttpResponse};
use reqflow::error::NodeError;
use reqflow::{parse_flow, Flow, FlowFormat, FlowRunner, RuntimeContext};

/// Answers by URL; unknown URLs get a transport failure.
#[derive(Default)]
pub struct FakeHttp {
    routes: HashMap<String, HttpResponse>,
    delay: Option<Duration>,
    pub seen: Mutex<Vec<HttpRequest>>,
}

impl FakeHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(mut self, url: &str, status: u16, body: &str) -> Self {
        self.routes
            .insert(url.to_string(), HttpResponse::new(status, "OK", body));
        self
    }

    /// Wait this long before answering (cancellable).
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn seen_urls(&self) -> Vec<String> {
        self.seen.lock().unwrap().iter().map(|r| r.url.clone()).collect()
    }
}

#[async_trait]
impl HttpExecutor for FakeHttp {
    async fn execute(
        &self,
        request: &HttpRequest,
        cancel: &CancellationHandle,
    ) -> Result<HttpResponse, NodeError> {
        self.seen.lock().unwrap().push(request.clone());
        if let Some(delay) = self.delay {
            tokio::select! {
                _ = cancel.cancelled() => return Err(NodeError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
        Ok(self
            .routes
            .get(&request.url)
            .cloned()
            .unwrap_or_else(|| HttpResponse::failed("connection refused", 1)))
    }
}

pub fn runner(http: Arc<FakeHttp>, repository: InMemoryRepository) -> FlowRunner {
    FlowRunner::builder()
        .http_executor(http)
        .repository(Arc::new(repository))
        .runtime(RuntimeContext::fake(1_700_000_000_000, "evt"))
        .build()
        .unwrap()
}

pub fn flow_from_json(doc: Value) -> Flow {
    parse_flow(&doc.to_string(), FlowFormat::Json).unwrap()
}
