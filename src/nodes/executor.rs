use async_trait::async_trait;
use serde_json::Value;

use crate::domain::model::{HttpRequest, HttpResponse};
use crate::error::NodeError;

use super::context::NodeContext;

/// Trait for node execution. Each node kind implements this over its own
/// data struct.
#[async_trait]
pub trait NodeExecutor: Send + Sync {
    type Data: Send + Sync;

    /// Runs the node's own work and tells the traversal where to go next.
    async fn execute(
        &self,
        data: &Self::Data,
        ctx: &NodeContext<'_>,
    ) -> Result<NodeOutcome, NodeError>;
}

/// How traversal continues after a node.
#[derive(Debug, Clone, PartialEq)]
pub enum Route {
    /// Follow the first outgoing edge, if any.
    Next,
    /// Follow the edge whose handle matches the result.
    Branch(bool),
    /// Terminal for this path.
    End,
    /// Re-run the downstream subgraph once per item.
    Iterate(LoopPlan),
    /// Run every outgoing edge concurrently and join.
    FanOut,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoopPlan {
    pub items: Vec<Value>,
    pub item_var: String,
    pub index_var: Option<String>,
}

/// Result of a node executor.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutcome {
    pub route: Route,
    /// Reported with `onNodeSuccess` and stored in the node result.
    pub data: Option<Value>,
    pub request: Option<HttpRequest>,
    pub response: Option<HttpResponse>,
}

impl NodeOutcome {
    pub fn new(route: Route) -> Self {
        Self {
            route,
            data: None,
            request: None,
            response: None,
        }
    }

    pub fn next() -> Self {
        Self::new(Route::Next)
    }

    pub fn branch(result: bool) -> Self {
        Self::new(Route::Branch(result))
    }

    pub fn end() -> Self {
        Self::new(Route::End)
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_exchange(mut self, request: HttpRequest, response: HttpResponse) -> Self {
        self.request = Some(request);
        self.response = Some(response);
        self
    }
}
