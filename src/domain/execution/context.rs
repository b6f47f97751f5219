use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::domain::model::{HttpRequest, HttpResponse};

use super::NodeResultStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LogEntry {
    /// Milliseconds since the Unix epoch.
    pub ts: i64,
    pub level: LogLevel,
    pub msg: String,
}

/// Record of the most recent execution of one node.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecutionResult {
    pub node_id: String,
    pub status: NodeResultStatus,
    pub start_time: i64,
    pub end_time: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<HttpRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<HttpResponse>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Run-scoped mutable state shared by every node of one run.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionContext {
    pub flow_vars: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_request: Option<HttpRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_response: Option<HttpResponse>,
    #[serde(default)]
    pub logs: Vec<LogEntry>,
    #[serde(default)]
    pub results: HashMap<String, NodeExecutionResult>,
}

impl ExecutionContext {
    pub fn new(flow_vars: HashMap<String, Value>) -> Self {
        Self {
            flow_vars,
            ..Default::default()
        }
    }

    pub fn get_var(&self, key: &str) -> Option<&Value> {
        self.flow_vars.get(key)
    }

    pub fn set_var(&mut self, key: impl Into<String>, value: Value) {
        self.flow_vars.insert(key.into(), value);
    }

    /// The last response body, parsed as JSON when possible and raw text otherwise.
    pub fn last_response_value(&self) -> Option<Value> {
        self.last_response.as_ref().map(|r| parse_body(&r.body))
    }

    /// Records a node result, replacing any earlier result for the same node.
    pub fn record_result(&mut self, result: NodeExecutionResult) {
        self.results.insert(result.node_id.clone(), result);
    }
}

/// JSON-parses a body, falling back to the raw string.
pub fn parse_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}
