use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::request::HttpRequest;

pub type FlowId = String;
pub type NodeId = String;
pub type EdgeId = String;

/// A saved flow definition: nodes, edges and declared variables.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub id: FlowId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub nodes: Vec<FlowNode>,
    #[serde(default)]
    pub edges: Vec<FlowEdge>,
    #[serde(default)]
    pub variables: HashMap<String, FlowVariable>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<String>,
    #[serde(default = "default_version")]
    pub version: u32,
}

fn default_version() -> u32 {
    1
}

impl Flow {
    /// The first `start` node in document order.
    pub fn start_node(&self) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| matches!(n.kind, NodeKind::Start))
    }

    pub fn node(&self, id: &str) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Initial flow variable values, used to seed a run's context.
    pub fn initial_variables(&self) -> HashMap<String, Value> {
        self.variables
            .iter()
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect()
    }
}

/// A declared flow variable. Documents may give either `{value, description}`
/// or a bare value.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(from = "RawFlowVariable")]
pub struct FlowVariable {
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FlowVariable {
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            description: None,
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawFlowVariable {
    Detailed {
        value: Value,
        #[serde(default)]
        description: Option<String>,
    },
    Plain(Value),
}

impl From<RawFlowVariable> for FlowVariable {
    fn from(raw: RawFlowVariable) -> Self {
        match raw {
            RawFlowVariable::Detailed { value, description } => FlowVariable { value, description },
            RawFlowVariable::Plain(value) => FlowVariable {
                value,
                description: None,
            },
        }
    }
}

/// Canvas position. Irrelevant to execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Serialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A directed edge between two nodes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowEdge {
    #[serde(default)]
    pub id: EdgeId,
    pub source: NodeId,
    pub target: NodeId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
}

impl FlowEdge {
    pub fn new(id: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source: source.into(),
            target: target.into(),
            source_handle: None,
            target_handle: None,
        }
    }

    pub fn with_source_handle(mut self, handle: impl Into<String>) -> Self {
        self.source_handle = Some(handle.into());
        self
    }
}

/// A node of the flow graph. The document form is
/// `{ "id", "type", "position", "data" }`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "RawFlowNode", into = "RawFlowNode")]
pub struct FlowNode {
    pub id: NodeId,
    pub position: Position,
    pub kind: NodeKind,
}

impl FlowNode {
    pub fn new(id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            id: id.into(),
            position: Position::default(),
            kind,
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.kind.type_name()
    }
}

/// Closed set of node kinds with their kind-specific data.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Start,
    End,
    Request(RequestNodeData),
    Extract(ExtractNodeData),
    Condition(ConditionNodeData),
    SetVar(SetVarNodeData),
    Delay(DelayNodeData),
    Log(LogNodeData),
    Loop(LoopNodeData),
    Parallel(ParallelNodeData),
    Map(MapNodeData),
    Script(ScriptNodeData),
    ErrorHandler,
}

impl NodeKind {
    pub fn type_name(&self) -> &'static str {
        match self {
            NodeKind::Start => "start",
            NodeKind::End => "end",
            NodeKind::Request(_) => "request",
            NodeKind::Extract(_) => "extract",
            NodeKind::Condition(_) => "condition",
            NodeKind::SetVar(_) => "setVar",
            NodeKind::Delay(_) => "delay",
            NodeKind::Log(_) => "log",
            NodeKind::Loop(_) => "loop",
            NodeKind::Parallel(_) => "parallel",
            NodeKind::Map(_) => "map",
            NodeKind::Script(_) => "script",
            NodeKind::ErrorHandler => "errorHandler",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestNodeData {
    pub request_ref: RequestRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_response_as: Option<String>,
}

/// Where a request node takes its request from.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum RequestRef {
    CollectionRequest {
        collection_id: String,
        request_id: String,
    },
    Adhoc {
        request: Box<HttpRequest>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ExtractSource {
    LastResponseBody,
    FlowVar,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractNodeData {
    pub from: ExtractSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flow_var_name: Option<String>,
    #[serde(default)]
    pub json_path: String,
    pub to_flow_var: String,
}

/// Comparison operators understood by the condition evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConditionOp {
    Equals,
    NotEquals,
    Contains,
    Gt,
    Lt,
    #[serde(other)]
    Unknown,
}

impl ConditionOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionOp::Equals => "equals",
            ConditionOp::NotEquals => "notEquals",
            ConditionOp::Contains => "contains",
            ConditionOp::Gt => "gt",
            ConditionOp::Lt => "lt",
            ConditionOp::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum LeftOperandKind {
    FlowVar,
    LastStatus,
    LastResponseBodyPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum RightOperandKind {
    Literal,
    FlowVar,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LeftOperand {
    pub kind: LeftOperandKind,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RightOperand {
    pub kind: RightOperandKind,
    #[serde(default)]
    pub value: Value,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ConditionNodeData {
    pub left: LeftOperand,
    pub op: ConditionOp,
    pub right: RightOperand,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SetVarNodeData {
    pub key: String,
    #[serde(default)]
    pub value_template: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DelayNodeData {
    pub ms: u64,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LogNodeData {
    #[serde(default)]
    pub message_template: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoopNodeData {
    pub array_var: String,
    pub item_var: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index_var: Option<String>,
}

/// `branches` is informational; fan-out follows the outgoing edges.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ParallelNodeData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MapNodeData {
    pub input_var: String,
    pub transform_script: String,
    pub output_var: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ScriptNodeData {
    pub script: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
struct RawFlowNode {
    id: String,
    #[serde(rename = "type")]
    node_type: String,
    #[serde(default)]
    position: Position,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    data: Value,
}

impl TryFrom<RawFlowNode> for FlowNode {
    type Error = String;

    fn try_from(raw: RawFlowNode) -> Result<Self, Self::Error> {
        fn data<T: serde::de::DeserializeOwned>(id: &str, data: Value) -> Result<T, String> {
            serde_json::from_value(data).map_err(|e| format!("invalid data for node {}: {}", id, e))
        }

        let RawFlowNode {
            id,
            node_type,
            position,
            data: raw_data,
        } = raw;
        let kind = match node_type.as_str() {
            "start" => NodeKind::Start,
            "end" => NodeKind::End,
            "errorHandler" => NodeKind::ErrorHandler,
            "request" => NodeKind::Request(data(&id, raw_data)?),
            "extract" => NodeKind::Extract(data(&id, raw_data)?),
            "condition" => NodeKind::Condition(data(&id, raw_data)?),
            "setVar" => NodeKind::SetVar(data(&id, raw_data)?),
            "delay" => NodeKind::Delay(data(&id, raw_data)?),
            "log" => NodeKind::Log(data(&id, raw_data)?),
            "loop" => NodeKind::Loop(data(&id, raw_data)?),
            "parallel" => {
                if raw_data.is_null() {
                    NodeKind::Parallel(ParallelNodeData::default())
                } else {
                    NodeKind::Parallel(data(&id, raw_data)?)
                }
            }
            "map" => NodeKind::Map(data(&id, raw_data)?),
            "script" => NodeKind::Script(data(&id, raw_data)?),
            other => return Err(format!("unknown node type '{}' for node {}", other, id)),
        };
        Ok(FlowNode { id, position, kind })
    }
}

impl From<FlowNode> for RawFlowNode {
    fn from(node: FlowNode) -> Self {
        fn data<T: Serialize>(d: &T) -> Value {
            serde_json::to_value(d).unwrap_or(Value::Null)
        }

        let node_type = node.kind.type_name().to_string();
        let data = match &node.kind {
            NodeKind::Start | NodeKind::End | NodeKind::ErrorHandler => Value::Null,
            NodeKind::Request(d) => data(d),
            NodeKind::Extract(d) => data(d),
            NodeKind::Condition(d) => data(d),
            NodeKind::SetVar(d) => data(d),
            NodeKind::Delay(d) => data(d),
            NodeKind::Log(d) => data(d),
            NodeKind::Loop(d) => data(d),
            NodeKind::Parallel(d) => data(d),
            NodeKind::Map(d) => data(d),
            NodeKind::Script(d) => data(d),
        };
        RawFlowNode {
            id: node.id,
            node_type,
            position: node.position,
            data,
        }
    }
}
