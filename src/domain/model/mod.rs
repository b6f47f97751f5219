//! Flow graph and request model types shared across layers.

mod flow;
mod request;

pub use flow::{
    ConditionNodeData, ConditionOp, DelayNodeData, EdgeId, ExtractNodeData, ExtractSource, Flow,
    FlowEdge, FlowId, FlowNode, FlowVariable, LeftOperand, LeftOperandKind, LogNodeData,
    LoopNodeData, MapNodeData, NodeId, NodeKind, ParallelNodeData, Position, RequestNodeData,
    RequestRef, RightOperand, RightOperandKind, ScriptNodeData, SetVarNodeData,
};
pub use request::{
    ApiKeyItem, ApiKeyLocation, AuthConfig, AuthType, BodyType, Collection, Environment,
    EnvironmentVariable, FormDataItem, FormDataKind, HeaderKV, HttpMethod, HttpRequest,
    HttpResponse, QueryParamKV, RawBodyType, RequestBody, ResponseBodyType,
};
