//! Flow document parser: converts raw JSON/YAML/TOML text into a [`Flow`].

use std::path::Path;

use crate::domain::model::Flow;
use crate::error::{FlowError, FlowResult};

/// Supported flow document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowFormat {
    /// JSON format (`.json`), the format flows are saved in.
    Json,
    /// YAML format (`.yaml` / `.yml`).
    Yaml,
    /// TOML format (`.toml`).
    Toml,
}

impl FlowFormat {
    /// Pick a format from a file extension. Unknown extensions yield `None`.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        let ext = path.as_ref().extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "json" => Some(FlowFormat::Json),
            "yaml" | "yml" => Some(FlowFormat::Yaml),
            "toml" => Some(FlowFormat::Toml),
            _ => None,
        }
    }
}

/// Parse a flow document.
pub fn parse_flow(content: &str, format: FlowFormat) -> FlowResult<Flow> {
    match format {
        FlowFormat::Json => {
            serde_json::from_str(content).map_err(|e| FlowError::DslParseError(e.to_string()))
        }
        FlowFormat::Yaml => {
            serde_yaml::from_str(content).map_err(|e| FlowError::DslParseError(e.to_string()))
        }
        FlowFormat::Toml => {
            // Go through serde_json::Value so fields typed as `Value` (node data,
            // literal operands, variable values) come out as plain JSON.
            let toml_val: toml::Value =
                toml::from_str(content).map_err(|e| FlowError::DslParseError(e.to_string()))?;
            serde_json::from_value(toml_value_to_json(toml_val))
                .map_err(|e| FlowError::DslParseError(e.to_string()))
        }
    }
}

/// Convert a [`toml::Value`] into a [`serde_json::Value`].
///
/// TOML has no null; datetimes are stringified.
fn toml_value_to_json(val: toml::Value) -> serde_json::Value {
    match val {
        toml::Value::String(s) => serde_json::Value::String(s),
        toml::Value::Integer(i) => serde_json::json!(i),
        toml::Value::Float(f) => serde_json::json!(f),
        toml::Value::Boolean(b) => serde_json::Value::Bool(b),
        toml::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(toml_value_to_json).collect())
        }
        toml::Value::Table(tbl) => serde_json::Value::Object(
            tbl.into_iter()
                .map(|(k, v)| (k, toml_value_to_json(v)))
                .collect(),
        ),
        toml::Value::Datetime(dt) => serde_json::Value::String(dt.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{NodeKind, RequestRef};
    use serde_json::json;

    const JSON_FLOW: &str = r#"{
        "id": "f1",
        "name": "Login",
        "nodes": [
            {"id": "s", "type": "start", "position": {"x": 0, "y": 0}, "data": {}},
            {"id": "r", "type": "request", "position": {"x": 0, "y": 100},
             "data": {"requestRef": {"kind": "collectionRequest", "collectionId": "c1", "requestId": "login"}}},
            {"id": "x", "type": "extract", "position": {"x": 0, "y": 200},
             "data": {"from": "lastResponseBody", "jsonPath": "auth.token", "toFlowVar": "token"}},
            {"id": "e", "type": "end", "position": {"x": 0, "y": 300}}
        ],
        "edges": [
            {"id": "e1", "source": "s", "target": "r"},
            {"id": "e2", "source": "r", "target": "x"},
            {"id": "e3", "source": "x", "target": "e"}
        ],
        "variables": {
            "token": {"value": "", "description": "auth token"},
            "retries": 3
        }
    }"#;

    #[test]
    fn test_parse_json() {
        let flow = parse_flow(JSON_FLOW, FlowFormat::Json).unwrap();
        assert_eq!(flow.id, "f1");
        assert_eq!(flow.nodes.len(), 4);
        assert_eq!(flow.edges.len(), 3);
        assert!(matches!(
            &flow.nodes[1].kind,
            NodeKind::Request(data) if matches!(&data.request_ref, RequestRef::CollectionRequest { request_id, .. } if request_id == "login")
        ));
        assert_eq!(flow.variables["token"].description.as_deref(), Some("auth token"));
        assert_eq!(flow.variables["retries"].value, json!(3));
    }

    #[test]
    fn test_parse_yaml() {
        let yaml = r#"
id: f2
name: Wait
nodes:
  - id: s
    type: start
  - id: d
    type: delay
    data: { ms: 250 }
  - id: e
    type: end
edges:
  - { id: e1, source: s, target: d }
  - { id: e2, source: d, target: e }
"#;
        let flow = parse_flow(yaml, FlowFormat::Yaml).unwrap();
        assert_eq!(flow.name, "Wait");
        assert!(matches!(&flow.nodes[1].kind, NodeKind::Delay(d) if d.ms == 250));
        assert_eq!(flow.version, 1);
    }

    #[test]
    fn test_parse_toml() {
        let toml_str = r#"
id = "f3"
name = "Branch"

[variables]
limit = 10

[[nodes]]
id = "s"
type = "start"

[[nodes]]
id = "c"
type = "condition"
[nodes.data]
op = "gt"
left = { kind = "flowVar", value = "count" }
right = { kind = "literal", value = 5 }

[[edges]]
id = "e1"
source = "s"
target = "c"
"#;
        let flow = parse_flow(toml_str, FlowFormat::Toml).unwrap();
        assert_eq!(flow.variables["limit"].value, json!(10));
        match &flow.nodes[1].kind {
            NodeKind::Condition(data) => assert_eq!(data.right.value, json!(5)),
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_parse_invalid_documents() {
        assert!(matches!(
            parse_flow("{{{invalid", FlowFormat::Json),
            Err(FlowError::DslParseError(_))
        ));
        assert!(parse_flow("[[[bad", FlowFormat::Toml).is_err());
        assert!(parse_flow("", FlowFormat::Json).is_err());
    }

    #[test]
    fn test_parse_unknown_node_type() {
        let doc = r#"{"id": "f", "name": "n", "nodes": [{"id": "q", "type": "teleport"}]}"#;
        let err = parse_flow(doc, FlowFormat::Json).unwrap_err();
        assert!(err.to_string().contains("teleport"));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(FlowFormat::from_path("flow.json"), Some(FlowFormat::Json));
        assert_eq!(FlowFormat::from_path("a/b/flow.YML"), Some(FlowFormat::Yaml));
        assert_eq!(FlowFormat::from_path("flow.toml"), Some(FlowFormat::Toml));
        assert_eq!(FlowFormat::from_path("flow.txt"), None);
        assert_eq!(FlowFormat::from_path("flow"), None);
    }

    #[test]
    fn test_toml_value_to_json_nested() {
        let mut table = toml::map::Map::new();
        table.insert(
            "list".into(),
            toml::Value::Array(vec![toml::Value::Integer(1), toml::Value::Boolean(true)]),
        );
        table.insert("name".into(), toml::Value::String("x".into()));
        let json_val = toml_value_to_json(toml::Value::Table(table));
        assert_eq!(json_val, json!({"list": [1, true], "name": "x"}));
    }
}
