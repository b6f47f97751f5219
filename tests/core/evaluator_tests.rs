use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Value};

use reqflow::evaluator::{evaluate, extract_path, parse_op, to_js_string, ConditionOp};
use reqflow::template::{extract_placeholders, resolve_template};

fn vars(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_resolve_without_placeholders_is_identity() {
    let flow_vars = vars(&[("x", json!(1))]);
    let env_vars = env(&[("host", "example.com")]);
    for template in ["", "plain text", "{ single }", "a}}b{{", "{{", "}}"] {
        assert_eq!(resolve_template(template, &flow_vars, &env_vars), template);
    }
}

#[test]
fn test_resolve_flow_var() {
    let flow_vars = vars(&[("x", json!("5"))]);
    assert_eq!(resolve_template("{{x}}", &flow_vars, &BTreeMap::new()), "5");
}

#[test]
fn test_resolve_missing_keeps_placeholder() {
    assert_eq!(
        resolve_template("{{y}}", &HashMap::new(), &BTreeMap::new()),
        "{{y}}"
    );
}

#[test]
fn test_resolve_flow_vars_shadow_environment() {
    let flow_vars = vars(&[("host", json!("flow.local"))]);
    let env_vars = env(&[("host", "env.local"), ("port", "8080")]);
    assert_eq!(
        resolve_template("https://{{ host }}:{{port}}/", &flow_vars, &env_vars),
        "https://flow.local:8080/"
    );
}

#[test]
fn test_resolve_stringifies_like_js() {
    let flow_vars = vars(&[
        ("n", json!(3.0)),
        ("list", json!([1, "a", null])),
        ("obj", json!({"a": 1})),
        ("nothing", Value::Null),
    ]);
    let out = resolve_template("{{n}}|{{list}}|{{obj}}|{{nothing}}", &flow_vars, &BTreeMap::new());
    assert_eq!(out, "3|1,a,|[object Object]|null");
}

#[test]
fn test_extract_placeholders_trims_names() {
    assert_eq!(
        extract_placeholders("Bearer {{ token }} for {{user}}"),
        vec!["token".to_string(), "user".to_string()]
    );
}

#[test]
fn test_extract_nested_array_index() {
    let value = json!({"a": {"b": [10, 20, 30]}});
    assert_eq!(extract_path(Some(&value), "a.b.1"), Some(json!(20)));
}

#[test]
fn test_extract_from_null_is_undefined() {
    assert_eq!(extract_path(Some(&Value::Null), "a.b"), None);
    assert_eq!(extract_path(None, "a.b"), None);
}

#[test]
fn test_extract_edge_cases() {
    let value = json!({"items": [{"id": 7}], "s": "text"});
    assert_eq!(extract_path(Some(&value), ""), Some(value.clone()));
    assert_eq!(extract_path(Some(&value), "items.0.id"), Some(json!(7)));
    assert_eq!(extract_path(Some(&value), "items.first"), None);
    assert_eq!(extract_path(Some(&value), "items.5"), None);
    assert_eq!(extract_path(Some(&value), "s.length"), None);
    assert_eq!(extract_path(Some(&value), "missing.deeper"), None);
}

#[test]
fn test_evaluate_documented_cases() {
    assert!(evaluate(Some(&json!(5)), ConditionOp::Gt, Some(&json!("3"))));
    assert!(evaluate(Some(&json!("abc")), ConditionOp::Contains, Some(&json!("b"))));
    assert!(!evaluate(Some(&json!(1)), parse_op("bogusOp"), Some(&json!(1))));
}

#[test]
fn test_evaluate_loose_equality() {
    assert!(evaluate(Some(&json!(200)), ConditionOp::Equals, Some(&json!("200"))));
    assert!(evaluate(Some(&json!(true)), ConditionOp::Equals, Some(&json!(1))));
    assert!(evaluate(None, ConditionOp::Equals, Some(&Value::Null)));
    assert!(!evaluate(Some(&json!(0)), ConditionOp::Equals, Some(&Value::Null)));
    assert!(evaluate(Some(&json!("a")), ConditionOp::NotEquals, Some(&json!("b"))));
}

#[test]
fn test_evaluate_nan_comparisons_are_false() {
    let word = json!("abc");
    assert!(!evaluate(Some(&word), ConditionOp::Gt, Some(&json!(1))));
    assert!(!evaluate(Some(&word), ConditionOp::Lt, Some(&json!(1))));
    assert!(!evaluate(None, ConditionOp::Gt, Some(&json!(-1))));
}

#[test]
fn test_evaluate_contains_stringifies() {
    assert!(evaluate(Some(&json!(12345)), ConditionOp::Contains, Some(&json!(234))));
    assert!(evaluate(Some(&json!([1, 2])), ConditionOp::Contains, Some(&json!("1,2"))));
    assert!(evaluate(None, ConditionOp::Contains, Some(&json!("def"))));
}

#[test]
fn test_js_string_forms() {
    assert_eq!(to_js_string(None), "undefined");
    assert_eq!(to_js_string(Some(&json!(0.5))), "0.5");
    assert_eq!(to_js_string(Some(&json!(false))), "false");
}
