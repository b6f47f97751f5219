use serde_json::Value;

use crate::domain::model::ConditionOp;

use super::operators::{contains, greater_than, less_than, loose_equals};

/// Evaluates `left <op> right`. Unknown operators yield `false`.
pub fn evaluate(left: Option<&Value>, op: ConditionOp, right: Option<&Value>) -> bool {
    match op {
        ConditionOp::Equals => loose_equals(left, right),
        ConditionOp::NotEquals => !loose_equals(left, right),
        ConditionOp::Contains => contains(left, right),
        ConditionOp::Gt => greater_than(left, right),
        ConditionOp::Lt => less_than(left, right),
        ConditionOp::Unknown => false,
    }
}

/// Parses an operator name, mapping anything unrecognised to
/// [`ConditionOp::Unknown`].
pub fn parse_op(name: &str) -> ConditionOp {
    serde_json::from_value(Value::String(name.to_string())).unwrap_or(ConditionOp::Unknown)
}
