use serde_json::Value;

use super::type_coercion::{to_js_string, to_number};

/// Abstract (loose) equality, `a == b`.
///
/// Objects and arrays compare structurally against each other; against a
/// primitive they are converted with `String(x)` first.
pub fn loose_equals(a: Option<&Value>, b: Option<&Value>) -> bool {
    let nullish = |v: Option<&Value>| matches!(v, None | Some(Value::Null));
    match (a, b) {
        _ if nullish(a) || nullish(b) => nullish(a) && nullish(b),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x == y,
        (Some(Value::String(x)), Some(Value::String(y))) => x == y,
        (Some(Value::Number(_)), Some(Value::Number(_))) => to_number(a) == to_number(b),
        (Some(Value::Bool(x)), _) => loose_equals(Some(&Value::from(u8::from(*x))), b),
        (_, Some(Value::Bool(y))) => loose_equals(a, Some(&Value::from(u8::from(*y)))),
        (Some(Value::Number(_)), Some(Value::String(_)))
        | (Some(Value::String(_)), Some(Value::Number(_))) => to_number(a) == to_number(b),
        (Some(x @ (Value::Array(_) | Value::Object(_))), Some(y @ (Value::Array(_) | Value::Object(_)))) => {
            x == y
        }
        (Some(Value::Array(_) | Value::Object(_)), _) => {
            let primitive = Value::String(to_js_string(a));
            loose_equals(Some(&primitive), b)
        }
        (_, Some(Value::Array(_) | Value::Object(_))) => {
            let primitive = Value::String(to_js_string(b));
            loose_equals(a, Some(&primitive))
        }
        _ => false,
    }
}

/// `String(a).includes(String(b))`
pub fn contains(a: Option<&Value>, b: Option<&Value>) -> bool {
    to_js_string(a).contains(&to_js_string(b))
}

/// `Number(a) > Number(b)`; `NaN` compares false.
pub fn greater_than(a: Option<&Value>, b: Option<&Value>) -> bool {
    to_number(a) > to_number(b)
}

/// `Number(a) < Number(b)`; `NaN` compares false.
pub fn less_than(a: Option<&Value>, b: Option<&Value>) -> bool {
    to_number(a) < to_number(b)
}
