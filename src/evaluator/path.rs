use serde_json::Value;

use super::type_coercion::string_to_number;

/// Navigates `value` along a dot-separated path.
///
/// Object segments are key lookups; against an array a segment is parsed as
/// an index. Anything that cannot be followed yields `None` (undefined).
/// An empty path returns the input unchanged.
pub fn extract_path(value: Option<&Value>, path: &str) -> Option<Value> {
    if path.is_empty() {
        return value.cloned();
    }

    let mut current = value;
    for segment in path.split('.') {
        current = match current {
            None | Some(Value::Null) => return None,
            Some(Value::Array(items)) => {
                let index = string_to_number(segment);
                if index.is_nan() {
                    return None;
                }
                if index >= 0.0 && index.fract() == 0.0 {
                    items.get(index as usize)
                } else {
                    None
                }
            }
            Some(Value::Object(map)) => map.get(segment),
            Some(_) => return None,
        };
    }
    current.cloned()
}
