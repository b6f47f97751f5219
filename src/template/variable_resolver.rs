use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

use regex::{Captures, Regex};
use serde_json::Value;

use crate::evaluator::to_js_string;

/// `{{ name }}` placeholder; the name is everything between the braces.
const PLACEHOLDER_PATTERN: &str = r"\{\{([^}]+)\}\}";

fn placeholder_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(PLACEHOLDER_PATTERN).ok()).as_ref()
}

/// 解析模板中的 {{name}} 占位符
///
/// Lookup order is flow variables first, then environment variables. A
/// placeholder found in neither is written back as `{{name}}` with the name
/// trimmed. Flow variable values are stringified like `String(x)`.
pub fn resolve_template(
    template: &str,
    flow_vars: &HashMap<String, Value>,
    env_vars: &BTreeMap<String, String>,
) -> String {
    let Some(re) = placeholder_regex() else {
        return template.to_string();
    };
    if !template.contains("{{") {
        return template.to_string();
    }

    re.replace_all(template, |caps: &Captures| {
        let key = caps[1].trim();
        if let Some(value) = flow_vars.get(key) {
            return to_js_string(Some(value));
        }
        if let Some(value) = env_vars.get(key) {
            return value.clone();
        }
        format!("{{{{{}}}}}", key)
    })
    .into_owned()
}

/// 提取模板中所有占位符名称
pub fn extract_placeholders(template: &str) -> Vec<String> {
    let Some(re) = placeholder_regex() else {
        return Vec::new();
    };
    re.captures_iter(template)
        .map(|cap| cap[1].trim().to_string())
        .collect()
}
