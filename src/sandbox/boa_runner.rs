//! JavaScript script capability backed by boa_engine.
//!
//! User code is compiled as the body of a function whose parameters depend on
//! the [`ScriptKind`]. Bindings enter as JSON and every effect (return value,
//! flow variables, console output, request edits) leaves as JSON, so the
//! interpreter never holds references into the run.

use std::time::Instant;

use boa_engine::{Context, Source};
use serde_json::{json, Value};
use tracing::debug;

use super::error::SandboxError;
use super::js_builtins::{self, BUILTIN_GLOBALS};
use super::types::*;

const STANDARD_GLOBALS: &[&str] = &[
    "JSON",
    "Math",
    "parseInt",
    "parseFloat",
    "isNaN",
    "isFinite",
    "Number",
    "String",
    "Boolean",
    "Array",
    "Object",
    "Error",
    "TypeError",
    "RangeError",
    "encodeURIComponent",
    "decodeURIComponent",
    "encodeURI",
    "decodeURI",
    "RegExp",
    "Date",
    "Map",
    "Set",
    "Symbol",
    "Infinity",
    "NaN",
    "undefined",
];

const CONSOLE_SETUP: &str = r#"
var __logs = [];
function __log(level) {
    return function() {
        __logs.push({ level: level, msg: Array.prototype.slice.call(arguments).join(' ') });
    };
}
var console = { log: __log('info'), info: __log('info'), warn: __log('warn'), error: __log('error') };
"#;

/// Built-in script capability using boa_engine
#[derive(Debug, Clone, Default)]
pub struct BoaScriptRunner {
    config: ScriptConfig,
}

impl BoaScriptRunner {
    pub fn new(config: ScriptConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScriptConfig {
        &self.config
    }

    fn validate_code(&self, code: &str) -> Result<(), SandboxError> {
        if code.len() > self.config.max_code_length {
            return Err(SandboxError::CodeTooLarge {
                max: self.config.max_code_length,
                actual: code.len(),
            });
        }
        Ok(())
    }

    fn security_setup(&self) -> String {
        let mut allowed: Vec<&str> = STANDARD_GLOBALS
            .iter()
            .chain(BUILTIN_GLOBALS.iter())
            .copied()
            .chain(["console", "__logs", "__log"])
            .collect();
        allowed.sort_unstable();
        allowed.dedup();
        let allowed_list = allowed
            .iter()
            .map(|s| format!("\"{}\"", s))
            .collect::<Vec<_>>()
            .join(",");

        format!(
            r#"
var __allowed_globals = new Set([{allowed_list}]);
var __global = (typeof globalThis !== 'undefined') ? globalThis : this;
var __Function = __global.Function;
Object.getOwnPropertyNames(__global).forEach(function(key) {{
    if (!__allowed_globals.has(key)) {{
        try {{ delete __global[key]; }} catch (e) {{ __global[key] = undefined; }}
    }}
}});
{freeze_globals}
"#,
            allowed_list = allowed_list,
            freeze_globals = if self.config.freeze_globals {
                "Object.freeze(__global); Object.freeze(Object.prototype); Object.freeze(Array.prototype); if (typeof __Function !== 'undefined') { Object.freeze(__Function.prototype); }"
            } else {
                ""
            }
        )
    }

    /// The call expression that runs the user code for `kind`.
    fn invocation(kind: ScriptKind, code: &str) -> String {
        match kind {
            ScriptKind::Transform => format!(
                "(function(input, flowVars) {{\n{code}\n}})(__b.hasInput ? __b.input : undefined, __flowVars)"
            ),
            ScriptKind::Logic => format!(
                "(function(flowVars, setVar, getVar, console) {{\n{code}\n}})(__flowVars, __setVar, __getVar, console)"
            ),
            ScriptKind::PreRequest | ScriptKind::PostRequest => format!(
                "(function(request, environment, response, setEnv, getEnv, console) {{\n{code}\n}})(__request, __b.environment, __response, __setVar, __getEnv, console)"
            ),
        }
    }

    /// Reads back `__logs` after a failed evaluation.
    fn captured_logs(context: &mut Context) -> Vec<ScriptLog> {
        context
            .eval(Source::from_bytes(
                "JSON.stringify(typeof __logs === 'undefined' ? [] : __logs)",
            ))
            .ok()
            .and_then(|v| v.as_string().map(|s| s.to_std_string_escaped()))
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    fn execute_js(&self, request: &ScriptRequest) -> Result<ScriptOutcome, SandboxError> {
        let mut context = Context::default();

        js_builtins::register_all(&mut context)
            .map_err(|e| SandboxError::InternalError(format!("Failed to register builtins: {}", e)))?;

        context
            .runtime_limits_mut()
            .set_loop_iteration_limit(self.config.loop_iteration_limit);
        context
            .runtime_limits_mut()
            .set_recursion_limit(self.config.recursion_limit);

        let bindings = &request.bindings;
        let bindings_json = serde_json::to_string(&json!({
            "hasInput": bindings.input.is_some(),
            "input": bindings.input,
            "flowVars": bindings.flow_vars,
            "env": bindings.env_vars,
            "request": bindings.request,
            "response": bindings.response,
            "environment": bindings.environment,
        }))
        .map_err(|e| SandboxError::SerializationError(e.to_string()))?;

        let full_code = format!(
            r#"
{console_setup}
{security_setup}

(function() {{
    var __b = JSON.parse('{bindings_escaped}');
    var __flowVars = __b.flowVars;
    var __request = __b.request === null ? undefined : __b.request;
    var __response = __b.response === null ? undefined : __b.response;
    var __setVar = function(key, value) {{ __flowVars[key] = value; }};
    var __getVar = function(key) {{ return __flowVars[key]; }};
    var __getEnv = function(key) {{ return __flowVars[key] || __b.env[key]; }};

    var __value = {invocation};

    var __vars = {{}};
    Object.keys(__flowVars).forEach(function(key) {{
        __vars[key] = __flowVars[key] === undefined ? null : __flowVars[key];
    }});
    return JSON.stringify({{
        "hasValue": __value !== undefined,
        "value": __value === undefined ? null : __value,
        "flowVars": __vars,
        "logs": __logs,
        "request": __request === undefined ? null : __request
    }});
}})();
"#,
            console_setup = CONSOLE_SETUP,
            security_setup = self.security_setup(),
            bindings_escaped = bindings_json.replace('\\', "\\\\").replace('\'', "\\'"),
            invocation = Self::invocation(request.kind, &request.code),
        );

        let result = match context.eval(Source::from_bytes(&full_code)) {
            Ok(result) => result,
            Err(e) => {
                let error = SandboxError::from_js_error(e.to_string());
                return Err(error.with_logs(Self::captured_logs(&mut context)));
            }
        };

        let result_str = result
            .as_string()
            .map(|s| s.to_std_string_escaped())
            .ok_or_else(|| {
                SandboxError::InternalError("script wrapper did not return a string".to_string())
            })?;

        let wrapper: Value = serde_json::from_str(&result_str)
            .map_err(|e| SandboxError::SerializationError(format!("Failed to parse result: {}", e)))?;

        let value = if wrapper.get("hasValue").and_then(Value::as_bool).unwrap_or(false) {
            Some(wrapper.get("value").cloned().unwrap_or(Value::Null))
        } else {
            None
        };

        let flow_vars = wrapper
            .get("flowVars")
            .and_then(Value::as_object)
            .map(|obj| obj.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default();

        let logs = wrapper
            .get("logs")
            .cloned()
            .map(serde_json::from_value::<Vec<ScriptLog>>)
            .transpose()
            .map_err(|e| SandboxError::SerializationError(e.to_string()))?
            .unwrap_or_default();

        let script_request = wrapper.get("request").filter(|v| !v.is_null()).cloned();

        Ok(ScriptOutcome {
            value,
            flow_vars,
            logs,
            request: script_request,
        })
    }
}

#[async_trait::async_trait]
impl ScriptCapability for BoaScriptRunner {
    async fn run(&self, request: ScriptRequest) -> Result<ScriptOutcome, SandboxError> {
        self.validate_code(&request.code)?;

        let start_time = Instant::now();
        let runner = self.clone();
        let kind = request.kind;

        // boa_engine is synchronous and its Context is not Send
        let result = tokio::task::spawn_blocking(move || runner.execute_js(&request))
            .await
            .map_err(|e| SandboxError::InternalError(format!("Task join error: {}", e)))?;

        debug!(
            kind = ?kind,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            ok = result.is_ok(),
            "script finished"
        );
        result
    }
}
