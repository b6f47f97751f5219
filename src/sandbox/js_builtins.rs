use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use boa_engine::object::{FunctionObjectBuilder, ObjectInitializer};
use boa_engine::property::Attribute;
use boa_engine::{js_string, Context, JsNativeError, JsResult, JsValue, NativeFunction};
use chrono::{SecondsFormat, Utc};
use uuid::Uuid;

/// Names of the globals registered by [`register_all`].
pub const BUILTIN_GLOBALS: &[&str] = &["datetime", "btoa", "atob", "uuidv4"];

/// Register all built-in APIs into a boa context.
pub fn register_all(context: &mut Context) -> JsResult<()> {
    register_datetime(context)?;
    register_base64(context)?;
    register_uuid(context)?;
    Ok(())
}

fn register_datetime(context: &mut Context) -> JsResult<()> {
    let mut initializer = ObjectInitializer::new(context);
    initializer
        .function(NativeFunction::from_fn_ptr(datetime_now), js_string!("now"), 0)
        .function(
            NativeFunction::from_fn_ptr(datetime_format),
            js_string!("format"),
            1,
        )
        .function(
            NativeFunction::from_fn_ptr(datetime_iso_string),
            js_string!("isoString"),
            0,
        );
    let datetime = initializer.build();

    context.register_global_property(js_string!("datetime"), datetime, Attribute::all())?;
    Ok(())
}

fn register_base64(context: &mut Context) -> JsResult<()> {
    let btoa = FunctionObjectBuilder::new(context.realm(), NativeFunction::from_fn_ptr(base64_btoa))
        .name(js_string!("btoa"))
        .length(1)
        .constructor(false)
        .build();
    let atob = FunctionObjectBuilder::new(context.realm(), NativeFunction::from_fn_ptr(base64_atob))
        .name(js_string!("atob"))
        .length(1)
        .constructor(false)
        .build();

    context.register_global_property(js_string!("btoa"), btoa, Attribute::all())?;
    context.register_global_property(js_string!("atob"), atob, Attribute::all())?;
    Ok(())
}

fn register_uuid(context: &mut Context) -> JsResult<()> {
    let uuidv4 = FunctionObjectBuilder::new(context.realm(), NativeFunction::from_fn_ptr(uuid_v4))
        .name(js_string!("uuidv4"))
        .length(0)
        .constructor(false)
        .build();
    context.register_global_property(js_string!("uuidv4"), uuidv4, Attribute::all())?;
    Ok(())
}

fn datetime_now(_this: &JsValue, _args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    Ok(JsValue::from(Utc::now().timestamp_millis() as f64))
}

fn datetime_format(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let fmt = args
        .first()
        .and_then(|v| v.as_string())
        .map(|s| s.to_std_string_escaped())
        .unwrap_or_else(|| "%Y-%m-%d %H:%M:%S".to_string());
    let formatted = Utc::now().format(&fmt).to_string();
    Ok(JsValue::from(js_string!(formatted)))
}

fn datetime_iso_string(
    _this: &JsValue,
    _args: &[JsValue],
    _ctx: &mut Context,
) -> JsResult<JsValue> {
    let iso = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
    Ok(JsValue::from(js_string!(iso)))
}

/// Basic-auth style encoding: the string's bytes are encoded directly.
fn base64_btoa(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let input = js_arg_to_string(args.first());
    Ok(JsValue::from(js_string!(BASE64_STANDARD.encode(input.as_bytes()))))
}

fn base64_atob(_this: &JsValue, args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let input = js_arg_to_string(args.first());
    let decoded = BASE64_STANDARD
        .decode(input.as_bytes())
        .map_err(|_| JsNativeError::typ().with_message("Invalid base64 input"))?;
    let s = String::from_utf8(decoded)
        .map_err(|_| JsNativeError::typ().with_message("Invalid UTF-8 string"))?;
    Ok(JsValue::from(js_string!(s)))
}

fn uuid_v4(_this: &JsValue, _args: &[JsValue], _ctx: &mut Context) -> JsResult<JsValue> {
    let id = Uuid::new_v4().to_string();
    Ok(JsValue::from(js_string!(id)))
}

fn js_arg_to_string(arg: Option<&JsValue>) -> String {
    arg.and_then(|v| v.as_string())
        .map(|s| s.to_std_string_escaped())
        .unwrap_or_default()
}
