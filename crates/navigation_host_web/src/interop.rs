//! JS value conversion shared by the browser bindings.

use js_sys::{Function, Reflect};
use serde::Serialize;
use serde_json::Value;
use serde_wasm_bindgen::{from_value, Serializer};
use wasm_bindgen::{JsCast, JsValue};

pub(crate) fn js_error_to_string(err: JsValue) -> String {
    if let Some(text) = err.as_string() {
        return text;
    }
    if let Ok(message) = Reflect::get(&err, &JsValue::from_str("message")) {
        if let Some(text) = message.as_string() {
            return text;
        }
    }
    format!("{err:?}")
}

/// Converts JSON into a plain JS value (objects, not `Map`s).
pub(crate) fn json_to_js(value: &Value) -> Result<JsValue, String> {
    value
        .serialize(&Serializer::json_compatible())
        .map_err(|e| e.to_string())
}

/// Reads a JS value as JSON. `null`/`undefined` and non-JSON values read as `None`.
pub(crate) fn js_to_json(value: JsValue) -> Option<Value> {
    if value.is_null() || value.is_undefined() {
        return None;
    }
    from_value(value).ok()
}

pub(crate) fn get(target: &JsValue, key: &str) -> Option<JsValue> {
    Reflect::get(target, &JsValue::from_str(key))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

pub(crate) fn get_string(target: &JsValue, key: &str) -> Option<String> {
    get(target, key)?.as_string()
}

pub(crate) fn get_bool(target: &JsValue, key: &str) -> bool {
    get(target, key).and_then(|value| value.as_bool()).unwrap_or(false)
}

pub(crate) fn method(target: &JsValue, name: &str) -> Option<Function> {
    get(target, name)?.dyn_into::<Function>().ok()
}

/// Calls `target[name]()`.
pub(crate) fn call0(target: &JsValue, name: &str) -> Result<JsValue, String> {
    method(target, name)
        .ok_or_else(|| format!("`{name}` is not a function"))?
        .call0(target)
        .map_err(js_error_to_string)
}
