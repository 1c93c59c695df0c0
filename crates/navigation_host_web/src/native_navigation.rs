//! [`NativeNavigation`] over `window.navigation`.
//!
//! `web-sys` has no stable bindings for the Navigation API, so the object is reached through
//! `js_sys::Reflect`.

use std::{cell::Cell, fmt, rc::Rc};

use navigation_host::{
    HistoryMode, ListenerId, NativeEntry, NativeNavigation, NavigateListener, NavigationType,
};
use serde_json::Value;

#[cfg(target_arch = "wasm32")]
use std::cell::RefCell;

#[cfg(target_arch = "wasm32")]
use navigation_host::NativeNavigateEvent;
#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

#[cfg(target_arch = "wasm32")]
use crate::interop::{call0, get, get_bool, get_string, js_error_to_string, js_to_json, json_to_js, method};

#[cfg(target_arch = "wasm32")]
type NavigationCallback = Closure<dyn FnMut(JsValue)>;

/// Maps a `navigationType` string.
pub fn navigation_type_from_token(token: &str) -> Option<NavigationType> {
    match token {
        "push" => Some(NavigationType::Push),
        "replace" => Some(NavigationType::Replace),
        "reload" => Some(NavigationType::Reload),
        "traverse" => Some(NavigationType::Traverse),
        _ => None,
    }
}

/// Returns the `history` option token for `mode`.
pub const fn history_mode_token(mode: HistoryMode) -> &'static str {
    match mode {
        HistoryMode::Auto => "auto",
        HistoryMode::Push => "push",
        HistoryMode::Replace => "replace",
    }
}

#[derive(Clone, Default)]
/// Browser Navigation API handle.
///
/// Reports unavailable outside `wasm32` and in browsers without `window.navigation`.
pub struct WebNativeNavigation {
    next_id: Rc<Cell<u64>>,
    #[cfg(target_arch = "wasm32")]
    listeners: Rc<RefCell<Vec<(ListenerId, NavigationCallback)>>>,
}

impl fmt::Debug for WebNativeNavigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebNativeNavigation")
            .field("available", &self.is_available())
            .finish()
    }
}

#[cfg(target_arch = "wasm32")]
fn navigation_object() -> Option<JsValue> {
    let window: JsValue = web_sys::window()?.into();
    get(&window, "navigation").filter(JsValue::is_object)
}

#[cfg(target_arch = "wasm32")]
fn entry_from_js(entry: &JsValue) -> NativeEntry {
    NativeEntry {
        key: get_string(entry, "key").unwrap_or_default(),
        url: get_string(entry, "url").unwrap_or_default(),
        index: get(entry, "index")
            .and_then(|index| index.as_f64())
            .filter(|index| *index >= 0.0)
            .map_or(0, |index| index as usize),
        state: call0(entry, "getState").ok().and_then(js_to_json),
    }
}

#[cfg(target_arch = "wasm32")]
fn is_same_origin(url: &str) -> bool {
    let Some(window) = web_sys::window() else {
        return false;
    };
    let Ok(origin) = window.location().origin() else {
        return false;
    };
    web_sys::Url::new_with_base(url, &origin)
        .map(|parsed| parsed.origin() == origin)
        .unwrap_or(false)
}

#[cfg(target_arch = "wasm32")]
fn event_from_js(event: &JsValue) -> Option<NativeNavigateEvent> {
    let destination = get(event, "destination")?;
    let destination_url = get_string(&destination, "url")?;
    Some(NativeNavigateEvent {
        navigation_type: get_string(event, "navigationType")
            .as_deref()
            .and_then(navigation_type_from_token)
            .unwrap_or(NavigationType::Push),
        destination_state: call0(&destination, "getState").ok().and_then(js_to_json),
        same_origin: is_same_origin(&destination_url),
        can_intercept: get_bool(event, "canIntercept"),
        hash_change: get_bool(event, "hashChange"),
        download_request: get_string(event, "downloadRequest"),
        destination_url,
    })
}

impl NativeNavigation for WebNativeNavigation {
    fn is_available(&self) -> bool {
        #[cfg(target_arch = "wasm32")]
        {
            navigation_object().is_some()
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            false
        }
    }

    fn current_entry(&self) -> Option<NativeEntry> {
        #[cfg(target_arch = "wasm32")]
        {
            get(&navigation_object()?, "currentEntry").map(|entry| entry_from_js(&entry))
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            None
        }
    }

    fn entries(&self) -> Vec<NativeEntry> {
        #[cfg(target_arch = "wasm32")]
        {
            let Some(entries) = navigation_object().and_then(|nav| call0(&nav, "entries").ok())
            else {
                return Vec::new();
            };
            js_sys::Array::from(&entries)
                .iter()
                .map(|entry| entry_from_js(&entry))
                .collect()
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            Vec::new()
        }
    }

    fn navigate(&self, url: &str, state: &Value, mode: HistoryMode) -> Result<(), String> {
        #[cfg(target_arch = "wasm32")]
        {
            let navigation =
                navigation_object().ok_or_else(|| "navigation api unavailable".to_string())?;
            let options = js_sys::Object::new();
            js_sys::Reflect::set(&options, &JsValue::from_str("state"), &json_to_js(state)?)
                .map_err(js_error_to_string)?;
            js_sys::Reflect::set(
                &options,
                &JsValue::from_str("history"),
                &JsValue::from_str(history_mode_token(mode)),
            )
            .map_err(js_error_to_string)?;
            method(&navigation, "navigate")
                .ok_or_else(|| "navigation.navigate is not a function".to_string())?
                .call2(&navigation, &JsValue::from_str(url), &options)
                .map(|_| ())
                .map_err(js_error_to_string)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = (url, state, mode);
            Err("navigation api unavailable outside wasm32".to_string())
        }
    }

    fn add_navigate_listener(&self, listener: NavigateListener) -> Option<ListenerId> {
        #[cfg(target_arch = "wasm32")]
        {
            let navigation = navigation_object()?;
            let callback = NavigationCallback::wrap(Box::new(move |event: JsValue| {
                let Some(native_event) = event_from_js(&event) else {
                    return;
                };
                if listener(&native_event) {
                    if let Err(err) = call0(&event, "intercept") {
                        leptos::logging::warn!("navigate intercept failed: {err}");
                    }
                }
            }));
            navigation
                .unchecked_ref::<web_sys::EventTarget>()
                .add_event_listener_with_callback("navigate", callback.as_ref().unchecked_ref())
                .ok()?;
            let id = ListenerId(self.next_id.get() + 1);
            self.next_id.set(id.0);
            self.listeners.borrow_mut().push((id, callback));
            Some(id)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = (listener, &self.next_id);
            None
        }
    }

    fn remove_navigate_listener(&self, id: ListenerId) {
        #[cfg(target_arch = "wasm32")]
        {
            let removed = {
                let mut listeners = self.listeners.borrow_mut();
                listeners
                    .iter()
                    .position(|(listener_id, _)| *listener_id == id)
                    .map(|index| listeners.remove(index))
            };
            let (Some((_, callback)), Some(navigation)) = (removed, navigation_object()) else {
                return;
            };
            if let Err(err) = navigation
                .unchecked_ref::<web_sys::EventTarget>()
                .remove_event_listener_with_callback("navigate", callback.as_ref().unchecked_ref())
            {
                leptos::logging::warn!(
                    "failed to remove navigate listener: {}",
                    js_error_to_string(err)
                );
            }
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = id;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use navigation_host::NativeNavigateEvent;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn tokens_match_the_navigation_api() {
        for kind in [
            NavigationType::Push,
            NavigationType::Replace,
            NavigationType::Reload,
            NavigationType::Traverse,
        ] {
            let token = serde_json::to_value(kind).expect("serialize");
            assert_eq!(
                navigation_type_from_token(token.as_str().expect("string token")),
                Some(kind)
            );
        }
        assert_eq!(navigation_type_from_token("unknown"), None);
        assert_eq!(history_mode_token(HistoryMode::Replace), "replace");
    }

    #[test]
    fn native_builds_report_unavailable() {
        let native = WebNativeNavigation::default();
        assert!(!native.is_available());
        assert_eq!(native.current_entry(), None);
        assert!(native.entries().is_empty());
        assert!(native.navigate("/", &json!({}), HistoryMode::Push).is_err());
        assert_eq!(
            native.add_navigate_listener(Rc::new(|_: &NativeNavigateEvent| true)),
            None
        );
    }
}
