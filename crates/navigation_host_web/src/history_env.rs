//! [`HistoryEnvironment`] over `window.location`, `window.history`, and window events.

use std::{cell::Cell, fmt, rc::Rc};

use navigation_host::{BrowserLocation, HistoryEnvironment, HistoryEventKind, HistoryListener, ListenerId};
use serde_json::Value;

#[cfg(target_arch = "wasm32")]
use std::cell::RefCell;

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::{closure::Closure, JsCast, JsValue};

#[cfg(target_arch = "wasm32")]
use crate::interop::{js_error_to_string, js_to_json, json_to_js};

#[cfg(target_arch = "wasm32")]
type WindowListener = (ListenerId, HistoryEventKind, Closure<dyn FnMut(web_sys::Event)>);

#[derive(Clone, Default)]
/// Browser session-history environment.
///
/// Registered listeners own their JS closures until removed. Clones share the registry. Outside
/// `wasm32` there is no window: reads return `None` and writes fail.
pub struct WebHistoryEnvironment {
    next_id: Rc<Cell<u64>>,
    #[cfg(target_arch = "wasm32")]
    listeners: Rc<RefCell<Vec<WindowListener>>>,
}

impl fmt::Debug for WebHistoryEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebHistoryEnvironment")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl WebHistoryEnvironment {
    /// Number of registered window listeners.
    pub fn listener_count(&self) -> usize {
        #[cfg(target_arch = "wasm32")]
        {
            self.listeners.borrow().len()
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            0
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn history() -> Result<web_sys::History, String> {
    web_sys::window()
        .ok_or_else(|| "window unavailable".to_string())?
        .history()
        .map_err(js_error_to_string)
}

#[cfg(target_arch = "wasm32")]
fn state_to_js(state: Option<&Value>) -> Result<JsValue, String> {
    state.map_or(Ok(JsValue::NULL), json_to_js)
}

#[cfg(not(target_arch = "wasm32"))]
fn unavailable() -> String {
    "window unavailable outside wasm32".to_string()
}

impl HistoryEnvironment for WebHistoryEnvironment {
    fn location(&self) -> Option<BrowserLocation> {
        #[cfg(target_arch = "wasm32")]
        {
            let location = web_sys::window()?.location();
            Some(BrowserLocation {
                pathname: location.pathname().ok()?,
                search: location.search().ok()?,
                hash: location.hash().ok()?,
            })
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            None
        }
    }

    fn history_state(&self) -> Option<Value> {
        #[cfg(target_arch = "wasm32")]
        {
            js_to_json(history().ok()?.state().ok()?)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            None
        }
    }

    fn push_url(&self, state: Option<&Value>, url: &str) -> Result<(), String> {
        #[cfg(target_arch = "wasm32")]
        {
            history()?
                .push_state_with_url(&state_to_js(state)?, "", Some(url))
                .map_err(js_error_to_string)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = (state, url);
            Err(unavailable())
        }
    }

    fn replace_url(&self, state: Option<&Value>, url: &str) -> Result<(), String> {
        #[cfg(target_arch = "wasm32")]
        {
            history()?
                .replace_state_with_url(&state_to_js(state)?, "", Some(url))
                .map_err(js_error_to_string)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = (state, url);
            Err(unavailable())
        }
    }

    fn assign_hash(&self, hash: &str) -> Result<(), String> {
        #[cfg(target_arch = "wasm32")]
        {
            web_sys::window()
                .ok_or_else(|| "window unavailable".to_string())?
                .location()
                .set_hash(hash)
                .map_err(js_error_to_string)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = hash;
            Err(unavailable())
        }
    }

    fn go(&self, delta: i32) -> Result<(), String> {
        #[cfg(target_arch = "wasm32")]
        {
            history()?.go_with_delta(delta).map_err(js_error_to_string)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = delta;
            Err(unavailable())
        }
    }

    fn add_listener(
        &self,
        kind: HistoryEventKind,
        listener: HistoryListener,
    ) -> Option<ListenerId> {
        #[cfg(target_arch = "wasm32")]
        {
            let window = web_sys::window()?;
            let callback = Closure::<dyn FnMut(web_sys::Event)>::wrap(Box::new(
                move |event: web_sys::Event| {
                    let state = match kind {
                        HistoryEventKind::PopState => event
                            .dyn_ref::<web_sys::PopStateEvent>()
                            .and_then(|event| js_to_json(event.state())),
                        HistoryEventKind::HashChange => None,
                    };
                    listener(&navigation_host::HistoryEvent { kind, state });
                },
            ));
            window
                .add_event_listener_with_callback(kind.event_name(), callback.as_ref().unchecked_ref())
                .ok()?;
            let id = ListenerId(self.next_id.get() + 1);
            self.next_id.set(id.0);
            self.listeners.borrow_mut().push((id, kind, callback));
            Some(id)
        }

        #[cfg(not(target_arch = "wasm32"))]
        {
            let _ = (kind, listener, &self.next_id);
            None
        }
    }

    fn remove_listener(&self, id: ListenerId) {
        #[cfg(target_arch = "wasm32")]
        {
            let removed = {
                let mut listeners = self.listeners.borrow_mut();
                listeners
                    .iter()
                    .position(|(listener_id, _, _)| *listener_id == id)
                    .map(|index| listeners.remove(index))
            };
            let (Some((_, kind, callback)), Some(window)) = (removed, web_sys::window()) else {
                return;
            };
            if let Err(err) = window
                .remove_event_listener_with_callback(kind.event_name(), callback.as_ref().unchecked_ref())
            {
                leptos::logging::warn!(
                    "failed to remove {} listener: {}",
                    kind.event_name(),
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

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn native_builds_have_no_window() {
        let env = WebHistoryEnvironment::default();
        assert_eq!(env.location(), None);
        assert_eq!(env.history_state(), None);
        assert!(env.push_url(None, "/a").is_err());
        assert!(env.replace_url(None, "/a").is_err());
        assert!(env.assign_hash("#/list").is_err());
        assert!(env.go(-1).is_err());
        assert_eq!(
            env.add_listener(HistoryEventKind::PopState, Rc::new(|_: &navigation_host::HistoryEvent| {})),
            None
        );
        assert_eq!(env.listener_count(), 0);
    }
}
