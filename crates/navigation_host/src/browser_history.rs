//! Query-string provider backed by session history (`pushState` / `popstate`).

use std::{cell::Cell, fmt, rc::Rc};

use leptos::logging;

use crate::{
    codec::{encode_query_url, state_from_query, state_from_value, state_to_value},
    environment::{HistoryEnvironment, HistoryEvent, HistoryEventKind, ListenerId},
    model::{NavigationState, PaneParams, StateChangeCallback},
    provider::NavigationProvider,
};

struct Shared<P, E> {
    env: E,
    base_path: String,
    on_change: StateChangeCallback<P>,
}

impl<P: PaneParams, E: HistoryEnvironment> Shared<P, E> {
    fn state_from_location(&self) -> Option<NavigationState<P>> {
        state_from_query(&self.env.location()?.search)
    }

    fn handle_pop_state(&self, event: &HistoryEvent) {
        let state = event
            .state
            .as_ref()
            .and_then(state_from_value::<P>)
            .or_else(|| self.state_from_location());
        if let Some(state) = state {
            (self.on_change)(state);
        }
    }

    fn write(&self, op: &str, state: &NavigationState<P>, replace: bool) {
        let written = encode_query_url(&self.base_path, &state.route)
            .and_then(|url| Ok((url, state_to_value(state)?)))
            .map_err(|err| err.to_string())
            .and_then(|(url, value)| {
                if replace {
                    self.env.replace_url(Some(&value), &url)
                } else {
                    self.env.push_url(Some(&value), &url)
                }
            });
        if let Err(err) = written {
            logging::warn!("browser history {op} failed: {err}");
        }
    }
}

/// Provider that mirrors the current route into `<base>?pane=..&data=..`.
///
/// Writes never call the change callback: the caller already holds the state it wrote. Only
/// `popstate` (user back/forward) propagates, preferring the state stored in the history entry
/// and falling back to parsing the URL.
pub struct BrowserHistoryProvider<P, E: HistoryEnvironment> {
    shared: Rc<Shared<P, E>>,
    listener: Cell<Option<ListenerId>>,
    destroyed: Cell<bool>,
}

impl<P, E: HistoryEnvironment> fmt::Debug for BrowserHistoryProvider<P, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BrowserHistoryProvider")
            .field("base_path", &self.shared.base_path)
            .field("destroyed", &self.destroyed.get())
            .finish()
    }
}

impl<P: PaneParams, E: HistoryEnvironment + 'static> BrowserHistoryProvider<P, E> {
    /// Creates the provider and subscribes to `popstate`.
    ///
    /// `base_path` defaults to the current pathname.
    pub fn new(env: E, base_path: Option<String>, on_change: StateChangeCallback<P>) -> Self {
        let base_path = base_path
            .or_else(|| env.location().map(|location| location.pathname))
            .filter(|path| !path.is_empty())
            .unwrap_or_else(|| "/".to_string());
        let shared = Rc::new(Shared {
            env,
            base_path,
            on_change,
        });

        let weak = Rc::downgrade(&shared);
        let listener = shared.env.add_listener(
            HistoryEventKind::PopState,
            Rc::new(move |event: &HistoryEvent| {
                if let Some(shared) = weak.upgrade() {
                    shared.handle_pop_state(event);
                }
            }),
        );
        if listener.is_none() {
            logging::warn!("browser history provider created without a window; writes are no-ops");
        }

        Self {
            shared,
            listener: Cell::new(listener),
            destroyed: Cell::new(false),
        }
    }

    /// Path prefix used for written URLs.
    pub fn base_path(&self) -> &str {
        &self.shared.base_path
    }

    /// Borrows the underlying environment.
    pub fn environment(&self) -> &E {
        &self.shared.env
    }

    /// Traverses one entry back through the environment.
    pub fn go_back(&self) {
        if let Err(err) = self.shared.env.go(-1) {
            logging::warn!("browser history back failed: {err}");
        }
    }

    /// Traverses one entry forward through the environment.
    pub fn go_forward(&self) {
        if let Err(err) = self.shared.env.go(1) {
            logging::warn!("browser history forward failed: {err}");
        }
    }
}

impl<P: PaneParams, E: HistoryEnvironment + 'static> NavigationProvider<P>
    for BrowserHistoryProvider<P, E>
{
    fn current_state(&self) -> Option<NavigationState<P>> {
        self.shared.state_from_location()
    }

    fn push_state(&self, state: &NavigationState<P>) {
        if self.destroyed.get() {
            logging::warn!("browser history push ignored after destroy");
            return;
        }
        self.shared.write("push", state, false);
    }

    fn replace_state(&self, state: &NavigationState<P>) {
        if self.destroyed.get() {
            logging::warn!("browser history replace ignored after destroy");
            return;
        }
        self.shared.write("replace", state, true);
    }

    fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        if let Some(id) = self.listener.take() {
            self.shared.env.remove_listener(id);
        }
    }
}
