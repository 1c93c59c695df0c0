//! Hash-fragment provider (`#/<pane>?data=..`).

use std::{cell::Cell, fmt, rc::Rc};

use leptos::logging;

use crate::{
    codec::{encode_hash, state_from_hash, state_from_value},
    environment::{HistoryEnvironment, HistoryEvent, HistoryEventKind, ListenerId},
    model::{NavigationState, PaneParams, StateChangeCallback},
    provider::NavigationProvider,
};

struct Shared<P, E> {
    env: E,
    on_change: StateChangeCallback<P>,
}

impl<P: PaneParams, E: HistoryEnvironment> Shared<P, E> {
    fn state_from_location(&self) -> Option<NavigationState<P>> {
        state_from_hash(&self.env.location()?.hash)
    }

    fn handle_hash_change(&self, event: &HistoryEvent) {
        let state = event
            .state
            .clone()
            .or_else(|| self.env.history_state())
            .as_ref()
            .and_then(state_from_value::<P>)
            .or_else(|| self.state_from_location());
        if let Some(state) = state {
            (self.on_change)(state);
        }
    }
}

/// Provider that mirrors the current route into the URL hash.
///
/// `push_state` assigns the hash and lets the resulting hash change notify. `replace_state`
/// rewrites the entry in place, which raises no hash change, so it notifies synchronously.
pub struct HashRouterProvider<P, E: HistoryEnvironment> {
    shared: Rc<Shared<P, E>>,
    listener: Cell<Option<ListenerId>>,
    destroyed: Cell<bool>,
}

impl<P, E: HistoryEnvironment> fmt::Debug for HashRouterProvider<P, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashRouterProvider")
            .field("destroyed", &self.destroyed.get())
            .finish()
    }
}

impl<P: PaneParams, E: HistoryEnvironment + 'static> HashRouterProvider<P, E> {
    /// Creates the provider and subscribes to `hashchange`.
    pub fn new(env: E, on_change: StateChangeCallback<P>) -> Self {
        let shared = Rc::new(Shared { env, on_change });
        let weak = Rc::downgrade(&shared);
        let listener = shared.env.add_listener(
            HistoryEventKind::HashChange,
            Rc::new(move |event: &HistoryEvent| {
                if let Some(shared) = weak.upgrade() {
                    shared.handle_hash_change(event);
                }
            }),
        );
        if listener.is_none() {
            logging::warn!("hash router created without a window; writes are no-ops");
        }
        Self {
            shared,
            listener: Cell::new(listener),
            destroyed: Cell::new(false),
        }
    }

    /// Borrows the underlying environment.
    pub fn environment(&self) -> &E {
        &self.shared.env
    }

    fn encode(&self, op: &str, state: &NavigationState<P>) -> Option<String> {
        if self.destroyed.get() {
            logging::warn!("hash router {op} ignored after destroy");
            return None;
        }
        match encode_hash(&state.route) {
            Ok(hash) => Some(hash),
            Err(err) => {
                logging::warn!("hash router {op} failed: {err}");
                None
            }
        }
    }
}

impl<P: PaneParams, E: HistoryEnvironment + 'static> NavigationProvider<P>
    for HashRouterProvider<P, E>
{
    fn current_state(&self) -> Option<NavigationState<P>> {
        self.shared.state_from_location()
    }

    fn push_state(&self, state: &NavigationState<P>) {
        let Some(hash) = self.encode("push", state) else {
            return;
        };
        if let Err(err) = self.shared.env.assign_hash(&hash) {
            logging::warn!("hash router push failed: {err}");
        }
    }

    fn replace_state(&self, state: &NavigationState<P>) {
        let Some(hash) = self.encode("replace", state) else {
            return;
        };
        match self.shared.env.replace_url(None, &hash) {
            Ok(()) => (self.shared.on_change)(state.clone()),
            Err(err) => logging::warn!("hash router replace failed: {err}"),
        }
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
