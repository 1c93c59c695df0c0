//! Entry-list navigation mirrored into session history.
//!
//! Each entry is written to the window's history with `{ "key": .., "state": .. }` as its history
//! state. On `popstate` the key identifies which entry the user traversed to; an entry the
//! provider has never seen (for example after the user typed a URL) is appended.

use std::{cell::Cell, fmt, rc::Rc};

use leptos::logging;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};

use crate::{
    entries::{
        EntryNavigation, HistoryMode, NavigateOptions, NavigationError, NavigationEventKind,
        NavigationHistoryEntry, NavigationListener,
    },
    environment::{HistoryEnvironment, HistoryEvent, HistoryEventKind, ListenerId},
    memory_navigation::{navigate_state, EntryHistory},
    model::{NavigationState, PaneParams},
    provider::NavigationProvider,
};

const KEY_FIELD: &str = "key";
const STATE_FIELD: &str = "state";

fn entry_value<S: Serialize>(entry: &NavigationHistoryEntry<S>) -> Result<Value, String> {
    let state = serde_json::to_value(&entry.state).map_err(|e| e.to_string())?;
    Ok(json!({ KEY_FIELD: entry.key, STATE_FIELD: state }))
}

fn parse_entry_value<S: DeserializeOwned>(value: &Value) -> (Option<String>, Option<S>) {
    let key = value
        .get(KEY_FIELD)
        .and_then(Value::as_str)
        .map(str::to_string);
    let state = value
        .get(STATE_FIELD)
        .and_then(|state| S::deserialize(state).ok());
    (key, state)
}

struct Shared<S, E> {
    env: E,
    history: EntryHistory<S>,
}

impl<S, E> Shared<S, E>
where
    S: Clone + Serialize + DeserializeOwned,
    E: HistoryEnvironment,
{
    fn current_url(&self) -> String {
        self.env
            .location()
            .map_or_else(|| "/".to_string(), |location| location.href())
    }

    fn mirror(&self, entry: &NavigationHistoryEntry<S>, replace: bool) {
        let written = entry_value(entry).and_then(|value| {
            if replace {
                self.env.replace_url(Some(&value), &entry.url)
            } else {
                self.env.push_url(Some(&value), &entry.url)
            }
        });
        if let Err(err) = written {
            logging::warn!("web navigation history write failed: {err}");
        }
    }

    fn handle_pop_state(&self, event: &HistoryEvent) {
        let (key, state) = event
            .state
            .as_ref()
            .map_or((None, None), parse_entry_value::<S>);

        let known = key
            .as_deref()
            .and_then(|key| self.history.index_of_key(key));
        let result = match known {
            Some(index) if Some(index) == self.history.current_index() => return,
            Some(index) => self.history.traverse_to_index(index),
            None => {
                let untagged = key.is_none();
                let options = NavigateOptions {
                    state,
                    history: HistoryMode::Push,
                };
                self.history
                    .navigate_with_key(&self.current_url(), options, key)
                    .inspect(|entry| {
                        if untagged {
                            self.mirror(entry, true);
                        }
                    })
            }
        };
        if let Err(err) = result {
            logging::warn!("web navigation popstate reconcile failed: {err}");
        }
    }
}

/// Entry-list navigation kept in step with the window's session history.
///
/// Programmatic `back`/`forward`/`traverse_to` update the entry list immediately and then ask the
/// window to traverse; the `popstate` that follows lands on the already-current entry and is
/// ignored.
pub struct WebNavigationProvider<S, E: HistoryEnvironment> {
    shared: Rc<Shared<S, E>>,
    listener: Cell<Option<ListenerId>>,
    base_path: String,
}

impl<S, E: HistoryEnvironment> fmt::Debug for WebNavigationProvider<S, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebNavigationProvider")
            .field("history", &self.shared.history)
            .field("base_path", &self.base_path)
            .finish()
    }
}

impl<S, E> WebNavigationProvider<S, E>
where
    S: Clone + Serialize + DeserializeOwned + 'static,
    E: HistoryEnvironment + 'static,
{
    /// Adopts the window's current entry as the first entry and subscribes to `popstate`.
    pub fn new(env: E) -> Self {
        let location = env.location();
        let url = location
            .as_ref()
            .map_or_else(|| "/".to_string(), |location| location.href());
        let base_path = location
            .map(|location| location.pathname)
            .filter(|path| !path.is_empty())
            .unwrap_or_else(|| "/".to_string());
        let (key, state) = env
            .history_state()
            .as_ref()
            .map_or((None, None), parse_entry_value::<S>);

        let shared = Rc::new(Shared {
            history: EntryHistory::new(NavigationHistoryEntry::new(url, 0, state, key)),
            env,
        });
        if let Some(entry) = shared.history.current_entry() {
            shared.mirror(&entry, true);
        }

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
            logging::warn!("web navigation created without a window; entries stay in memory");
        }

        Self {
            shared,
            listener: Cell::new(listener),
            base_path,
        }
    }

    /// Borrows the underlying environment.
    pub fn environment(&self) -> &E {
        &self.shared.env
    }

    /// Emits `dispose`, drops listeners and entries, and unsubscribes from `popstate`. Repeat
    /// calls are no-ops.
    pub fn destroy(&self) {
        if !self.shared.history.destroy() {
            return;
        }
        if let Some(id) = self.listener.take() {
            self.shared.env.remove_listener(id);
        }
    }

    fn go(&self, from: Option<usize>, entry: &NavigationHistoryEntry<S>) {
        let Some(from) = from else {
            return;
        };
        let delta = entry.index as i64 - from as i64;
        let Ok(delta) = i32::try_from(delta) else {
            logging::warn!("web navigation traversal of {delta} entries is out of range");
            return;
        };
        if let Err(err) = self.shared.env.go(delta) {
            logging::warn!("web navigation traversal failed: {err}");
        }
    }

    fn traversed(
        &self,
        traverse: impl FnOnce(&EntryHistory<S>) -> Result<NavigationHistoryEntry<S>, NavigationError>,
    ) -> Result<NavigationHistoryEntry<S>, NavigationError> {
        let from = self.shared.history.current_index();
        let entry = traverse(&self.shared.history)?;
        self.go(from, &entry);
        Ok(entry)
    }
}

impl<S, E> EntryNavigation<S> for WebNavigationProvider<S, E>
where
    S: Clone + Serialize + DeserializeOwned + 'static,
    E: HistoryEnvironment + 'static,
{
    fn can_go_back(&self) -> bool {
        self.shared.history.can_go_back()
    }

    fn can_go_forward(&self) -> bool {
        self.shared.history.can_go_forward()
    }

    fn current_entry(&self) -> Option<NavigationHistoryEntry<S>> {
        self.shared.history.current_entry()
    }

    fn entries(&self) -> Vec<NavigationHistoryEntry<S>> {
        self.shared.history.entries()
    }

    fn navigate(
        &self,
        url: &str,
        options: NavigateOptions<S>,
    ) -> Result<NavigationHistoryEntry<S>, NavigationError> {
        let replace = options.history == HistoryMode::Replace;
        let entry = self.shared.history.navigate_with_key(url, options, None)?;
        self.shared.mirror(&entry, replace);
        Ok(entry)
    }

    fn back(&self) -> Result<NavigationHistoryEntry<S>, NavigationError> {
        self.traversed(EntryHistory::back)
    }

    fn forward(&self) -> Result<NavigationHistoryEntry<S>, NavigationError> {
        self.traversed(EntryHistory::forward)
    }

    fn reload(&self, state: Option<S>) -> Result<NavigationHistoryEntry<S>, NavigationError> {
        let rewrite = state.is_some();
        let entry = self.shared.history.reload(state)?;
        if rewrite {
            self.shared.mirror(&entry, true);
        }
        Ok(entry)
    }

    fn traverse_to(&self, key: &str) -> Result<NavigationHistoryEntry<S>, NavigationError> {
        self.traversed(|history| history.traverse_to(key))
    }

    fn on(&self, kind: NavigationEventKind, listener: NavigationListener<S>) -> ListenerId {
        self.shared.history.listeners.add(kind, listener)
    }

    fn off(&self, id: ListenerId) {
        self.shared.history.listeners.remove(id);
    }

    fn destroy(&self) {
        WebNavigationProvider::destroy(self);
    }
}

impl<P, E> NavigationProvider<P> for WebNavigationProvider<NavigationState<P>, E>
where
    P: PaneParams,
    E: HistoryEnvironment + 'static,
{
    fn current_state(&self) -> Option<NavigationState<P>> {
        self.shared.history.current_entry()?.get_state()
    }

    fn push_state(&self, state: &NavigationState<P>) {
        navigate_state(self, &self.base_path, state, HistoryMode::Push);
    }

    fn replace_state(&self, state: &NavigationState<P>) {
        navigate_state(self, &self.base_path, state, HistoryMode::Replace);
    }

    fn destroy(&self) {
        WebNavigationProvider::destroy(self);
    }
}
