//! Provider delegating to the native Navigation API.
//!
//! The native API owns the history: entries, their stored state, and traversal. The provider
//! writes through [`NativeNavigation::navigate`], intercepts qualifying `navigate` events, and
//! rebuilds [`NavigationState`] from the native entry list instead of keeping its own log.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use leptos::logging;
use serde_json::Value;

use crate::{
    codec::{encode_query_url, state_from_query, state_from_value, state_to_value},
    entries::{random_key, HistoryMode, NavigationType},
    environment::{BrowserLocation, ListenerId},
    model::{NavigationRoute, NavigationState, PaneParams, StateChangeCallback},
    provider::NavigationProvider,
};

#[derive(Debug, Clone, PartialEq)]
/// One entry of the native history list.
pub struct NativeEntry {
    /// Entry key.
    pub key: String,
    /// Entry URL.
    pub url: String,
    /// Position in the native list.
    pub index: usize,
    /// State stored with the entry.
    pub state: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
/// Native `navigate` event, delivered before the navigation commits.
pub struct NativeNavigateEvent {
    /// Cause of the navigation.
    pub navigation_type: NavigationType,
    /// Destination URL.
    pub destination_url: String,
    /// State stored with the destination entry.
    pub destination_state: Option<Value>,
    /// Whether the destination shares the document's origin.
    pub same_origin: bool,
    /// Whether the event may be intercepted.
    pub can_intercept: bool,
    /// Whether only the fragment changes.
    pub hash_change: bool,
    /// Download file name, when the navigation is a download.
    pub download_request: Option<String>,
}

impl NativeNavigateEvent {
    /// Same-document, interceptable navigation to `url`.
    pub fn same_document(
        navigation_type: NavigationType,
        url: impl Into<String>,
        state: Option<Value>,
    ) -> Self {
        Self {
            navigation_type,
            destination_url: url.into(),
            destination_state: state,
            same_origin: true,
            can_intercept: true,
            hash_change: false,
            download_request: None,
        }
    }

    /// Returns whether the provider handles this event.
    pub fn qualifies(&self) -> bool {
        self.same_origin && self.can_intercept && !self.hash_change && self.download_request.is_none()
    }
}

/// `navigate` listener. Returning `true` intercepts the navigation.
pub type NavigateListener = Rc<dyn Fn(&NativeNavigateEvent) -> bool>;

/// Access to the native Navigation API.
pub trait NativeNavigation {
    /// Returns whether the API exists in this environment.
    fn is_available(&self) -> bool;

    /// Current entry, or `None` when unavailable.
    fn current_entry(&self) -> Option<NativeEntry>;

    /// Every entry in the native list.
    fn entries(&self) -> Vec<NativeEntry>;

    /// Starts a same-document navigation storing `state`.
    ///
    /// # Errors
    ///
    /// Returns an error when the API is unavailable or rejects the navigation.
    fn navigate(&self, url: &str, state: &Value, mode: HistoryMode) -> Result<(), String>;

    /// Registers a `navigate` listener. Returns `None` when the API is unavailable.
    fn add_navigate_listener(&self, listener: NavigateListener) -> Option<ListenerId>;

    /// Removes a listener registered with [`NativeNavigation::add_navigate_listener`].
    fn remove_navigate_listener(&self, id: ListenerId);
}

#[derive(Default)]
struct SimulatedNavigation {
    available: bool,
    entries: Vec<NativeEntry>,
    current: usize,
    listeners: Vec<(ListenerId, NavigateListener)>,
    next_listener_id: u64,
    intercepted: usize,
}

impl SimulatedNavigation {
    fn current_location(&self) -> BrowserLocation {
        self.entries
            .get(self.current)
            .map(|entry| BrowserLocation::parse(&entry.url))
            .unwrap_or_default()
    }

    fn commit(&mut self, event: &NativeNavigateEvent) {
        let mode = event.navigation_type;
        let state = event.destination_state.clone();
        let url = event.destination_url.clone();
        match mode {
            NavigationType::Replace | NavigationType::Reload => {
                if let Some(entry) = self.entries.get_mut(self.current) {
                    entry.url = url;
                    entry.state = state;
                }
            }
            NavigationType::Push => {
                self.entries.truncate(self.current + 1);
                self.current = self.entries.len();
                self.entries.push(NativeEntry {
                    key: random_key(),
                    url,
                    index: self.current,
                    state,
                });
            }
            // Traversal only moves the cursor.
            NavigationType::Traverse => {}
        }
    }
}

/// In-memory Navigation API simulation.
///
/// `navigate` events are dispatched synchronously before the entry list changes, as in the
/// browser. Clones share the same navigation object.
#[derive(Clone)]
pub struct MemoryNativeNavigation {
    inner: Rc<RefCell<SimulatedNavigation>>,
}

impl fmt::Debug for MemoryNativeNavigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let navigation = self.inner.borrow();
        f.debug_struct("MemoryNativeNavigation")
            .field("available", &navigation.available)
            .field("entries", &navigation.entries.len())
            .field("current", &navigation.current)
            .finish()
    }
}

impl MemoryNativeNavigation {
    /// Creates an available API whose single entry is `url`.
    pub fn new(url: &str) -> Self {
        let navigation = SimulatedNavigation {
            available: true,
            entries: vec![NativeEntry {
                key: random_key(),
                url: BrowserLocation::parse(url).href(),
                index: 0,
                state: None,
            }],
            ..SimulatedNavigation::default()
        };
        Self {
            inner: Rc::new(RefCell::new(navigation)),
        }
    }

    /// Creates an environment without the API.
    pub fn unavailable() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SimulatedNavigation::default())),
        }
    }

    /// Number of registered `navigate` listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.borrow().listeners.len()
    }

    /// Number of navigations a listener intercepted.
    pub fn intercepted_count(&self) -> usize {
        self.inner.borrow().intercepted
    }

    /// Index of the current entry.
    pub fn current_index(&self) -> usize {
        self.inner.borrow().current
    }

    /// Simulates user back/forward by `delta` entries. Returns `false` when out of range.
    pub fn traverse(&self, delta: i32) -> bool {
        let (target, event) = {
            let navigation = self.inner.borrow();
            if !navigation.available {
                return false;
            }
            let Some((target, entry)) = navigation
                .current
                .checked_add_signed(delta as isize)
                .filter(|target| *target != navigation.current)
                .and_then(|target| Some((target, navigation.entries.get(target)?)))
            else {
                return false;
            };
            let event = NativeNavigateEvent::same_document(
                NavigationType::Traverse,
                entry.url.clone(),
                entry.state.clone(),
            );
            (target, event)
        };
        self.dispatch_event(&event);
        self.inner.borrow_mut().current = target;
        true
    }

    /// Simulates the user following a same-document link to `url`.
    pub fn navigate_external(&self, url: &str) {
        let event = {
            let navigation = self.inner.borrow();
            let previous = navigation.current_location();
            let location = previous.resolve(url);
            let mut event =
                NativeNavigateEvent::same_document(NavigationType::Push, location.href(), None);
            event.hash_change = location.pathname == previous.pathname
                && location.search == previous.search
                && location.hash != previous.hash;
            event
        };
        self.dispatch_event(&event);
        self.inner.borrow_mut().commit(&event);
    }

    /// Delivers `event` to listeners without committing it. Returns whether it was intercepted.
    pub fn dispatch_event(&self, event: &NativeNavigateEvent) -> bool {
        let listeners: Vec<_> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        let mut intercepted = false;
        for listener in listeners {
            intercepted |= listener(event);
        }
        if intercepted {
            self.inner.borrow_mut().intercepted += 1;
        }
        intercepted
    }
}

impl NativeNavigation for MemoryNativeNavigation {
    fn is_available(&self) -> bool {
        self.inner.borrow().available
    }

    fn current_entry(&self) -> Option<NativeEntry> {
        let navigation = self.inner.borrow();
        if !navigation.available {
            return None;
        }
        navigation.entries.get(navigation.current).cloned()
    }

    fn entries(&self) -> Vec<NativeEntry> {
        self.inner.borrow().entries.clone()
    }

    fn navigate(&self, url: &str, state: &Value, mode: HistoryMode) -> Result<(), String> {
        let event = {
            let navigation = self.inner.borrow();
            if !navigation.available {
                return Err("navigation api is unavailable".to_string());
            }
            let navigation_type = match mode {
                HistoryMode::Replace => NavigationType::Replace,
                HistoryMode::Auto | HistoryMode::Push => NavigationType::Push,
            };
            let location = navigation.current_location().resolve(url);
            NativeNavigateEvent::same_document(navigation_type, location.href(), Some(state.clone()))
        };
        self.dispatch_event(&event);
        self.inner.borrow_mut().commit(&event);
        Ok(())
    }

    fn add_navigate_listener(&self, listener: NavigateListener) -> Option<ListenerId> {
        let mut navigation = self.inner.borrow_mut();
        if !navigation.available {
            return None;
        }
        navigation.next_listener_id += 1;
        let id = ListenerId(navigation.next_listener_id);
        navigation.listeners.push((id, listener));
        Some(id)
    }

    fn remove_navigate_listener(&self, id: ListenerId) {
        self.inner
            .borrow_mut()
            .listeners
            .retain(|(listener_id, _)| *listener_id != id);
    }
}

struct Shared<P, N> {
    native: N,
    base_path: String,
    on_change: StateChangeCallback<P>,
    // Set around programmatic navigation; consumed by the `navigate` handler.
    self_navigation: Cell<bool>,
}

impl<P: PaneParams, N: NativeNavigation> Shared<P, N> {
    fn reconstruct(&self, stored: Option<&Value>, url: &str) -> Option<NavigationState<P>> {
        let route = stored
            .and_then(state_from_value::<P>)
            .or_else(|| state_from_query::<P>(&BrowserLocation::parse(url).search))?
            .route;
        let mut history: Vec<NavigationRoute<P>> = self
            .native
            .entries()
            .iter()
            .filter_map(|entry| entry.state.as_ref().and_then(state_from_value::<P>))
            .map(|state| state.route)
            .collect();
        if !history.contains(&route) {
            history.push(route.clone());
        }
        Some(NavigationState { route, history })
    }

    fn handle_navigate(&self, event: &NativeNavigateEvent) -> bool {
        if !event.qualifies() {
            return false;
        }
        if self.self_navigation.replace(false) {
            return true;
        }
        // Only destinations carrying pane state are intercepted.
        self.reconstruct(event.destination_state.as_ref(), &event.destination_url)
            .map(|state| (self.on_change)(state))
            .is_some()
    }

    fn write(&self, op: &str, state: &NavigationState<P>, mode: HistoryMode) {
        let written = encode_query_url(&self.base_path, &state.route)
            .and_then(|url| Ok((url, state_to_value(state)?)))
            .map_err(|err| err.to_string())
            .and_then(|(url, value)| {
                self.self_navigation.set(true);
                let result = self.native.navigate(&url, &value, mode);
                self.self_navigation.set(false);
                result
            });
        if let Err(err) = written {
            logging::warn!("navigation api {op} failed: {err}");
        }
    }
}

/// Provider backed by the native Navigation API.
///
/// Programmatic writes never reach the change callback; user traversals and link navigations
/// do, with the history rebuilt from the native entry list.
pub struct NavigationApiProvider<P, N: NativeNavigation> {
    shared: Rc<Shared<P, N>>,
    listener: Cell<Option<ListenerId>>,
    destroyed: Cell<bool>,
}

impl<P, N: NativeNavigation> fmt::Debug for NavigationApiProvider<P, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NavigationApiProvider")
            .field("base_path", &self.shared.base_path)
            .field("available", &self.shared.native.is_available())
            .field("destroyed", &self.destroyed.get())
            .finish()
    }
}

impl<P: PaneParams, N: NativeNavigation + 'static> NavigationApiProvider<P, N> {
    /// Returns whether `native` exposes the Navigation API.
    pub fn is_supported(native: &N) -> bool {
        native.is_available()
    }

    /// Creates the provider and subscribes to `navigate`.
    ///
    /// `base_path` defaults to the current entry's pathname.
    pub fn new(native: N, base_path: Option<String>, on_change: StateChangeCallback<P>) -> Self {
        if !native.is_available() {
            logging::warn!("navigation api unavailable; navigation writes are no-ops");
        }
        let base_path = base_path
            .or_else(|| {
                native
                    .current_entry()
                    .map(|entry| BrowserLocation::parse(&entry.url).pathname)
            })
            .filter(|path| !path.is_empty())
            .unwrap_or_else(|| "/".to_string());
        let shared = Rc::new(Shared {
            native,
            base_path,
            on_change,
            self_navigation: Cell::new(false),
        });

        let weak = Rc::downgrade(&shared);
        let listener = shared
            .native
            .add_navigate_listener(Rc::new(move |event: &NativeNavigateEvent| {
                weak.upgrade()
                    .is_some_and(|shared| shared.handle_navigate(event))
            }));

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

    /// Borrows the native API handle.
    pub fn native(&self) -> &N {
        &self.shared.native
    }

    fn writable(&self, op: &str) -> bool {
        if self.destroyed.get() {
            logging::warn!("navigation api {op} ignored after destroy");
            return false;
        }
        if !self.shared.native.is_available() {
            logging::warn!("navigation api {op} ignored: api unavailable");
            return false;
        }
        true
    }
}

impl<P: PaneParams, N: NativeNavigation + 'static> NavigationProvider<P>
    for NavigationApiProvider<P, N>
{
    fn current_state(&self) -> Option<NavigationState<P>> {
        let entry = self.shared.native.current_entry()?;
        self.shared.reconstruct(entry.state.as_ref(), &entry.url)
    }

    fn push_state(&self, state: &NavigationState<P>) {
        if self.writable("push") {
            self.shared.write("push", state, HistoryMode::Push);
        }
    }

    fn replace_state(&self, state: &NavigationState<P>) {
        if self.writable("replace") {
            self.shared.write("replace", state, HistoryMode::Replace);
        }
    }

    fn destroy(&self) {
        if self.destroyed.replace(true) {
            return;
        }
        if let Some(id) = self.listener.take() {
            self.shared.native.remove_navigate_listener(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{fixtures::*, ActivePane};

    type Seen = Rc<RefCell<Vec<NavigationState<MailPanes>>>>;

    fn provider(
        native: &MemoryNativeNavigation,
    ) -> (NavigationApiProvider<MailPanes, MemoryNativeNavigation>, Seen) {
        let seen: Seen = Rc::default();
        let sink = seen.clone();
        let provider = NavigationApiProvider::new(
            native.clone(),
            None,
            Rc::new(move |state: NavigationState<MailPanes>| sink.borrow_mut().push(state)),
        );
        (provider, seen)
    }

    #[test]
    fn self_navigation_is_intercepted_but_not_reported() {
        let native = MemoryNativeNavigation::new("/mail");
        let (provider, seen) = provider(&native);
        let first = state(ActivePane::List, "inbox");

        provider.push_state(&first);
        provider.replace_state(&first.navigated(ActivePane::Detail, panes("inbox", Some("1"))));

        assert!(seen.borrow().is_empty());
        assert_eq!(native.intercepted_count(), 2);
        assert_eq!(native.entries().len(), 2);
        assert!(native
            .current_entry()
            .expect("entry")
            .url
            .starts_with("/mail?pane=detail&data="));
    }

    #[test]
    fn traversal_reports_state_with_native_history() {
        let native = MemoryNativeNavigation::new("/");
        let (provider, seen) = provider(&native);
        let first = state(ActivePane::List, "inbox");
        let second = first.navigated(ActivePane::Detail, panes("inbox", Some("7")));
        provider.replace_state(&first);
        provider.push_state(&second);

        assert!(provider.native().traverse(-1));

        assert_eq!(seen.borrow().len(), 1);
        let reported = &seen.borrow()[0];
        assert_eq!(reported.route, first.route);
        assert_eq!(reported.history, second.history);
        assert_eq!(native.current_index(), 0);
        assert!(!native.traverse(-1));
    }

    #[test]
    fn external_link_without_state_parses_url() {
        let native = MemoryNativeNavigation::new("/");
        let (_provider, seen) = provider(&native);
        let url = encode_query_url("/", &state(ActivePane::Tail, "x").route).expect("url");

        native.navigate_external(&url);

        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].route.active_pane, ActivePane::Tail);
        assert_eq!(seen.borrow()[0].history.len(), 1);
    }

    #[test]
    fn non_qualifying_events_are_left_alone() {
        let native = MemoryNativeNavigation::new("/");
        let (_provider, seen) = provider(&native);
        let url = encode_query_url("/", &state(ActivePane::Tail, "x").route).expect("url");
        let qualifying = NativeNavigateEvent::same_document(NavigationType::Push, url, None);

        let cross_origin = NativeNavigateEvent {
            same_origin: false,
            ..qualifying.clone()
        };
        let download = NativeNavigateEvent {
            download_request: Some("report.pdf".to_string()),
            ..qualifying.clone()
        };
        let fixed = NativeNavigateEvent {
            can_intercept: false,
            ..qualifying.clone()
        };
        for event in [cross_origin, download, fixed] {
            assert!(!native.dispatch_event(&event));
        }
        native.navigate_external("#section");

        assert!(seen.borrow().is_empty());
        assert_eq!(native.intercepted_count(), 0);
        assert!(native.dispatch_event(&qualifying));
        assert_eq!(seen.borrow().len(), 1);
    }

    #[test]
    fn destinations_without_pane_state_are_left_to_the_browser() {
        let native = MemoryNativeNavigation::new("/app");
        let (provider, seen) = provider(&native);

        native.navigate_external("/about");
        native.navigate_external("/other?pane=list");

        assert_eq!(native.intercepted_count(), 0);
        assert!(seen.borrow().is_empty());
        assert_eq!(provider.current_state(), None);
    }

    #[test]
    fn unavailable_api_degrades_to_noops() {
        let native = MemoryNativeNavigation::unavailable();
        assert!(!NavigationApiProvider::<MailPanes, _>::is_supported(&native));
        let (provider, seen) = provider(&native);

        provider.push_state(&state(ActivePane::List, "a"));
        provider.replace_state(&state(ActivePane::List, "a"));

        assert_eq!(provider.current_state(), None);
        assert_eq!(provider.base_path(), "/");
        assert!(seen.borrow().is_empty());
        assert!(native.entries().is_empty());
        provider.destroy();
    }

    #[test]
    fn destroy_unregisters_once() {
        let native = MemoryNativeNavigation::new("/");
        let (provider, seen) = provider(&native);
        assert_eq!(native.listener_count(), 1);

        provider.destroy();
        provider.destroy();
        assert_eq!(native.listener_count(), 0);

        provider.push_state(&state(ActivePane::List, "a"));
        native.navigate_external("/?pane=list&data=%7B%7D");
        assert!(seen.borrow().is_empty());
        assert_eq!(native.entries().len(), 2);
    }
}
