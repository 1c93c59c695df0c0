//! Ambient browsing-environment contracts (location, session history, history events).
//!
//! The window's location and history are shared global resources. Providers reach them only
//! through [`HistoryEnvironment`], so the same provider code runs against the browser adapter in
//! `navigation_host_web`, the [`MemoryHistoryEnvironment`] simulation, or
//! [`NoopHistoryEnvironment`] when no window exists.

use std::{cell::RefCell, fmt, rc::Rc};

use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Handle returned when registering an environment listener.
pub struct ListenerId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// History event kinds raised by the environment.
pub enum HistoryEventKind {
    /// Session history traversal (`popstate`).
    PopState,
    /// Fragment change (`hashchange`).
    HashChange,
}

impl HistoryEventKind {
    /// DOM event name.
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::PopState => "popstate",
            Self::HashChange => "hashchange",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
/// A history event delivered to environment listeners.
pub struct HistoryEvent {
    /// Event kind.
    pub kind: HistoryEventKind,
    /// State object carried by the event (`popstate` only), if any.
    pub state: Option<Value>,
}

/// Listener callback for [`HistoryEvent`]s.
pub type HistoryListener = Rc<dyn Fn(&HistoryEvent)>;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
/// Same-document location parts.
pub struct BrowserLocation {
    /// Path, starting with `/`.
    pub pathname: String,
    /// Query string including `?`, or empty.
    pub search: String,
    /// Fragment including `#`, or empty.
    pub hash: String,
}

impl BrowserLocation {
    /// Parses a path-absolute or absolute URL into location parts.
    pub fn parse(url: &str) -> Self {
        Self::default().resolve(url)
    }

    /// Resolves `url` against this location the way same-document history writes do.
    pub fn resolve(&self, url: &str) -> Self {
        if let Some(hash) = url.strip_prefix('#') {
            return Self {
                hash: non_empty_prefixed('#', hash),
                ..self.clone()
            };
        }
        if url.starts_with('?') {
            let (search, hash) = split_hash(url);
            return Self {
                pathname: self.pathname.clone(),
                search: non_empty_prefixed('?', search.trim_start_matches('?')),
                hash,
            };
        }

        let path = match url.find("://") {
            Some(scheme_end) => {
                let rest = &url[scheme_end + 3..];
                rest.find(['/', '?', '#']).map_or("/", |start| &rest[start..])
            }
            None => url,
        };
        let (before_hash, hash) = split_hash(path);
        let (pathname, search) = match before_hash.split_once('?') {
            Some((pathname, search)) => (pathname, non_empty_prefixed('?', search)),
            None => (before_hash, String::new()),
        };
        let pathname = if pathname.is_empty() {
            self.pathname_or_root()
        } else {
            pathname.to_string()
        };
        Self {
            pathname,
            search,
            hash,
        }
    }

    /// Returns `pathname + search + hash`.
    pub fn href(&self) -> String {
        format!("{}{}{}", self.pathname_or_root(), self.search, self.hash)
    }

    fn pathname_or_root(&self) -> String {
        if self.pathname.is_empty() {
            "/".to_string()
        } else {
            self.pathname.clone()
        }
    }
}

fn split_hash(url: &str) -> (&str, String) {
    match url.split_once('#') {
        Some((before, hash)) => (before, non_empty_prefixed('#', hash)),
        None => (url, String::new()),
    }
}

fn non_empty_prefixed(prefix: char, value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!("{prefix}{value}")
    }
}

/// Window location and session-history access used by URL-backed providers.
pub trait HistoryEnvironment {
    /// Current location, or `None` when no window exists.
    fn location(&self) -> Option<BrowserLocation>;

    /// State object attached to the current session-history entry.
    fn history_state(&self) -> Option<Value>;

    /// Appends a session-history entry (`history.pushState`). Raises no event.
    ///
    /// # Errors
    ///
    /// Returns an error when history is unavailable or the write is rejected.
    fn push_url(&self, state: Option<&Value>, url: &str) -> Result<(), String>;

    /// Replaces the current session-history entry (`history.replaceState`). Raises no event.
    ///
    /// # Errors
    ///
    /// Returns an error when history is unavailable or the write is rejected.
    fn replace_url(&self, state: Option<&Value>, url: &str) -> Result<(), String>;

    /// Assigns `location.hash`. A hash change is raised later, not during this call.
    ///
    /// # Errors
    ///
    /// Returns an error when the location is unavailable.
    fn assign_hash(&self, hash: &str) -> Result<(), String>;

    /// Traverses session history by `delta` entries.
    ///
    /// # Errors
    ///
    /// Returns an error when history is unavailable.
    fn go(&self, delta: i32) -> Result<(), String>;

    /// Registers `listener` for `kind`. Returns `None` when no window exists.
    fn add_listener(&self, kind: HistoryEventKind, listener: HistoryListener)
        -> Option<ListenerId>;

    /// Unregisters a listener previously returned by [`HistoryEnvironment::add_listener`].
    fn remove_listener(&self, id: ListenerId);
}

fn unavailable() -> String {
    "window history is unavailable in this environment".to_string()
}

#[derive(Debug, Clone, Copy, Default)]
/// Environment without a window (server rendering, native tests).
pub struct NoopHistoryEnvironment;

impl HistoryEnvironment for NoopHistoryEnvironment {
    fn location(&self) -> Option<BrowserLocation> {
        None
    }

    fn history_state(&self) -> Option<Value> {
        None
    }

    fn push_url(&self, _state: Option<&Value>, _url: &str) -> Result<(), String> {
        Err(unavailable())
    }

    fn replace_url(&self, _state: Option<&Value>, _url: &str) -> Result<(), String> {
        Err(unavailable())
    }

    fn assign_hash(&self, _hash: &str) -> Result<(), String> {
        Err(unavailable())
    }

    fn go(&self, _delta: i32) -> Result<(), String> {
        Err(unavailable())
    }

    fn add_listener(
        &self,
        _kind: HistoryEventKind,
        _listener: HistoryListener,
    ) -> Option<ListenerId> {
        None
    }

    fn remove_listener(&self, _id: ListenerId) {}
}

#[derive(Debug, Clone)]
struct SimulatedEntry {
    location: BrowserLocation,
    state: Option<Value>,
}

#[derive(Default)]
struct SimulatedWindow {
    entries: Vec<SimulatedEntry>,
    current: usize,
    listeners: Vec<(ListenerId, HistoryEventKind, HistoryListener)>,
    next_listener_id: u64,
    pending: Vec<HistoryEvent>,
}

impl SimulatedWindow {
    fn current_entry(&self) -> &SimulatedEntry {
        &self.entries[self.current]
    }

    fn append(&mut self, entry: SimulatedEntry) {
        self.entries.truncate(self.current + 1);
        self.entries.push(entry);
        self.current = self.entries.len() - 1;
    }

    fn listeners_for(&self, kind: HistoryEventKind) -> Vec<HistoryListener> {
        self.listeners
            .iter()
            .filter(|(_, listener_kind, _)| *listener_kind == kind)
            .map(|(_, _, listener)| listener.clone())
            .collect()
    }
}

/// In-memory window simulation.
///
/// Programmatic writes raise no events, matching the browser. User actions
/// ([`back`](Self::back), [`forward`](Self::forward), [`navigate_external`](Self::navigate_external))
/// dispatch `popstate` and, when the fragment changes, `hashchange` synchronously. Hash
/// assignment queues its events until [`flush_events`](Self::flush_events). Clones share the
/// same window.
#[derive(Clone)]
pub struct MemoryHistoryEnvironment {
    inner: Rc<RefCell<SimulatedWindow>>,
}

impl fmt::Debug for MemoryHistoryEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let window = self.inner.borrow();
        f.debug_struct("MemoryHistoryEnvironment")
            .field("href", &window.current_entry().location.href())
            .field("entries", &window.entries.len())
            .field("current", &window.current)
            .field("listeners", &window.listeners.len())
            .finish()
    }
}

impl Default for MemoryHistoryEnvironment {
    fn default() -> Self {
        Self::new("/")
    }
}

impl MemoryHistoryEnvironment {
    /// Creates a window whose single history entry is at `url`.
    pub fn new(url: &str) -> Self {
        let window = SimulatedWindow {
            entries: vec![SimulatedEntry {
                location: BrowserLocation::parse(url),
                state: None,
            }],
            ..SimulatedWindow::default()
        };
        Self {
            inner: Rc::new(RefCell::new(window)),
        }
    }

    /// Current `pathname + search + hash`.
    pub fn href(&self) -> String {
        self.inner.borrow().current_entry().location.href()
    }

    /// Number of session-history entries.
    pub fn history_len(&self) -> usize {
        self.inner.borrow().entries.len()
    }

    /// Index of the current session-history entry.
    pub fn history_index(&self) -> usize {
        self.inner.borrow().current
    }

    /// Number of registered listeners of `kind`.
    pub fn listener_count(&self, kind: HistoryEventKind) -> usize {
        self.inner.borrow().listeners_for(kind).len()
    }

    /// Simulates the user pressing back. Returns `false` at the start of history.
    pub fn back(&self) -> bool {
        self.traverse(-1)
    }

    /// Simulates the user pressing forward. Returns `false` at the end of history.
    pub fn forward(&self) -> bool {
        self.traverse(1)
    }

    /// Moves `delta` entries and dispatches the resulting events synchronously.
    pub fn traverse(&self, delta: i32) -> bool {
        let events = {
            let mut window = self.inner.borrow_mut();
            let Some(target) = window
                .current
                .checked_add_signed(delta as isize)
                .filter(|target| *target < window.entries.len())
            else {
                return false;
            };
            if target == window.current {
                return false;
            }
            let previous_hash = window.current_entry().location.hash.clone();
            window.current = target;
            let entry = window.current_entry();
            Self::transition_events(entry.state.clone(), previous_hash != entry.location.hash)
        };
        self.dispatch(events);
        true
    }

    /// Simulates the user entering a same-document URL (for example editing the hash).
    pub fn navigate_external(&self, url: &str) {
        let events = {
            let mut window = self.inner.borrow_mut();
            let previous = window.current_entry().location.clone();
            let location = previous.resolve(url);
            let hash_changed = location.hash != previous.hash;
            window.append(SimulatedEntry {
                location,
                state: None,
            });
            Self::transition_events(None, hash_changed)
        };
        self.dispatch(events);
    }

    /// Dispatches events queued by hash assignment. Returns how many were dispatched.
    pub fn flush_events(&self) -> usize {
        let events = std::mem::take(&mut self.inner.borrow_mut().pending);
        let count = events.len();
        self.dispatch(events);
        count
    }

    fn transition_events(state: Option<Value>, hash_changed: bool) -> Vec<HistoryEvent> {
        let mut events = vec![HistoryEvent {
            kind: HistoryEventKind::PopState,
            state,
        }];
        if hash_changed {
            events.push(HistoryEvent {
                kind: HistoryEventKind::HashChange,
                state: None,
            });
        }
        events
    }

    fn dispatch(&self, events: Vec<HistoryEvent>) {
        for event in events {
            let listeners = self.inner.borrow().listeners_for(event.kind);
            for listener in listeners {
                listener(&event);
            }
        }
    }
}

impl HistoryEnvironment for MemoryHistoryEnvironment {
    fn location(&self) -> Option<BrowserLocation> {
        Some(self.inner.borrow().current_entry().location.clone())
    }

    fn history_state(&self) -> Option<Value> {
        self.inner.borrow().current_entry().state.clone()
    }

    fn push_url(&self, state: Option<&Value>, url: &str) -> Result<(), String> {
        let mut window = self.inner.borrow_mut();
        let location = window.current_entry().location.resolve(url);
        window.append(SimulatedEntry {
            location,
            state: state.cloned(),
        });
        Ok(())
    }

    fn replace_url(&self, state: Option<&Value>, url: &str) -> Result<(), String> {
        let mut window = self.inner.borrow_mut();
        let current = window.current;
        let location = window.current_entry().location.resolve(url);
        window.entries[current] = SimulatedEntry {
            location,
            state: state.cloned(),
        };
        Ok(())
    }

    fn assign_hash(&self, hash: &str) -> Result<(), String> {
        let mut window = self.inner.borrow_mut();
        let hash = if hash.starts_with('#') {
            hash.to_string()
        } else {
            format!("#{hash}")
        };
        let location = window.current_entry().location.resolve(&hash);
        if location.hash == window.current_entry().location.hash {
            return Ok(());
        }
        window.append(SimulatedEntry {
            location,
            state: None,
        });
        let events = Self::transition_events(None, true);
        window.pending.extend(events);
        Ok(())
    }

    fn go(&self, delta: i32) -> Result<(), String> {
        self.traverse(delta);
        Ok(())
    }

    fn add_listener(
        &self,
        kind: HistoryEventKind,
        listener: HistoryListener,
    ) -> Option<ListenerId> {
        let mut window = self.inner.borrow_mut();
        window.next_listener_id += 1;
        let id = ListenerId(window.next_listener_id);
        window.listeners.push((id, kind, listener));
        Some(id)
    }

    fn remove_listener(&self, id: ListenerId) {
        self.inner
            .borrow_mut()
            .listeners
            .retain(|(listener_id, _, _)| *listener_id != id);
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn resolves_relative_urls_like_history_writes() {
        let base = BrowserLocation::parse("https://example.test/app?x=1#top");
        assert_eq!(base.href(), "/app?x=1#top");
        assert_eq!(base.resolve("#/list?data=1").href(), "/app?x=1#/list?data=1");
        assert_eq!(base.resolve("?pane=list").href(), "/app?pane=list");
        assert_eq!(base.resolve("/other").href(), "/other");
        assert_eq!(BrowserLocation::parse("https://example.test").href(), "/");
    }

    #[test]
    fn programmatic_writes_raise_no_events() {
        let env = MemoryHistoryEnvironment::new("/");
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        env.add_listener(
            HistoryEventKind::PopState,
            Rc::new(move |_: &HistoryEvent| counter.set(counter.get() + 1)),
        );

        env.push_url(Some(&json!({"a": 1})), "/next").expect("push");
        env.replace_url(None, "/replaced").expect("replace");
        assert_eq!(fired.get(), 0);
        assert_eq!(env.href(), "/replaced");
        assert_eq!(env.history_len(), 2);
    }

    #[test]
    fn back_dispatches_popstate_with_entry_state() {
        let env = MemoryHistoryEnvironment::new("/");
        env.replace_url(Some(&json!("first")), "/").expect("replace");
        env.push_url(Some(&json!("second")), "/two").expect("push");

        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        env.add_listener(
            HistoryEventKind::PopState,
            Rc::new(move |event: &HistoryEvent| sink.borrow_mut().push(event.state.clone())),
        );

        assert!(env.back());
        assert!(!env.back());
        assert_eq!(*seen.borrow(), vec![Some(json!("first"))]);
        assert_eq!(env.href(), "/");
    }

    #[test]
    fn hash_assignment_defers_hashchange_until_flush() {
        let env = MemoryHistoryEnvironment::new("/");
        let fired = Rc::new(Cell::new(0));
        let counter = fired.clone();
        let id = env
            .add_listener(
                HistoryEventKind::HashChange,
                Rc::new(move |_: &HistoryEvent| counter.set(counter.get() + 1)),
            )
            .expect("listener");

        env.assign_hash("#/list").expect("assign");
        env.assign_hash("#/list").expect("same hash is a no-op");
        assert_eq!(fired.get(), 0);
        assert_eq!(env.flush_events(), 2);
        assert_eq!(fired.get(), 1);

        env.remove_listener(id);
        assert_eq!(env.listener_count(HistoryEventKind::HashChange), 0);
    }

    #[test]
    fn noop_environment_reports_unavailable() {
        let env = NoopHistoryEnvironment;
        assert_eq!(env.location(), None);
        assert!(env.push_url(None, "/").is_err());
        assert!(env
            .add_listener(HistoryEventKind::PopState, Rc::new(|_: &HistoryEvent| {}))
            .is_none());
    }
}
