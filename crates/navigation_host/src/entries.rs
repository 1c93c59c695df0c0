//! Entry-list navigation contracts modeled on the native Navigation API.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::environment::ListenerId;

/// Returns a fresh random entry key.
pub fn random_key() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One entry of an entry-based navigation history.
pub struct NavigationHistoryEntry<S> {
    /// Unique id of this entry instance.
    pub id: String,
    /// Random key identifying the history slot.
    pub key: String,
    /// Entry URL.
    pub url: String,
    /// Position in the entry list.
    pub index: usize,
    /// State stored with the entry.
    pub state: Option<S>,
}

impl<S: Clone> NavigationHistoryEntry<S> {
    /// Creates an entry with a fresh id and, unless supplied, a fresh random key.
    pub fn new(url: impl Into<String>, index: usize, state: Option<S>, key: Option<String>) -> Self {
        Self {
            id: random_key(),
            key: key.unwrap_or_else(random_key),
            url: url.into(),
            index,
            state,
        }
    }

    /// Returns a copy of the stored state.
    pub fn get_state(&self) -> Option<S> {
        self.state.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// History handling requested by [`EntryNavigation::navigate`].
pub enum HistoryMode {
    /// Push unless the platform decides otherwise.
    #[default]
    Auto,
    /// Append a new entry, pruning forward entries.
    Push,
    /// Overwrite the current entry.
    Replace,
}

#[derive(Debug, Clone, PartialEq)]
/// Options for [`EntryNavigation::navigate`].
pub struct NavigateOptions<S> {
    /// State stored with the destination entry.
    pub state: Option<S>,
    /// Push/replace behavior.
    pub history: HistoryMode,
}

impl<S> Default for NavigateOptions<S> {
    fn default() -> Self {
        Self {
            state: None,
            history: HistoryMode::Auto,
        }
    }
}

impl<S> NavigateOptions<S> {
    /// Push options carrying `state`.
    pub fn push(state: S) -> Self {
        Self {
            state: Some(state),
            history: HistoryMode::Push,
        }
    }

    /// Replace options carrying `state`.
    pub fn replace(state: S) -> Self {
        Self {
            state: Some(state),
            history: HistoryMode::Replace,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Cause of a navigation.
pub enum NavigationType {
    /// New entry appended.
    Push,
    /// Current entry overwritten.
    Replace,
    /// Current entry reloaded.
    Reload,
    /// Moved to an existing entry.
    Traverse,
}

#[derive(Debug, Clone, PartialEq)]
/// Payload of [`NavigationEvent::CurrentEntryChange`].
pub struct CurrentEntryChange<S> {
    /// Cause of the change.
    pub navigation_type: NavigationType,
    /// Entry that was current before the change.
    pub from: Option<NavigationHistoryEntry<S>>,
    /// Entry that is current after the change.
    pub entry: NavigationHistoryEntry<S>,
}

#[derive(Debug, Clone, PartialEq)]
/// Events emitted by entry-based navigation.
pub enum NavigationEvent<S> {
    /// A navigation is about to be applied.
    Navigate {
        /// Cause of the navigation.
        navigation_type: NavigationType,
        /// Destination URL.
        destination_url: String,
    },
    /// The current entry changed.
    CurrentEntryChange(CurrentEntryChange<S>),
    /// The navigation object was destroyed.
    Dispose,
}

impl<S> NavigationEvent<S> {
    /// Kind used for subscription.
    pub fn kind(&self) -> NavigationEventKind {
        match self {
            Self::Navigate { .. } => NavigationEventKind::Navigate,
            Self::CurrentEntryChange(_) => NavigationEventKind::CurrentEntryChange,
            Self::Dispose => NavigationEventKind::Dispose,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Subscription keys for [`NavigationEvent`]s.
pub enum NavigationEventKind {
    /// `navigate`
    Navigate,
    /// `current-entry-change`
    CurrentEntryChange,
    /// `dispose`
    Dispose,
}

impl NavigationEventKind {
    /// Event name.
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::Navigate => "navigate",
            Self::CurrentEntryChange => "current-entry-change",
            Self::Dispose => "dispose",
        }
    }
}

/// Listener for [`NavigationEvent`]s.
pub type NavigationListener<S> = Rc<dyn Fn(&NavigationEvent<S>)>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
/// Entry navigation failures.
pub enum NavigationError {
    /// No entry before the current one.
    #[error("no entry to go back to")]
    NoBackEntry,
    /// No entry after the current one.
    #[error("no entry to go forward to")]
    NoForwardEntry,
    /// No entry has the requested key.
    #[error("no entry with key `{0}`")]
    UnknownKey(String),
    /// The navigation object was destroyed.
    #[error("navigation has been destroyed")]
    Destroyed,
}

/// Entry-list navigation capability.
pub trait EntryNavigation<S> {
    /// Returns whether an entry exists before the current one.
    fn can_go_back(&self) -> bool;
    /// Returns whether an entry exists after the current one.
    fn can_go_forward(&self) -> bool;
    /// The current entry, if any.
    fn current_entry(&self) -> Option<NavigationHistoryEntry<S>>;
    /// Every entry in order.
    fn entries(&self) -> Vec<NavigationHistoryEntry<S>>;
    /// Navigates to `url`, pushing or replacing per `options.history`.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::Destroyed`] after [`EntryNavigation::destroy`].
    fn navigate(
        &self,
        url: &str,
        options: NavigateOptions<S>,
    ) -> Result<NavigationHistoryEntry<S>, NavigationError>;
    /// Moves to the previous entry.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::NoBackEntry`] at the start of history.
    fn back(&self) -> Result<NavigationHistoryEntry<S>, NavigationError>;
    /// Moves to the next entry.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::NoForwardEntry`] at the end of history.
    fn forward(&self) -> Result<NavigationHistoryEntry<S>, NavigationError>;
    /// Re-announces the current entry, optionally replacing its state.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::Destroyed`] after [`EntryNavigation::destroy`].
    fn reload(&self, state: Option<S>) -> Result<NavigationHistoryEntry<S>, NavigationError>;
    /// Moves to the entry with `key`.
    ///
    /// # Errors
    ///
    /// Returns [`NavigationError::UnknownKey`] when no entry has `key`.
    fn traverse_to(&self, key: &str) -> Result<NavigationHistoryEntry<S>, NavigationError>;
    /// Subscribes `listener` to `kind`.
    fn on(&self, kind: NavigationEventKind, listener: NavigationListener<S>) -> ListenerId;
    /// Removes a subscription.
    fn off(&self, id: ListenerId);
    /// Emits [`NavigationEvent::Dispose`], drops listeners and entries. Repeat calls are no-ops.
    fn destroy(&self);
}

/// Listener registry shared by entry-based navigation implementations.
pub(crate) struct EventListeners<S> {
    listeners: RefCell<Vec<(ListenerId, NavigationEventKind, NavigationListener<S>)>>,
    next_id: Cell<u64>,
}

impl<S> Default for EventListeners<S> {
    fn default() -> Self {
        Self {
            listeners: RefCell::new(Vec::new()),
            next_id: Cell::new(0),
        }
    }
}

impl<S> fmt::Debug for EventListeners<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventListeners")
            .field("count", &self.listeners.borrow().len())
            .finish()
    }
}

impl<S> EventListeners<S> {
    pub(crate) fn add(&self, kind: NavigationEventKind, listener: NavigationListener<S>) -> ListenerId {
        let id = ListenerId(self.next_id.get() + 1);
        self.next_id.set(id.0);
        self.listeners.borrow_mut().push((id, kind, listener));
        id
    }

    pub(crate) fn remove(&self, id: ListenerId) {
        self.listeners
            .borrow_mut()
            .retain(|(listener_id, _, _)| *listener_id != id);
    }

    pub(crate) fn clear(&self) {
        self.listeners.borrow_mut().clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.listeners.borrow().len()
    }

    /// Calls matching listeners without holding the registry borrow, so listeners may
    /// subscribe or navigate reentrantly.
    pub(crate) fn emit(&self, event: &NavigationEvent<S>) {
        let kind = event.kind();
        let matching: Vec<_> = self
            .listeners
            .borrow()
            .iter()
            .filter(|(_, listener_kind, _)| *listener_kind == kind)
            .map(|(_, _, listener)| listener.clone())
            .collect();
        for listener in matching {
            listener(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_get_random_keys_unless_supplied() {
        let first = NavigationHistoryEntry::<()>::new("/", 0, None, None);
        let second = NavigationHistoryEntry::<()>::new("/", 1, None, None);
        let supplied = NavigationHistoryEntry::<()>::new("/", 2, None, Some("k".to_string()));
        assert_ne!(first.key, second.key);
        assert_ne!(first.id, first.key);
        assert_eq!(supplied.key, "k");
    }

    #[test]
    fn listeners_only_receive_their_kind() {
        let listeners = EventListeners::<()>::default();
        let hits = Rc::new(Cell::new(0));
        let counter = hits.clone();
        let id = listeners.add(
            NavigationEventKind::Dispose,
            Rc::new(move |_: &NavigationEvent<()>| counter.set(counter.get() + 1)),
        );

        listeners.emit(&NavigationEvent::Navigate {
            navigation_type: NavigationType::Push,
            destination_url: "/".to_string(),
        });
        listeners.emit(&NavigationEvent::Dispose);
        assert_eq!(hits.get(), 1);

        listeners.remove(id);
        listeners.emit(&NavigationEvent::Dispose);
        assert_eq!(hits.get(), 1);
        assert_eq!(listeners.len(), 0);
    }
}
