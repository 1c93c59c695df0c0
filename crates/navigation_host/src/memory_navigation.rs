//! In-memory entry-list navigation.

use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::Rc,
};

use leptos::logging;

use crate::{
    codec::encode_query_url,
    entries::{
        CurrentEntryChange, EntryNavigation, EventListeners, HistoryMode, NavigateOptions,
        NavigationError, NavigationEvent, NavigationEventKind, NavigationHistoryEntry,
        NavigationListener, NavigationType,
    },
    environment::{BrowserLocation, ListenerId},
    model::{NavigationState, PaneParams, StateChangeCallback},
    provider::NavigationProvider,
};

/// Entry list, cursor, and listeners shared by the memory and web entry navigations.
pub(crate) struct EntryHistory<S> {
    entries: RefCell<Vec<NavigationHistoryEntry<S>>>,
    current: Cell<Option<usize>>,
    pub(crate) listeners: EventListeners<S>,
    destroyed: Cell<bool>,
}

impl<S> fmt::Debug for EntryHistory<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryHistory")
            .field("len", &self.entries.borrow().len())
            .field("current", &self.current.get())
            .field("destroyed", &self.destroyed.get())
            .finish()
    }
}

impl<S: Clone> EntryHistory<S> {
    pub(crate) fn new(initial: NavigationHistoryEntry<S>) -> Self {
        Self {
            entries: RefCell::new(vec![NavigationHistoryEntry {
                index: 0,
                ..initial
            }]),
            current: Cell::new(Some(0)),
            listeners: EventListeners::default(),
            destroyed: Cell::new(false),
        }
    }

    pub(crate) fn current_index(&self) -> Option<usize> {
        self.current.get()
    }

    pub(crate) fn current_entry(&self) -> Option<NavigationHistoryEntry<S>> {
        let index = self.current.get()?;
        self.entries.borrow().get(index).cloned()
    }

    pub(crate) fn entries(&self) -> Vec<NavigationHistoryEntry<S>> {
        self.entries.borrow().clone()
    }

    pub(crate) fn index_of_key(&self, key: &str) -> Option<usize> {
        self.entries.borrow().iter().position(|entry| entry.key == key)
    }

    pub(crate) fn can_go_back(&self) -> bool {
        self.current.get().is_some_and(|index| index > 0)
    }

    pub(crate) fn can_go_forward(&self) -> bool {
        self.current
            .get()
            .is_some_and(|index| index + 1 < self.entries.borrow().len())
    }

    fn ensure_live(&self) -> Result<(), NavigationError> {
        if self.destroyed.get() {
            Err(NavigationError::Destroyed)
        } else {
            Ok(())
        }
    }

    fn announce(&self, navigation_type: NavigationType, destination_url: &str) {
        self.listeners.emit(&NavigationEvent::Navigate {
            navigation_type,
            destination_url: destination_url.to_string(),
        });
    }

    fn commit(
        &self,
        navigation_type: NavigationType,
        from: Option<NavigationHistoryEntry<S>>,
        entry: NavigationHistoryEntry<S>,
    ) -> NavigationHistoryEntry<S> {
        self.listeners
            .emit(&NavigationEvent::CurrentEntryChange(CurrentEntryChange {
                navigation_type,
                from,
                entry: entry.clone(),
            }));
        entry
    }

    /// Pushes or replaces an entry. `key` reuses a known key instead of a random one.
    pub(crate) fn navigate_with_key(
        &self,
        url: &str,
        options: NavigateOptions<S>,
        key: Option<String>,
    ) -> Result<NavigationHistoryEntry<S>, NavigationError> {
        self.ensure_live()?;
        let navigation_type = match options.history {
            HistoryMode::Replace => NavigationType::Replace,
            HistoryMode::Auto | HistoryMode::Push => NavigationType::Push,
        };
        self.announce(navigation_type, url);

        let from = self.current_entry();
        let entry = {
            let mut entries = self.entries.borrow_mut();
            match (navigation_type, self.current.get()) {
                (NavigationType::Replace, Some(index)) => {
                    let replaced_key = entries[index].key.clone();
                    let entry = NavigationHistoryEntry::new(
                        url,
                        index,
                        options.state,
                        key.or(Some(replaced_key)),
                    );
                    entries[index] = entry.clone();
                    entry
                }
                (_, current) => {
                    entries.truncate(current.map_or(0, |index| index + 1));
                    let entry =
                        NavigationHistoryEntry::new(url, entries.len(), options.state, key);
                    entries.push(entry.clone());
                    self.current.set(Some(entry.index));
                    entry
                }
            }
        };
        Ok(self.commit(navigation_type, from, entry))
    }

    pub(crate) fn traverse_to_index(
        &self,
        index: usize,
    ) -> Result<NavigationHistoryEntry<S>, NavigationError> {
        self.ensure_live()?;
        let entry = self
            .entries
            .borrow()
            .get(index)
            .cloned()
            .ok_or_else(|| NavigationError::UnknownKey(format!("#{index}")))?;
        self.announce(NavigationType::Traverse, &entry.url);
        let from = self.current_entry();
        self.current.set(Some(index));
        Ok(self.commit(NavigationType::Traverse, from, entry))
    }

    pub(crate) fn back(&self) -> Result<NavigationHistoryEntry<S>, NavigationError> {
        self.ensure_live()?;
        match self.current.get() {
            Some(index) if index > 0 => self.traverse_to_index(index - 1),
            _ => Err(NavigationError::NoBackEntry),
        }
    }

    pub(crate) fn forward(&self) -> Result<NavigationHistoryEntry<S>, NavigationError> {
        self.ensure_live()?;
        if !self.can_go_forward() {
            return Err(NavigationError::NoForwardEntry);
        }
        let index = self.current.get().map_or(0, |index| index + 1);
        self.traverse_to_index(index)
    }

    pub(crate) fn traverse_to(&self, key: &str) -> Result<NavigationHistoryEntry<S>, NavigationError> {
        self.ensure_live()?;
        let index = self
            .index_of_key(key)
            .ok_or_else(|| NavigationError::UnknownKey(key.to_string()))?;
        self.traverse_to_index(index)
    }

    pub(crate) fn reload(&self, state: Option<S>) -> Result<NavigationHistoryEntry<S>, NavigationError> {
        self.ensure_live()?;
        let from = self.current_entry().ok_or(NavigationError::Destroyed)?;
        self.announce(NavigationType::Reload, &from.url);
        let entry = match state {
            Some(state) => {
                let mut entries = self.entries.borrow_mut();
                let entry = &mut entries[from.index];
                entry.state = Some(state);
                entry.clone()
            }
            None => from.clone(),
        };
        Ok(self.commit(NavigationType::Reload, Some(from), entry))
    }

    /// Returns `false` when already destroyed.
    pub(crate) fn destroy(&self) -> bool {
        if self.destroyed.replace(true) {
            return false;
        }
        self.listeners.emit(&NavigationEvent::Dispose);
        self.listeners.clear();
        self.entries.borrow_mut().clear();
        self.current.set(None);
        true
    }
}

/// Entry-list navigation held entirely in memory.
///
/// With `S = NavigationState<P>` it also acts as a [`NavigationProvider`], writing query-encoded
/// entry URLs under the initial entry's path.
pub struct MemoryNavigationProvider<S> {
    history: EntryHistory<S>,
    base_path: String,
}

impl<S> fmt::Debug for MemoryNavigationProvider<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryNavigationProvider")
            .field("history", &self.history)
            .field("base_path", &self.base_path)
            .finish()
    }
}

impl<S: Clone> MemoryNavigationProvider<S> {
    /// Creates a navigation whose only entry is `url` with `state`.
    pub fn new(url: &str, state: Option<S>) -> Self {
        let pathname = BrowserLocation::parse(url).pathname;
        Self {
            history: EntryHistory::new(NavigationHistoryEntry::new(url, 0, state, None)),
            base_path: if pathname.is_empty() {
                "/".to_string()
            } else {
                pathname
            },
        }
    }

    /// Emits `dispose`, drops listeners and entries. Repeat calls are no-ops.
    pub fn destroy(&self) {
        self.history.destroy();
    }

    /// Number of subscribed listeners.
    pub fn listener_count(&self) -> usize {
        self.history.listeners.len()
    }
}

impl<S: Clone> EntryNavigation<S> for MemoryNavigationProvider<S> {
    fn can_go_back(&self) -> bool {
        self.history.can_go_back()
    }

    fn can_go_forward(&self) -> bool {
        self.history.can_go_forward()
    }

    fn current_entry(&self) -> Option<NavigationHistoryEntry<S>> {
        self.history.current_entry()
    }

    fn entries(&self) -> Vec<NavigationHistoryEntry<S>> {
        self.history.entries()
    }

    fn navigate(
        &self,
        url: &str,
        options: NavigateOptions<S>,
    ) -> Result<NavigationHistoryEntry<S>, NavigationError> {
        self.history.navigate_with_key(url, options, None)
    }

    fn back(&self) -> Result<NavigationHistoryEntry<S>, NavigationError> {
        self.history.back()
    }

    fn forward(&self) -> Result<NavigationHistoryEntry<S>, NavigationError> {
        self.history.forward()
    }

    fn reload(&self, state: Option<S>) -> Result<NavigationHistoryEntry<S>, NavigationError> {
        self.history.reload(state)
    }

    fn traverse_to(&self, key: &str) -> Result<NavigationHistoryEntry<S>, NavigationError> {
        self.history.traverse_to(key)
    }

    fn on(&self, kind: NavigationEventKind, listener: NavigationListener<S>) -> ListenerId {
        self.history.listeners.add(kind, listener)
    }

    fn off(&self, id: ListenerId) {
        self.history.listeners.remove(id);
    }

    fn destroy(&self) {
        self.history.destroy();
    }
}

/// Writes `state` into an entry navigation as a query-encoded URL.
pub(crate) fn navigate_state<P: PaneParams>(
    navigation: &impl EntryNavigation<NavigationState<P>>,
    base_path: &str,
    state: &NavigationState<P>,
    mode: HistoryMode,
) {
    let url = match encode_query_url(base_path, &state.route) {
        Ok(url) => url,
        Err(err) => {
            logging::warn!("entry navigation url encoding failed: {err}");
            return;
        }
    };
    let options = NavigateOptions {
        state: Some(state.clone()),
        history: mode,
    };
    if let Err(err) = navigation.navigate(&url, options) {
        logging::warn!("entry navigation write failed: {err}");
    }
}

impl<P: PaneParams> NavigationProvider<P> for MemoryNavigationProvider<NavigationState<P>> {
    fn current_state(&self) -> Option<NavigationState<P>> {
        self.history.current_entry()?.get_state()
    }

    fn push_state(&self, state: &NavigationState<P>) {
        navigate_state(self, &self.base_path, state, HistoryMode::Push);
    }

    fn replace_state(&self, state: &NavigationState<P>) {
        navigate_state(self, &self.base_path, state, HistoryMode::Replace);
    }

    fn destroy(&self) {
        self.history.destroy();
    }
}

/// Forwards entry changes not caused by `push`/`replace` (traversals and reloads) to
/// `on_change`, giving an entry navigation the change-callback contract of the router providers.
pub fn forward_entry_changes<P: PaneParams>(
    navigation: &impl EntryNavigation<NavigationState<P>>,
    on_change: StateChangeCallback<P>,
) -> ListenerId {
    navigation.on(
        NavigationEventKind::CurrentEntryChange,
        Rc::new(move |event: &NavigationEvent<NavigationState<P>>| {
            let NavigationEvent::CurrentEntryChange(change) = event else {
                return;
            };
            if matches!(
                change.navigation_type,
                NavigationType::Traverse | NavigationType::Reload
            ) {
                if let Some(state) = change.entry.get_state() {
                    on_change(state);
                }
            }
        }),
    )
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{fixtures::*, ActivePane};

    fn record(
        navigation: &MemoryNavigationProvider<String>,
    ) -> Rc<RefCell<Vec<(NavigationType, Option<String>, String)>>> {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        navigation.on(
            NavigationEventKind::CurrentEntryChange,
            Rc::new(move |event: &NavigationEvent<String>| {
                if let NavigationEvent::CurrentEntryChange(change) = event {
                    sink.borrow_mut().push((
                        change.navigation_type,
                        change.from.as_ref().map(|from| from.url.clone()),
                        change.entry.url.clone(),
                    ));
                }
            }),
        );
        seen
    }

    #[test]
    fn push_tags_events_and_prunes_forward_entries() {
        let navigation = MemoryNavigationProvider::new("/a", Some("a".to_string()));
        let seen = record(&navigation);

        navigation
            .navigate("/b", NavigateOptions::push("b".to_string()))
            .expect("push b");
        navigation
            .navigate("/c", NavigateOptions::default())
            .expect("auto c");
        navigation.back().expect("back");
        navigation.back().expect("back");
        assert!(navigation.can_go_forward());

        let d = navigation
            .navigate("/d", NavigateOptions::push("d".to_string()))
            .expect("push d");
        assert_eq!(d.index, 1);
        assert_eq!(
            navigation
                .entries()
                .iter()
                .map(|entry| entry.url.as_str())
                .collect::<Vec<_>>(),
            vec!["/a", "/d"]
        );
        assert!(!navigation.can_go_forward());
        assert_eq!(
            seen.borrow()[0],
            (NavigationType::Push, Some("/a".to_string()), "/b".to_string())
        );
        assert_eq!(seen.borrow()[2].0, NavigationType::Traverse);
        assert_eq!(seen.borrow().len(), 5);
    }

    #[test]
    fn replace_overwrites_in_place_and_keeps_key() {
        let navigation = MemoryNavigationProvider::new("/a", None::<String>);
        let original = navigation.current_entry().expect("entry");
        let seen = record(&navigation);

        let replaced = navigation
            .navigate("/b", NavigateOptions::replace("b".to_string()))
            .expect("replace");

        assert_eq!(replaced.index, 0);
        assert_eq!(replaced.key, original.key);
        assert_ne!(replaced.id, original.id);
        assert_eq!(navigation.entries().len(), 1);
        assert_eq!(seen.borrow()[0].0, NavigationType::Replace);
        assert!(!navigation.can_go_back());
    }

    #[test]
    fn reload_and_traverse_to_are_tagged() {
        let navigation = MemoryNavigationProvider::new("/a", Some("a".to_string()));
        let first_key = navigation.current_entry().expect("entry").key;
        navigation
            .navigate("/b", NavigateOptions::push("b".to_string()))
            .expect("push");
        let seen = record(&navigation);

        let reloaded = navigation.reload(Some("b2".to_string())).expect("reload");
        assert_eq!(reloaded.get_state().as_deref(), Some("b2"));
        let traversed = navigation.traverse_to(&first_key).expect("traverse");
        assert_eq!(traversed.url, "/a");
        assert_eq!(
            navigation.traverse_to("missing"),
            Err(NavigationError::UnknownKey("missing".to_string()))
        );

        let types: Vec<_> = seen.borrow().iter().map(|(kind, _, _)| *kind).collect();
        assert_eq!(types, vec![NavigationType::Reload, NavigationType::Traverse]);
    }

    #[test]
    fn navigate_event_precedes_entry_change() {
        let navigation = MemoryNavigationProvider::new("/", None::<String>);
        let order = Rc::new(RefCell::new(Vec::new()));
        for kind in [
            NavigationEventKind::Navigate,
            NavigationEventKind::CurrentEntryChange,
        ] {
            let sink = order.clone();
            navigation.on(
                kind,
                Rc::new(move |event: &NavigationEvent<String>| {
                    sink.borrow_mut().push(event.kind().event_name())
                }),
            );
        }
        navigation
            .navigate("/x", NavigateOptions::default())
            .expect("navigate");
        assert_eq!(*order.borrow(), vec!["navigate", "current-entry-change"]);
    }

    #[test]
    fn bounds_are_reported_as_errors() {
        let navigation = MemoryNavigationProvider::new("/", None::<String>);
        assert_eq!(navigation.back(), Err(NavigationError::NoBackEntry));
        assert_eq!(navigation.forward(), Err(NavigationError::NoForwardEntry));
    }

    #[test]
    fn destroy_emits_dispose_once_and_clears() {
        let navigation = MemoryNavigationProvider::new("/", None::<String>);
        let disposed = Rc::new(Cell::new(0));
        let counter = disposed.clone();
        navigation.on(
            NavigationEventKind::Dispose,
            Rc::new(move |_: &NavigationEvent<String>| counter.set(counter.get() + 1)),
        );

        navigation.destroy();
        navigation.destroy();

        assert_eq!(disposed.get(), 1);
        assert_eq!(navigation.listener_count(), 0);
        assert!(navigation.entries().is_empty());
        assert_eq!(navigation.current_entry(), None);
        assert_eq!(
            navigation.navigate("/x", NavigateOptions::default()),
            Err(NavigationError::Destroyed)
        );
    }

    #[test]
    fn acts_as_navigation_provider_for_pane_state() {
        let initial = state(ActivePane::List, "inbox");
        let navigation = MemoryNavigationProvider::new("/mail", Some(initial.clone()));
        let seen: Rc<RefCell<Vec<NavigationState<MailPanes>>>> = Rc::default();
        let sink = seen.clone();
        forward_entry_changes(
            &navigation,
            Rc::new(move |state: NavigationState<MailPanes>| sink.borrow_mut().push(state)),
        );

        let next = initial.navigated(ActivePane::Detail, panes("inbox", Some("5")));
        NavigationProvider::push_state(&navigation, &next);
        assert_eq!(navigation.current_state(), Some(next.clone()));
        assert!(navigation
            .current_entry()
            .expect("entry")
            .url
            .starts_with("/mail?pane=detail&data="));
        assert!(seen.borrow().is_empty());

        navigation.back().expect("back");
        assert_eq!(*seen.borrow(), vec![initial]);

        NavigationProvider::destroy(&navigation);
        navigation.destroy();
    }
}
