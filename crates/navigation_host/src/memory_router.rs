//! In-memory router with browser-like linear history.

use std::{
    cell::{Cell, RefCell},
    fmt,
};

use leptos::logging;

use crate::{
    model::{NavigationState, PaneParams, StateChangeCallback},
    provider::NavigationProvider,
};

struct MemoryHistory<P> {
    entries: Vec<NavigationState<P>>,
    current: usize,
}

/// Navigation provider that keeps state snapshots in memory.
///
/// Every stored and returned state is an owned copy, so callers cannot mutate history through
/// values they passed in or received. Pushing after going back prunes the forward branch.
pub struct MemoryRouterProvider<P> {
    history: RefCell<MemoryHistory<P>>,
    on_change: StateChangeCallback<P>,
    destroyed: Cell<bool>,
}

impl<P> fmt::Debug for MemoryRouterProvider<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let history = self.history.borrow();
        f.debug_struct("MemoryRouterProvider")
            .field("len", &history.entries.len())
            .field("current", &history.current)
            .field("destroyed", &self.destroyed.get())
            .finish()
    }
}

impl<P: PaneParams> MemoryRouterProvider<P> {
    /// Creates a router whose only entry is `initial_state`. `on_change` is not called here.
    pub fn new(initial_state: &NavigationState<P>, on_change: StateChangeCallback<P>) -> Self {
        Self {
            history: RefCell::new(MemoryHistory {
                entries: vec![initial_state.clone()],
                current: 0,
            }),
            on_change,
            destroyed: Cell::new(false),
        }
    }

    /// Number of stored entries, including forward entries.
    pub fn len(&self) -> usize {
        self.history.borrow().entries.len()
    }

    /// Returns whether no entries are stored.
    pub fn is_empty(&self) -> bool {
        self.history.borrow().entries.is_empty()
    }

    /// Index of the current entry.
    pub fn current_index(&self) -> usize {
        self.history.borrow().current
    }

    /// Returns whether an entry exists before the current one.
    pub fn can_go_back(&self) -> bool {
        self.history.borrow().current > 0
    }

    /// Returns whether an entry exists after the current one.
    pub fn can_go_forward(&self) -> bool {
        let history = self.history.borrow();
        history.current + 1 < history.entries.len()
    }

    /// Moves to the previous entry and notifies. Returns `false` at the start of history.
    pub fn go_back(&self) -> bool {
        self.step(-1)
    }

    /// Moves to the next entry and notifies. Returns `false` at the end of history.
    pub fn go_forward(&self) -> bool {
        self.step(1)
    }

    fn step(&self, delta: isize) -> bool {
        if self.is_destroyed("traverse") {
            return false;
        }
        let next = {
            let mut history = self.history.borrow_mut();
            let Some(target) = history.current.checked_add_signed(delta) else {
                return false;
            };
            if target >= history.entries.len() {
                return false;
            }
            history.current = target;
            history.entries[target].clone()
        };
        (self.on_change)(next);
        true
    }

    fn is_destroyed(&self, op: &str) -> bool {
        if self.destroyed.get() {
            logging::warn!("memory router {op} ignored after destroy");
            return true;
        }
        false
    }
}

impl<P: PaneParams> NavigationProvider<P> for MemoryRouterProvider<P> {
    fn current_state(&self) -> Option<NavigationState<P>> {
        let history = self.history.borrow();
        history.entries.get(history.current).cloned()
    }

    fn push_state(&self, state: &NavigationState<P>) {
        if self.is_destroyed("push") {
            return;
        }
        {
            let mut history = self.history.borrow_mut();
            let keep = history.current + 1;
            history.entries.truncate(keep);
            history.entries.push(state.clone());
            history.current = history.entries.len() - 1;
        }
        (self.on_change)(state.clone());
    }

    fn replace_state(&self, state: &NavigationState<P>) {
        if self.is_destroyed("replace") {
            return;
        }
        {
            let mut history = self.history.borrow_mut();
            let current = history.current;
            match history.entries.get_mut(current) {
                Some(entry) => *entry = state.clone(),
                None => history.entries.push(state.clone()),
            }
        }
        (self.on_change)(state.clone());
    }

    fn destroy(&self) {
        self.destroyed.set(true);
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::model::{fixtures::*, ActivePane};

    fn recording() -> (StateChangeCallback<MailPanes>, Rc<RefCell<Vec<NavigationState<MailPanes>>>>) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        (
            Rc::new(move |state: NavigationState<MailPanes>| sink.borrow_mut().push(state)),
            seen,
        )
    }

    #[test]
    fn construction_does_not_notify() {
        let (on_change, seen) = recording();
        let router = MemoryRouterProvider::new(&state(ActivePane::List, "inbox"), on_change);
        assert!(seen.borrow().is_empty());
        assert!(!router.can_go_back());
        assert!(!router.can_go_forward());
    }

    #[test]
    fn push_notifies_and_enables_back() {
        let (on_change, seen) = recording();
        let initial = state(ActivePane::List, "inbox");
        let router = MemoryRouterProvider::new(&initial, on_change);

        let next = initial.navigated(ActivePane::Detail, panes("inbox", Some("123")));
        router.push_state(&next);

        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(seen.borrow()[0].route.active_pane, ActivePane::Detail);
        assert!(router.can_go_back());
        assert!(!router.can_go_forward());
        assert_eq!(router.current_state(), Some(next));
    }

    #[test]
    fn stored_state_is_isolated_from_caller_mutation() {
        let (on_change, _) = recording();
        let mut initial = state(ActivePane::List, "inbox");
        let router = MemoryRouterProvider::new(&initial, on_change);

        initial.route.panes.list.folder = "mutated".to_string();
        let mut read = router.current_state().expect("state");
        assert_eq!(read.route.panes.list.folder, "inbox");

        read.route.panes.list.folder = "mutated again".to_string();
        assert_eq!(
            router.current_state().expect("state").route.panes.list.folder,
            "inbox"
        );
    }

    #[test]
    fn push_after_back_prunes_forward_branch() {
        let (on_change, _) = recording();
        let router = MemoryRouterProvider::new(&state(ActivePane::List, "a"), on_change);
        router.push_state(&state(ActivePane::List, "b"));
        router.push_state(&state(ActivePane::List, "c"));

        assert!(router.go_back());
        assert!(router.go_back());
        assert!(router.can_go_forward());

        router.push_state(&state(ActivePane::List, "d"));
        assert_eq!(router.len(), 2);
        assert!(!router.can_go_forward());
        assert!(!router.go_forward());
        assert!(router.go_back());
        assert_eq!(
            router.current_state().expect("state").route.panes.list.folder,
            "a"
        );
    }

    #[test]
    fn traversal_notifies_and_reports_bounds() {
        let (on_change, seen) = recording();
        let router = MemoryRouterProvider::new(&state(ActivePane::List, "a"), on_change);
        assert!(!router.go_back());
        router.push_state(&state(ActivePane::Detail, "b"));

        assert!(router.go_back());
        assert_eq!(seen.borrow().last().expect("seen").route.panes.list.folder, "a");
        assert!(router.go_forward());
        assert_eq!(seen.borrow().last().expect("seen").route.panes.list.folder, "b");
        assert_eq!(seen.borrow().len(), 3);
    }

    #[test]
    fn replace_overwrites_current_entry() {
        let (on_change, seen) = recording();
        let router = MemoryRouterProvider::new(&state(ActivePane::List, "a"), on_change);
        router.replace_state(&state(ActivePane::Tail, "z"));

        assert_eq!(router.len(), 1);
        assert_eq!(seen.borrow().len(), 1);
        assert_eq!(
            router.current_state().expect("state").route.active_pane,
            ActivePane::Tail
        );
    }

    #[test]
    fn destroy_is_idempotent_and_stops_mutation() {
        let (on_change, seen) = recording();
        let router = MemoryRouterProvider::new(&state(ActivePane::List, "a"), on_change);
        router.destroy();
        router.destroy();
        router.push_state(&state(ActivePane::List, "b"));
        assert!(seen.borrow().is_empty());
        assert_eq!(router.len(), 1);
    }
}
