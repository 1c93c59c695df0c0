//! Pane navigation state model shared by every provider.

use std::{fmt, rc::Rc};

use serde::{de::DeserializeOwned, Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// The four fixed pane slots a scaffold layout can focus.
pub enum ActivePane {
    /// Navigation rail.
    Rail,
    /// Master list pane.
    List,
    /// Detail pane.
    Detail,
    /// Trailing supplementary pane.
    Tail,
}

impl Default for ActivePane {
    fn default() -> Self {
        Self::List
    }
}

impl ActivePane {
    /// Every pane slot in layout order.
    pub const ALL: [Self; 4] = [Self::Rail, Self::List, Self::Detail, Self::Tail];

    /// Returns the stable token used in URLs and serialized state.
    pub const fn token(self) -> &'static str {
        match self {
            Self::Rail => "rail",
            Self::List => "list",
            Self::Detail => "detail",
            Self::Tail => "tail",
        }
    }

    /// Parses a pane token produced by [`ActivePane::token`].
    pub fn from_token(token: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|pane| pane.token() == token)
    }
}

impl fmt::Display for ActivePane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
/// Per-pane navigation parameters.
///
/// All four slots are always present; a pane without parameters uses a unit-like record type.
pub struct Panes<Rail, List, Detail, Tail> {
    /// Parameters of the navigation rail.
    pub rail: Rail,
    /// Parameters of the list pane.
    pub list: List,
    /// Parameters of the detail pane.
    pub detail: Detail,
    /// Parameters of the trailing pane.
    pub tail: Tail,
}

/// Bounds required from every pane slot parameter type.
pub trait PaneSlot: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + 'static {}

impl<T> PaneSlot for T where T: Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + 'static
{}

mod sealed {
    pub trait Sealed {}
}

/// Pane parameter contract consumed by navigation providers.
///
/// Only implemented for [`Panes`], so partial pane state cannot be expressed.
pub trait PaneParams:
    sealed::Sealed + Clone + PartialEq + fmt::Debug + Serialize + DeserializeOwned + 'static
{
}

impl<R: PaneSlot, L: PaneSlot, D: PaneSlot, T: PaneSlot> sealed::Sealed for Panes<R, L, D, T> {}

impl<R: PaneSlot, L: PaneSlot, D: PaneSlot, T: PaneSlot> PaneParams for Panes<R, L, D, T> {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
/// Snapshot of the focused pane and every pane's parameters.
pub struct NavigationRoute<P> {
    /// Position of this route in the history it was recorded in.
    pub index: usize,
    /// Pane that currently has navigation focus.
    pub active_pane: ActivePane,
    /// Parameters for all four panes.
    pub panes: P,
}

impl<P> NavigationRoute<P> {
    /// Creates a route.
    pub fn new(index: usize, active_pane: ActivePane, panes: P) -> Self {
        Self {
            index,
            active_pane,
            panes,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Current route plus the log of previously visited routes.
///
/// `route` is expected to equal the last `history` entry, but URL-backed providers only restore
/// a single-entry history, so consumers must not rely on the history being complete.
pub struct NavigationState<P> {
    /// Current route.
    pub route: NavigationRoute<P>,
    /// Visited routes, oldest first.
    pub history: Vec<NavigationRoute<P>>,
}

impl<P: Clone> NavigationState<P> {
    /// Creates a state whose history holds only `route`.
    pub fn new(route: NavigationRoute<P>) -> Self {
        Self {
            history: vec![route.clone()],
            route,
        }
    }

    /// Builds the state recovered from a URL: index 0 and a single-entry history.
    pub fn from_url_route(active_pane: ActivePane, panes: P) -> Self {
        Self::new(NavigationRoute::new(0, active_pane, panes))
    }

    /// Returns the state reached by navigating to `active_pane` with `panes`.
    ///
    /// The new route is appended to the history and indexed by its position.
    pub fn navigated(&self, active_pane: ActivePane, panes: P) -> Self {
        let route = NavigationRoute::new(self.history.len(), active_pane, panes);
        let mut history = self.history.clone();
        history.push(route.clone());
        Self { route, history }
    }
}

impl<P: PartialEq> NavigationState<P> {
    /// Returns whether `route` is the tail of `history`.
    pub fn is_consistent(&self) -> bool {
        self.history.last() == Some(&self.route)
    }
}

/// Callback invoked with the new state whenever a provider propagates a navigation.
pub type StateChangeCallback<P> = Rc<dyn Fn(NavigationState<P>)>;
