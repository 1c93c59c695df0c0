//! Strategy that picks the Navigation API when present and browser history otherwise.

use std::fmt;

use crate::{
    browser_history::BrowserHistoryProvider,
    environment::HistoryEnvironment,
    model::{NavigationState, PaneParams, StateChangeCallback},
    navigation_api::{NativeNavigation, NavigationApiProvider},
    provider::{AutoSelection, NavigationProvider},
};

enum Delegate<P, N: NativeNavigation, E: HistoryEnvironment> {
    NavigationApi(NavigationApiProvider<P, N>),
    BrowserHistory(BrowserHistoryProvider<P, E>),
}

/// Provider that selects its delegate once, at construction, and forwards every call to it.
pub struct AutoProvider<P, N: NativeNavigation, E: HistoryEnvironment> {
    delegate: Delegate<P, N, E>,
}

impl<P, N: NativeNavigation, E: HistoryEnvironment> fmt::Debug for AutoProvider<P, N, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("AutoProvider");
        match &self.delegate {
            Delegate::NavigationApi(provider) => debug
                .field("selection", &AutoSelection::NavigationApi.token())
                .field("delegate", provider),
            Delegate::BrowserHistory(provider) => debug
                .field("selection", &AutoSelection::BrowserHistory.token())
                .field("delegate", provider),
        };
        debug.finish()
    }
}

impl<P, N, E> AutoProvider<P, N, E>
where
    P: PaneParams,
    N: NativeNavigation + 'static,
    E: HistoryEnvironment + 'static,
{
    /// Predicts the selection without constructing a provider.
    ///
    /// `native` is `None` when no browsing environment exists (server rendering).
    pub fn predict(native: Option<&N>) -> AutoSelection {
        match native {
            None => AutoSelection::Ssr,
            Some(native) if NavigationApiProvider::<P, N>::is_supported(native) => {
                AutoSelection::NavigationApi
            }
            Some(_) => AutoSelection::BrowserHistory,
        }
    }

    /// Builds the Navigation API provider when `native` supports it, otherwise a browser history
    /// provider over `env`.
    pub fn new(
        native: N,
        env: E,
        base_path: Option<String>,
        on_change: StateChangeCallback<P>,
    ) -> Self {
        let delegate = if NavigationApiProvider::<P, N>::is_supported(&native) {
            Delegate::NavigationApi(NavigationApiProvider::new(native, base_path, on_change))
        } else {
            Delegate::BrowserHistory(BrowserHistoryProvider::new(env, base_path, on_change))
        };
        Self { delegate }
    }

    /// Strategy chosen at construction.
    pub fn selection(&self) -> AutoSelection {
        match self.delegate {
            Delegate::NavigationApi(_) => AutoSelection::NavigationApi,
            Delegate::BrowserHistory(_) => AutoSelection::BrowserHistory,
        }
    }
}

impl<P, N, E> NavigationProvider<P> for AutoProvider<P, N, E>
where
    P: PaneParams,
    N: NativeNavigation + 'static,
    E: HistoryEnvironment + 'static,
{
    fn current_state(&self) -> Option<NavigationState<P>> {
        match &self.delegate {
            Delegate::NavigationApi(provider) => provider.current_state(),
            Delegate::BrowserHistory(provider) => provider.current_state(),
        }
    }

    fn push_state(&self, state: &NavigationState<P>) {
        match &self.delegate {
            Delegate::NavigationApi(provider) => provider.push_state(state),
            Delegate::BrowserHistory(provider) => provider.push_state(state),
        }
    }

    fn replace_state(&self, state: &NavigationState<P>) {
        match &self.delegate {
            Delegate::NavigationApi(provider) => provider.replace_state(state),
            Delegate::BrowserHistory(provider) => provider.replace_state(state),
        }
    }

    fn destroy(&self) {
        match &self.delegate {
            Delegate::NavigationApi(provider) => provider.destroy(),
            Delegate::BrowserHistory(provider) => provider.destroy(),
        }
    }
}
