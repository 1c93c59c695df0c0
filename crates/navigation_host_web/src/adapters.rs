//! Strategy-driven provider construction for runtime wiring.

use navigation_host::{
    AutoProvider, AutoSelection, BrowserHistoryProvider, HashRouterProvider, MemoryRouterProvider,
    NavigationApiProvider, NavigationConfig, NavigationProvider, NavigationState, PaneParams,
    Panes, ProviderStrategy, StateChangeCallback,
};

use crate::{WebHistoryEnvironment, WebNativeNavigation};

type BrowserAuto<P> = AutoProvider<P, WebNativeNavigation, WebHistoryEnvironment>;

/// Adapter enum that erases the concrete provider behind [`NavigationProvider`].
#[derive(Debug)]
pub enum ProviderAdapter<P: PaneParams> {
    /// In-memory router.
    Memory(MemoryRouterProvider<P>),
    /// Query-string URLs over session history.
    BrowserHistory(BrowserHistoryProvider<P, WebHistoryEnvironment>),
    /// Hash-fragment URLs.
    HashRouter(HashRouterProvider<P, WebHistoryEnvironment>),
    /// Native Navigation API.
    NavigationApi(NavigationApiProvider<P, WebNativeNavigation>),
    /// Runtime-selected Navigation API or browser history.
    Auto(BrowserAuto<P>),
}

impl<P: PaneParams> ProviderAdapter<P> {
    /// Strategy this adapter was built for.
    pub fn strategy(&self) -> ProviderStrategy {
        match self {
            Self::Memory(_) => ProviderStrategy::Memory,
            Self::BrowserHistory(_) => ProviderStrategy::BrowserHistory,
            Self::HashRouter(_) => ProviderStrategy::HashRouter,
            Self::NavigationApi(_) => ProviderStrategy::NavigationApi,
            Self::Auto(_) => ProviderStrategy::Auto,
        }
    }

    /// Delegate chosen by the auto strategy, or `None` for the fixed strategies.
    pub fn auto_selection(&self) -> Option<AutoSelection> {
        match self {
            Self::Auto(provider) => Some(provider.selection()),
            _ => None,
        }
    }
}

impl<P: PaneParams> NavigationProvider<P> for ProviderAdapter<P> {
    fn current_state(&self) -> Option<NavigationState<P>> {
        match self {
            Self::Memory(provider) => provider.current_state(),
            Self::BrowserHistory(provider) => provider.current_state(),
            Self::HashRouter(provider) => provider.current_state(),
            Self::NavigationApi(provider) => provider.current_state(),
            Self::Auto(provider) => provider.current_state(),
        }
    }

    fn push_state(&self, state: &NavigationState<P>) {
        match self {
            Self::Memory(provider) => provider.push_state(state),
            Self::BrowserHistory(provider) => provider.push_state(state),
            Self::HashRouter(provider) => provider.push_state(state),
            Self::NavigationApi(provider) => provider.push_state(state),
            Self::Auto(provider) => provider.push_state(state),
        }
    }

    fn replace_state(&self, state: &NavigationState<P>) {
        match self {
            Self::Memory(provider) => provider.replace_state(state),
            Self::BrowserHistory(provider) => provider.replace_state(state),
            Self::HashRouter(provider) => provider.replace_state(state),
            Self::NavigationApi(provider) => provider.replace_state(state),
            Self::Auto(provider) => provider.replace_state(state),
        }
    }

    fn destroy(&self) {
        match self {
            Self::Memory(provider) => provider.destroy(),
            Self::BrowserHistory(provider) => provider.destroy(),
            Self::HashRouter(provider) => provider.destroy(),
            Self::NavigationApi(provider) => provider.destroy(),
            Self::Auto(provider) => provider.destroy(),
        }
    }
}

/// Builds the provider selected by `config`.
///
/// `initial_state` seeds the memory router; URL-backed strategies read their state from the
/// window instead.
pub fn build_provider<P: PaneParams>(
    config: &NavigationConfig,
    initial_state: &NavigationState<P>,
    on_change: StateChangeCallback<P>,
) -> ProviderAdapter<P> {
    let base_path = config.base_path.clone();
    match config.strategy {
        ProviderStrategy::Memory => {
            ProviderAdapter::Memory(MemoryRouterProvider::new(initial_state, on_change))
        }
        ProviderStrategy::BrowserHistory => ProviderAdapter::BrowserHistory(
            BrowserHistoryProvider::new(WebHistoryEnvironment::default(), base_path, on_change),
        ),
        ProviderStrategy::HashRouter => ProviderAdapter::HashRouter(HashRouterProvider::new(
            WebHistoryEnvironment::default(),
            on_change,
        )),
        ProviderStrategy::NavigationApi => ProviderAdapter::NavigationApi(
            NavigationApiProvider::new(WebNativeNavigation::default(), base_path, on_change),
        ),
        ProviderStrategy::Auto => ProviderAdapter::Auto(BrowserAuto::new(
            WebNativeNavigation::default(),
            WebHistoryEnvironment::default(),
            base_path,
            on_change,
        )),
    }
}

/// Returns whether a browser window is present.
pub fn has_browsing_environment() -> bool {
    #[cfg(target_arch = "wasm32")]
    {
        web_sys::window().is_some()
    }

    #[cfg(not(target_arch = "wasm32"))]
    {
        false
    }
}

/// Predicts what [`ProviderStrategy::Auto`] would select in this environment.
pub fn predict_auto_strategy() -> AutoSelection {
    let native = has_browsing_environment().then(WebNativeNavigation::default);
    BrowserAuto::<Panes<(), (), (), ()>>::predict(native.as_ref())
}
