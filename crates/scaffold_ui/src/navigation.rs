//! Reactive pane navigation context.
//!
//! [`PaneNavigationProvider`] owns one navigation provider for its subtree and mirrors it into a
//! [`RwSignal`]. Descendants read and write navigation through [`use_pane_navigation`].

use std::rc::Rc;

use leptos::*;
use navigation_host::{
    ActivePane, AutoSelection, NavigationConfig, NavigationProvider, NavigationState, PaneParams,
    ProviderStrategy, StateChangeCallback,
};
use navigation_host_web::{build_provider, ProviderAdapter};

/// Leptos context for reading pane navigation state and recording navigations.
pub struct PaneNavigationContext<P: PaneParams> {
    /// Reactive navigation state, updated by writes and by store-originated changes.
    pub state: RwSignal<NavigationState<P>>,
    provider: StoredValue<Rc<ProviderAdapter<P>>>,
}

impl<P: PaneParams> Clone for PaneNavigationContext<P> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<P: PaneParams> Copy for PaneNavigationContext<P> {}

impl<P: PaneParams> PaneNavigationContext<P> {
    /// Builds the provider selected by `config` and seeds the state signal.
    ///
    /// The signal starts from the provider's stored state when it has one (a URL carrying pane
    /// data, a native history entry). Otherwise `initial_state` is written over the current entry
    /// so traversing back to it restores the starting panes.
    pub fn new(config: &NavigationConfig, initial_state: NavigationState<P>) -> Self {
        let state = create_rw_signal(initial_state.clone());
        let on_change: StateChangeCallback<P> =
            Rc::new(move |next: NavigationState<P>| set_if_changed(state, next));
        let provider = build_provider(config, &initial_state, on_change);
        set_if_changed(state, provider.restore_or_seed(&initial_state));
        Self {
            state,
            provider: store_value(Rc::new(provider)),
        }
    }

    /// Records `next` as a new history entry.
    pub fn push(&self, next: NavigationState<P>) {
        self.provider.with_value(|provider| provider.push_state(&next));
        set_if_changed(self.state, next);
    }

    /// Overwrites the current history entry with `next`.
    pub fn replace(&self, next: NavigationState<P>) {
        self.provider
            .with_value(|provider| provider.replace_state(&next));
        set_if_changed(self.state, next);
    }

    /// Pushes a route focusing `active_pane` with `panes` on top of the current state.
    pub fn navigate_to(&self, active_pane: ActivePane, panes: P) {
        let next = self
            .state
            .with_untracked(|state| state.navigated(active_pane, panes));
        self.push(next);
    }

    /// Strategy of the underlying provider.
    pub fn strategy(&self) -> ProviderStrategy {
        self.provider.with_value(|provider| provider.strategy())
    }

    /// Delegate picked by the auto strategy.
    pub fn auto_selection(&self) -> Option<AutoSelection> {
        self.provider.with_value(|provider| provider.auto_selection())
    }

    /// Releases the provider's environment listeners. Safe to call more than once.
    pub fn destroy(&self) {
        self.provider.try_with_value(|provider| provider.destroy());
    }
}

fn set_if_changed<P: PaneParams>(signal: RwSignal<NavigationState<P>>, next: NavigationState<P>) {
    if signal.with_untracked(|current| current != &next) {
        signal.set(next);
    }
}

#[component]
/// Provides [`PaneNavigationContext`] to descendant components.
pub fn PaneNavigationProvider<P: PaneParams>(
    /// State used until the backing store reports one.
    initial_state: NavigationState<P>,
    /// Provider strategy and base path. Defaults to the auto strategy.
    #[prop(optional)]
    config: NavigationConfig,
    children: Children,
) -> impl IntoView {
    let navigation = PaneNavigationContext::new(&config, initial_state);
    provide_context(navigation);
    on_cleanup(move || navigation.destroy());

    children().into_view()
}

/// Returns the current [`PaneNavigationContext`].
///
/// # Panics
///
/// Panics if called outside [`PaneNavigationProvider`] for the same pane type.
pub fn use_pane_navigation<P: PaneParams>() -> PaneNavigationContext<P> {
    use_context::<PaneNavigationContext<P>>().expect("PaneNavigationContext not provided")
}

/// Returns the current [`PaneNavigationContext`], or `None` outside [`PaneNavigationProvider`].
pub fn try_use_pane_navigation<P: PaneParams>() -> Option<PaneNavigationContext<P>> {
    use_context::<PaneNavigationContext<P>>()
}

#[cfg(test)]
mod tests {
    use navigation_host::{NavigationRoute, Panes};
    use pretty_assertions::assert_eq;

    use super::*;

    type Inbox = Panes<(), String, Option<u32>, ()>;

    fn panes(folder: &str, message: Option<u32>) -> Inbox {
        Panes {
            rail: (),
            list: folder.to_string(),
            detail: message,
            tail: (),
        }
    }

    fn initial() -> NavigationState<Inbox> {
        NavigationState::new(NavigationRoute::new(0, ActivePane::List, panes("inbox", None)))
    }

    fn memory_context() -> PaneNavigationContext<Inbox> {
        PaneNavigationContext::new(&NavigationConfig::new(ProviderStrategy::Memory), initial())
    }

    #[test]
    fn memory_context_starts_from_the_initial_state() {
        let _ = create_runtime();
        let navigation = memory_context();

        assert_eq!(navigation.state.get_untracked(), initial());
        assert_eq!(navigation.strategy(), ProviderStrategy::Memory);
        assert_eq!(navigation.auto_selection(), None);
    }

    #[test]
    fn navigate_to_appends_a_route_and_updates_the_signal() {
        let _ = create_runtime();
        let navigation = memory_context();

        navigation.navigate_to(ActivePane::Detail, panes("inbox", Some(7)));

        let state = navigation.state.get_untracked();
        assert_eq!(state.route.active_pane, ActivePane::Detail);
        assert_eq!(state.route.panes, panes("inbox", Some(7)));
        assert_eq!(state.history.len(), 2);
        assert!(state.is_consistent());
    }

    #[test]
    fn replace_overwrites_the_signal_value() {
        let _ = create_runtime();
        let navigation = memory_context();
        let archived =
            NavigationState::new(NavigationRoute::new(0, ActivePane::List, panes("archive", None)));

        navigation.replace(archived.clone());

        assert_eq!(navigation.state.get_untracked(), archived);
    }

    #[test]
    fn url_strategies_fall_back_to_the_initial_state_without_a_window() {
        let _ = create_runtime();
        let navigation = PaneNavigationContext::new(
            &NavigationConfig::new(ProviderStrategy::BrowserHistory),
            initial(),
        );

        navigation.navigate_to(ActivePane::Detail, panes("inbox", Some(1)));

        assert_eq!(
            navigation.state.get_untracked().route.panes,
            panes("inbox", Some(1))
        );
        navigation.destroy();
        navigation.destroy();
    }

    #[test]
    fn lookup_outside_the_provider_is_none() {
        let _ = create_runtime();
        assert!(try_use_pane_navigation::<Inbox>().is_none());
    }

    #[test]
    #[should_panic(expected = "PaneNavigationContext not provided")]
    fn use_outside_the_provider_panics() {
        let _ = create_runtime();
        let _ = use_pane_navigation::<Inbox>();
    }
}
