//! Provider capability contract and strategy configuration.

use serde::{Deserialize, Serialize};

use crate::model::{NavigationState, PaneParams};

/// Capability contract shared by every navigation provider.
///
/// Providers mirror application writes into their backing store and report store-originated
/// changes (user back/forward, URL edits) through the change callback supplied at construction.
/// Only one provider should be active against a given window at a time.
pub trait NavigationProvider<P: PaneParams> {
    /// Returns the state held by the backing store, or `None` when it holds none.
    fn current_state(&self) -> Option<NavigationState<P>>;

    /// Records `state` as a new history entry.
    fn push_state(&self, state: &NavigationState<P>);

    /// Overwrites the current history entry with `state`.
    fn replace_state(&self, state: &NavigationState<P>);

    /// Unregisters environment listeners. Calling it again is a no-op.
    fn destroy(&self);

    /// Returns the stored state, or writes `initial` over the current entry when the store holds
    /// none and returns it.
    ///
    /// Seeding keeps the starting entry recoverable: traversing back to it reports `initial`
    /// instead of an entry without pane data.
    fn restore_or_seed(&self, initial: &NavigationState<P>) -> NavigationState<P> {
        match self.current_state() {
            Some(current) => current,
            None => {
                self.replace_state(initial);
                initial.clone()
            }
        }
    }
}

impl<P: PaneParams, T: NavigationProvider<P> + ?Sized> NavigationProvider<P> for Box<T> {
    fn current_state(&self) -> Option<NavigationState<P>> {
        (**self).current_state()
    }

    fn push_state(&self, state: &NavigationState<P>) {
        (**self).push_state(state);
    }

    fn replace_state(&self, state: &NavigationState<P>) {
        (**self).replace_state(state);
    }

    fn destroy(&self) {
        (**self).destroy();
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Backing store selected for pane navigation.
pub enum ProviderStrategy {
    /// In-memory history, nothing written to the URL.
    Memory,
    /// URL query string plus `history.pushState`.
    BrowserHistory,
    /// URL hash fragment.
    HashRouter,
    /// Native Navigation API.
    NavigationApi,
    /// Navigation API when supported, otherwise browser history.
    #[default]
    Auto,
}

impl ProviderStrategy {
    /// Returns the stable token for this strategy.
    pub const fn token(self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::BrowserHistory => "browser-history",
            Self::HashRouter => "hash-router",
            Self::NavigationApi => "navigation-api",
            Self::Auto => "auto",
        }
    }

    /// Parses a token produced by [`ProviderStrategy::token`].
    pub fn from_token(token: &str) -> Option<Self> {
        [
            Self::Memory,
            Self::BrowserHistory,
            Self::HashRouter,
            Self::NavigationApi,
            Self::Auto,
        ]
        .into_iter()
        .find(|strategy| strategy.token() == token.trim())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
/// Strategy chosen (or predicted) by the auto provider.
pub enum AutoSelection {
    /// Native Navigation API.
    NavigationApi,
    /// Browser history fallback.
    BrowserHistory,
    /// No browsing environment is present.
    Ssr,
}

impl AutoSelection {
    /// Returns the stable token for this selection.
    pub const fn token(self) -> &'static str {
        match self {
            Self::NavigationApi => "navigation-api",
            Self::BrowserHistory => "browser-history",
            Self::Ssr => "ssr",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
/// Provider configuration supplied by the embedding application.
pub struct NavigationConfig {
    /// Backing store strategy.
    pub strategy: ProviderStrategy,
    /// Path prefix for query-string URLs. Defaults to the current pathname.
    pub base_path: Option<String>,
}

impl NavigationConfig {
    /// Creates a configuration for `strategy` with the default base path.
    pub fn new(strategy: ProviderStrategy) -> Self {
        Self {
            strategy,
            base_path: None,
        }
    }

    /// Parses a JSON configuration object; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error when `raw` is not valid configuration JSON.
    pub fn from_json(raw: &str) -> Result<Self, String> {
        serde_json::from_str(raw).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn strategy_tokens_round_trip() {
        for strategy in [
            ProviderStrategy::Memory,
            ProviderStrategy::BrowserHistory,
            ProviderStrategy::HashRouter,
            ProviderStrategy::NavigationApi,
            ProviderStrategy::Auto,
        ] {
            assert_eq!(ProviderStrategy::from_token(strategy.token()), Some(strategy));
        }
        assert_eq!(ProviderStrategy::from_token("router"), None);
    }

    #[test]
    fn config_parses_with_defaults() {
        assert_eq!(
            NavigationConfig::from_json("{}").expect("config"),
            NavigationConfig::default()
        );
        let config =
            NavigationConfig::from_json(r#"{"strategy":"hash-router","basePath":"/app"}"#)
                .expect("config");
        assert_eq!(config.strategy, ProviderStrategy::HashRouter);
        assert_eq!(config.base_path.as_deref(), Some("/app"));
        assert!(NavigationConfig::from_json(r#"{"strategy":"warp"}"#).is_err());
    }
}
