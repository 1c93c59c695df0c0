//! Typed pane navigation state and the providers that keep it in sync with a history backend.
//!
//! Application state is a [`NavigationState`] over four pane slots ([`Panes`]). A
//! [`NavigationProvider`] mirrors application writes into its backend and reports backend-originated
//! changes (user back/forward, edited URLs, link clicks) through the callback it was built with.
//!
//! Backends:
//!
//! - [`MemoryRouterProvider`]: in-memory stack, nothing written to the URL.
//! - [`BrowserHistoryProvider`]: `<base>?pane=..&data=..` via session history.
//! - [`HashRouterProvider`]: `#/<pane>?data=..`.
//! - [`NavigationApiProvider`]: the native Navigation API as the single source of truth.
//! - [`AutoProvider`]: Navigation API when supported, browser history otherwise.
//!
//! The entry-list primitives ([`MemoryNavigationProvider`], [`WebNavigationProvider`]) implement
//! [`EntryNavigation`] and, when their entry state is a [`NavigationState`], the same
//! [`NavigationProvider`] contract.
//!
//! Browser globals are reached only through [`HistoryEnvironment`] and [`NativeNavigation`]; the
//! `navigation_host_web` crate supplies the browser implementations, and this crate ships
//! in-memory simulations used by tests and native builds.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod auto;
pub mod browser_history;
pub mod codec;
pub mod entries;
pub mod environment;
pub mod hash_router;
pub mod memory_navigation;
pub mod memory_router;
pub mod model;
pub mod navigation_api;
pub mod provider;
pub mod web_navigation;

pub use auto::AutoProvider;
pub use browser_history::BrowserHistoryProvider;
pub use codec::{
    decode_hash, decode_query, encode_hash, encode_query_url, state_from_hash, state_from_query,
    state_from_value, state_to_value, UrlStateError,
};
pub use entries::{
    CurrentEntryChange, EntryNavigation, HistoryMode, NavigateOptions, NavigationError,
    NavigationEvent, NavigationEventKind, NavigationHistoryEntry, NavigationListener,
    NavigationType,
};
pub use environment::{
    BrowserLocation, HistoryEnvironment, HistoryEvent, HistoryEventKind, HistoryListener,
    ListenerId, MemoryHistoryEnvironment, NoopHistoryEnvironment,
};
pub use hash_router::HashRouterProvider;
pub use memory_navigation::{forward_entry_changes, MemoryNavigationProvider};
pub use memory_router::MemoryRouterProvider;
pub use model::{
    ActivePane, NavigationRoute, NavigationState, PaneParams, PaneSlot, Panes, StateChangeCallback,
};
pub use navigation_api::{
    MemoryNativeNavigation, NativeEntry, NativeNavigateEvent, NativeNavigation, NavigateListener,
    NavigationApiProvider,
};
pub use provider::{AutoSelection, NavigationConfig, NavigationProvider, ProviderStrategy};
pub use web_navigation::WebNavigationProvider;
