//! Browser (`wasm32`) implementations of the [`navigation_host`] environment contracts.
//!
//! - [`WebHistoryEnvironment`]: `window.location`, `window.history`, `popstate`/`hashchange`.
//! - [`WebNativeNavigation`]: `window.navigation` and its `navigate` event.
//! - [`build_provider`]: turns a [`navigation_host::NavigationConfig`] into a [`ProviderAdapter`].
//!
//! Outside `wasm32` both environments report no window, so providers built here degrade to
//! warned no-ops during server rendering and native tests.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod adapters;
pub mod history_env;
#[cfg(target_arch = "wasm32")]
mod interop;
pub mod native_navigation;

pub use adapters::{build_provider, has_browsing_environment, predict_auto_strategy, ProviderAdapter};
pub use history_env::WebHistoryEnvironment;
pub use native_navigation::WebNativeNavigation;
