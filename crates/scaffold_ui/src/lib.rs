//! Leptos bindings for scaffold pane navigation and responsive variants.
//!
//! - [`PaneNavigationProvider`] / [`use_pane_navigation`]: a reactive [`PaneNavigationContext`]
//!   backed by a [`navigation_host`] provider chosen from a [`navigation_host::NavigationConfig`].
//! - [`ResponsiveVariants`]: renders the largest of several size-ordered variants that fits its
//!   container, using the pure [`VariantSelector`] policy.
//!
//! Rendered elements follow the `data-ui-*` attribute contract (`data-ui-primitive`,
//! `data-ui-kind`, `data-ui-slot`) so styling layers can target them without class names.

#![warn(missing_docs, rustdoc::broken_intra_doc_links)]

pub mod navigation;
pub mod variants;

pub use navigation::{
    try_use_pane_navigation, use_pane_navigation, PaneNavigationContext, PaneNavigationProvider,
};
pub use variants::{
    select_variant, ResponsiveVariants, Variant, VariantConfig, VariantSelector, VariantSize,
    VariantStrategy,
};

pub(crate) fn merge_layout_class(base: &'static str, layout_class: Option<&'static str>) -> String {
    match layout_class {
        Some(layout_class) if !layout_class.is_empty() => format!("{base} {layout_class}"),
        _ => base.to_string(),
    }
}
