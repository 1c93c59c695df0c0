use std::fmt;

use leptos::*;

use super::{VariantConfig, VariantSelector, VariantSize, VariantStrategy};
use crate::merge_layout_class;

#[derive(Clone)]
/// One size-specific rendering offered to [`ResponsiveVariants`].
pub struct Variant {
    /// Name and size hint.
    pub config: VariantConfig,
    /// Renders the variant's content.
    pub render: ViewFn,
}

impl Variant {
    /// Creates a variant named `name` rendered by `render`.
    pub fn new<F, V>(name: impl Into<String>, render: F) -> Self
    where
        F: Fn() -> V + 'static,
        V: IntoView,
    {
        Self {
            config: VariantConfig::new(name),
            render: ViewFn::from(render),
        }
    }

    /// Sets the width assumed before the variant is first measured.
    pub fn with_min_width(mut self, min_width: f64) -> Self {
        self.config = self.config.with_min_width(min_width);
        self
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Variant")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn slot_style(active: bool) -> &'static str {
    if active {
        "width:max-content;"
    } else {
        "position:absolute;top:0;left:0;width:max-content;visibility:hidden;pointer-events:none;"
    }
}

fn container_style(bounded_height: bool) -> &'static str {
    if bounded_height {
        "position:relative;overflow:hidden;min-width:0;height:100%;"
    } else {
        "position:relative;overflow:hidden;min-width:0;"
    }
}

/// Available space reported by a container of `width` x `height` client pixels.
///
/// An auto-height container grows with the active variant, so its height is not a constraint.
fn available_size(width: f64, height: f64, bounded_height: bool) -> VariantSize {
    if bounded_height {
        VariantSize::new(width, height)
    } else {
        VariantSize::width_only(width)
    }
}

#[component]
/// Renders the largest of `variants` that fits the available space.
///
/// `variants` are ordered smallest first. Inactive candidates stay laid out but hidden so their
/// natural size keeps being measured; only the active variant is visible and interactive.
///
/// Only width constrains selection by default. With `bounded_height` the container fills its
/// parent's height (`height:100%`), so the parent must give it a definite height, and variants
/// taller than that height are skipped.
pub fn ResponsiveVariants(
    variants: Vec<Variant>,
    #[prop(optional)] strategy: VariantStrategy,
    #[prop(optional)] bounded_height: bool,
    #[prop(optional)] layout_class: Option<&'static str>,
    #[prop(optional)] ui_slot: Option<&'static str>,
) -> impl IntoView {
    let count = variants.len();
    let selector = store_value(VariantSelector::new(
        strategy,
        variants
            .iter()
            .map(|variant| variant.config.clone())
            .collect(),
    ));
    let active = create_rw_signal(selector.with_value(VariantSelector::active));
    let container = create_node_ref::<html::Div>();
    let slot_refs: Vec<NodeRef<html::Div>> = (0..count).map(|_| create_node_ref()).collect();

    #[cfg(target_arch = "wasm32")]
    observe::install(selector, active, container, slot_refs.clone(), bounded_height);

    let slots = variants
        .into_iter()
        .zip(slot_refs)
        .enumerate()
        .map(|(index, (variant, node_ref))| {
            let rendered =
                create_memo(move |_| strategy.candidates(count, active.get()).contains(&index));
            let is_active = create_memo(move |_| active.get() == index);
            let render = variant.render;

            view! {
                <div
                    node_ref=node_ref
                    data-ui-variant=variant.config.name
                    data-ui-state=move || if is_active.get() { "active" } else { "measuring" }
                    aria-hidden=move || (!is_active.get()).then_some("true")
                    style=move || slot_style(is_active.get())
                >
                    {move || rendered.get().then(|| render.run())}
                </div>
            }
        })
        .collect_view();

    view! {
        <div
            node_ref=container
            class=merge_layout_class("ui-responsive-variants", layout_class)
            data-ui-primitive="true"
            data-ui-kind="responsive-variants"
            data-ui-slot=ui_slot
            data-ui-strategy=strategy.token()
            style=container_style(bounded_height)
        >
            {slots}
        </div>
    }
}

#[cfg(target_arch = "wasm32")]
mod observe {
    use leptos::*;
    use wasm_bindgen::{closure::Closure, JsCast, JsValue};

    use super::available_size;
    use crate::variants::{VariantSelector, VariantSize};

    type ResizeCallback = Closure<dyn FnMut(js_sys::Array, JsValue)>;

    struct SizeObserver {
        observer: web_sys::ResizeObserver,
        _callback: ResizeCallback,
    }

    impl SizeObserver {
        fn disconnect(self) {
            self.observer.disconnect();
        }
    }

    fn element(node: HtmlElement<html::Div>) -> web_sys::Element {
        (*node).clone().into()
    }

    /// Observes the container and every slot once all of them are mounted.
    pub(super) fn install(
        selector: StoredValue<VariantSelector>,
        active: RwSignal<usize>,
        container: NodeRef<html::Div>,
        slots: Vec<NodeRef<html::Div>>,
        bounded_height: bool,
    ) {
        let handle = store_value(None::<SizeObserver>);

        create_effect(move |_| {
            let Some(container) = container.get() else {
                return;
            };
            let Some(slots) = slots
                .iter()
                .map(|slot| slot.get().map(element))
                .collect::<Option<Vec<_>>>()
            else {
                return;
            };
            handle.update_value(|current| {
                if let Some(previous) = current.take() {
                    previous.disconnect();
                }
            });
            match attach(element(container), slots, selector, active, bounded_height) {
                Ok(observer) => handle.set_value(Some(observer)),
                Err(err) => logging::warn!("variant size observer unavailable: {err}"),
            }
        });

        on_cleanup(move || {
            handle.try_update_value(|current| {
                if let Some(observer) = current.take() {
                    observer.disconnect();
                }
            });
        });
    }

    fn attach(
        container: web_sys::Element,
        slots: Vec<web_sys::Element>,
        selector: StoredValue<VariantSelector>,
        active: RwSignal<usize>,
        bounded_height: bool,
    ) -> Result<SizeObserver, String> {
        let targets: Vec<web_sys::Element> =
            std::iter::once(container.clone()).chain(slots.iter().cloned()).collect();
        let callback = ResizeCallback::wrap(Box::new(
            move |_entries: js_sys::Array, _observer: JsValue| {
                if measure(&container, &slots, selector, bounded_height) {
                    request_flush(selector, active);
                }
            },
        ));
        let observer = web_sys::ResizeObserver::new(callback.as_ref().unchecked_ref())
            .map_err(|err| format!("{err:?}"))?;
        for target in &targets {
            observer.observe(target);
        }
        Ok(SizeObserver {
            observer,
            _callback: callback,
        })
    }

    /// Reads the container and rendered candidate sizes. Returns whether a frame is needed.
    fn measure(
        container: &web_sys::Element,
        slots: &[web_sys::Element],
        selector: StoredValue<VariantSelector>,
        bounded_height: bool,
    ) -> bool {
        selector
            .try_update_value(|selector| {
                selector.set_container(available_size(
                    f64::from(container.client_width()),
                    f64::from(container.client_height()),
                    bounded_height,
                ));
                for index in selector.candidates() {
                    let Some(slot) = slots.get(index) else {
                        continue;
                    };
                    let rect = slot.get_bounding_client_rect();
                    selector.set_measurement(index, VariantSize::new(rect.width(), rect.height()));
                }
                selector.schedule()
            })
            .unwrap_or(false)
    }

    /// Applies the pending selection on the next animation frame.
    ///
    /// Moving the active variant changes the candidate set, so the flush schedules again from
    /// cached measurements until the selection settles.
    fn request_flush(selector: StoredValue<VariantSelector>, active: RwSignal<usize>) {
        let Some(window) = web_sys::window() else {
            return;
        };
        let callback = Closure::once_into_js(move || {
            let Some(next) = selector.try_update_value(VariantSelector::flush).flatten() else {
                return;
            };
            active.try_set(next);
            if selector
                .try_update_value(VariantSelector::schedule)
                .unwrap_or(false)
            {
                request_flush(selector, active);
            }
        });
        if let Err(err) = window.request_animation_frame(callback.unchecked_ref()) {
            logging::warn!("requestAnimationFrame failed: {err:?}");
        }
    }
}
