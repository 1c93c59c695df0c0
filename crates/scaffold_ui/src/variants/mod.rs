//! Responsive variant selection.
//!
//! A component declares size-ordered variants (smallest first). [`VariantSelector`] tracks the
//! measured natural size of each variant and the container's available size, and picks the
//! largest candidate that fits both dimensions. [`ResponsiveVariants`] renders the candidates and
//! feeds DOM measurements into a selector.

use std::ops::Range;

mod view;

pub use view::{ResponsiveVariants, Variant};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// Which variants are rendered and considered during selection.
pub enum VariantStrategy {
    /// The active variant and its immediate smaller and larger neighbors.
    #[default]
    Adjacent,
    /// Every variant.
    Full,
}

impl VariantStrategy {
    pub(crate) fn token(self) -> &'static str {
        match self {
            Self::Adjacent => "adjacent",
            Self::Full => "full",
        }
    }

    /// Variant used before the first measurement.
    ///
    /// The middle variant for [`VariantStrategy::Adjacent`], the smallest for
    /// [`VariantStrategy::Full`].
    pub fn default_index(self, count: usize) -> usize {
        match self {
            Self::Adjacent => count.saturating_sub(1) / 2,
            Self::Full => 0,
        }
    }

    /// Indices rendered and considered while `active` is selected.
    pub fn candidates(self, count: usize, active: usize) -> Range<usize> {
        match self {
            Self::Adjacent => active.saturating_sub(1)..active.saturating_add(2).min(count),
            Self::Full => 0..count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
/// Width and height in CSS pixels.
pub struct VariantSize {
    /// Width in CSS pixels.
    pub width: f64,
    /// Height in CSS pixels.
    pub height: f64,
}

impl VariantSize {
    /// Creates a size.
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Creates a container size that only constrains width.
    pub const fn width_only(width: f64) -> Self {
        Self {
            width,
            height: f64::INFINITY,
        }
    }

    /// Returns whether `self` fits inside `container` in both dimensions.
    pub fn fits_within(self, container: VariantSize) -> bool {
        self.width <= container.width && self.height <= container.height
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
/// Static description of one variant.
pub struct VariantConfig {
    /// Stable name emitted as `data-ui-variant`.
    pub name: String,
    /// Width assumed until the variant has been measured.
    pub min_width: Option<f64>,
}

impl VariantConfig {
    /// Creates a variant description without a width hint.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            min_width: None,
        }
    }

    /// Sets the width assumed before the first measurement.
    pub fn with_min_width(mut self, min_width: f64) -> Self {
        self.min_width = Some(min_width);
        self
    }
}

/// Picks the largest candidate whose size fits `container`.
///
/// `candidates` are variant indices in ascending size order and `sizes` is indexed by variant.
/// Variants without a size never fit. When nothing fits, the smallest candidate is returned.
/// Returns `None` only when `candidates` is empty.
pub fn select_variant(
    candidates: &[usize],
    sizes: &[Option<VariantSize>],
    container: VariantSize,
) -> Option<usize> {
    candidates
        .iter()
        .rev()
        .copied()
        .find(|&index| {
            sizes
                .get(index)
                .copied()
                .flatten()
                .is_some_and(|size| size.fits_within(container))
        })
        .or_else(|| candidates.first().copied())
}

#[derive(Debug, Clone, PartialEq)]
/// Selection state for one set of size-ordered variants.
///
/// Measurements and container resizes schedule a selection; [`VariantSelector::flush`] applies
/// it. A schedule made before the previous one was flushed replaces its target.
pub struct VariantSelector {
    strategy: VariantStrategy,
    variants: Vec<VariantConfig>,
    measured: Vec<Option<VariantSize>>,
    container: Option<VariantSize>,
    active: usize,
    pending: Option<usize>,
}

impl VariantSelector {
    /// Creates a selector positioned on the strategy's default variant.
    pub fn new(strategy: VariantStrategy, variants: Vec<VariantConfig>) -> Self {
        Self {
            strategy,
            measured: vec![None; variants.len()],
            container: None,
            active: strategy.default_index(variants.len()),
            pending: None,
            variants,
        }
    }

    /// Selection strategy.
    pub fn strategy(&self) -> VariantStrategy {
        self.strategy
    }

    /// Variant descriptions in size order.
    pub fn variants(&self) -> &[VariantConfig] {
        &self.variants
    }

    /// Index of the active variant. `0` when there are no variants.
    pub fn active(&self) -> usize {
        self.active
    }

    /// Last container size reported.
    pub fn container(&self) -> Option<VariantSize> {
        self.container
    }

    /// Indices currently rendered and considered.
    pub fn candidates(&self) -> Range<usize> {
        self.strategy.candidates(self.variants.len(), self.active)
    }

    /// Measured size of `index`, falling back to its `min_width` hint with zero height.
    pub fn size_of(&self, index: usize) -> Option<VariantSize> {
        self.measured.get(index).copied().flatten().or_else(|| {
            self.variants
                .get(index)
                .and_then(|variant| variant.min_width)
                .map(|width| VariantSize::new(width, 0.0))
        })
    }

    /// Records the natural size of variant `index`. Returns whether it changed.
    pub fn set_measurement(&mut self, index: usize, size: VariantSize) -> bool {
        match self.measured.get_mut(index) {
            Some(slot) if *slot != Some(size) => {
                *slot = Some(size);
                true
            }
            _ => false,
        }
    }

    /// Records the container's available size. Returns whether it changed.
    pub fn set_container(&mut self, size: VariantSize) -> bool {
        if self.container == Some(size) {
            return false;
        }
        self.container = Some(size);
        true
    }

    /// Variant the current measurements select, without applying it.
    ///
    /// `None` until the container has been measured.
    pub fn evaluate(&self) -> Option<usize> {
        let container = self.container?;
        let candidates: Vec<usize> = self.candidates().collect();
        let sizes: Vec<Option<VariantSize>> =
            (0..self.variants.len()).map(|index| self.size_of(index)).collect();
        select_variant(&candidates, &sizes, container)
    }

    /// Stores the evaluated target as the pending selection.
    ///
    /// Returns `true` when no selection was pending before, meaning the caller should request
    /// a frame to flush it.
    pub fn schedule(&mut self) -> bool {
        let Some(target) = self.evaluate() else {
            return false;
        };
        self.pending.replace(target).is_none()
    }

    /// Whether a scheduled selection awaits [`VariantSelector::flush`].
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Applies the pending selection.
    ///
    /// Returns the new active index, or `None` when nothing was pending or the target is
    /// already active.
    pub fn flush(&mut self) -> Option<usize> {
        let target = self.pending.take()?;
        if target == self.active {
            return None;
        }
        self.active = target;
        Some(target)
    }
}
