//! A raster-buffer cache for one layer of one component's style.
//!
//! The buffers live in a process-wide registry keyed by [`LayerRenderConf`]
//! and layer, so any number of components sharing an identical visual
//! configuration (default-styled siblings, typically) share one buffer per
//! layer. Registry keys are
//! held weakly; each [`LayerCache`] keeps a strong reference to the key it
//! is using so the entry survives exactly as long as someone paints with it.
//!
//! Whether caching is worth it at all is a scoring decision: small buffers
//! with expensive content are allocated eagerly, large ones only after a
//! number of repeated paints with the same configuration, pathological ones
//! never.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError, Weak};

use crate::error::GlazeResult;
use crate::geom::Size;
use crate::render_conf::{ComponentConf, LayerRenderConf};
use crate::style_conf::StyleLayer;
use crate::surface::{DrawContext, Pixmap};

/// Hard upper bound on registry entries, regardless of aggressiveness.
const MAX_CACHE_ENTRIES: usize = 1024;
/// Entries gained per unit of cache aggressiveness.
const MAX_ENTRIES_PER_AGGRESSIVENESS: usize = 32;
/// Pixels one unit of aggressiveness is willing to cache.
const PIXELS_PER_UNIT_OF_AGGRESSIVENESS: u64 = 256 * 256;
/// Share of the size budget below which allocation happens eagerly.
const EAGER_ALLOCATION_FRIENDLINESS: f64 = 0.1;
/// Longest possible warm-up countdown.
const MAX_CACHE_HIT_COUNT: u64 = 12;

const DEFAULT_AGGRESSIVENESS: u64 = 4;

fn cache_aggressiveness() -> u64 {
    std::env::var("GLAZE_CACHE_AGGRESSIVENESS")
        .ok()
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(DEFAULT_AGGRESSIVENESS)
}

fn cache_cap() -> usize {
    MAX_CACHE_ENTRIES.min(MAX_ENTRIES_PER_AGGRESSIVENESS * cache_aggressiveness() as usize)
}

struct RegistryEntry {
    layer: StyleLayer,
    key: Weak<LayerRenderConf>,
    image: Arc<CachedImage>,
}

static REGISTRY: LazyLock<Mutex<HashMap<u64, Vec<RegistryEntry>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

/// Live entry count. Dead entries are expunged while counting, so any
/// bucket's buffers are reclaimed as soon as some validate pass runs,
/// not only when the same bucket is revisited.
fn registry_len() -> usize {
    let mut registry = REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);
    registry.retain(|_, bucket| {
        bucket.retain(|entry| entry.key.strong_count() > 0);
        !bucket.is_empty()
    });
    registry.values().map(Vec::len).sum()
}

struct KeySlot {
    weak: Weak<LayerRenderConf>,
    hash: u64,
}

struct ImageState {
    pixels: Option<Pixmap>,
    rendered: bool,
    hits_until_allocation: i64,
}

/// A raster buffer shared between all [`LayerCache`]s whose render state is
/// equal. The pixel data is allocated lazily, after the warm-up countdown
/// has run out, to avoid allocating for short-lived configurations (such
/// as animation frames).
pub struct CachedImage {
    width: u32,
    height: u32,
    key: Mutex<KeySlot>,
    state: Mutex<ImageState>,
}

impl CachedImage {
    fn new(size: Size, key: &Arc<LayerRenderConf>, hits_until_allocation: i64) -> Self {
        Self {
            width: (size.width.round() as u32).max(1),
            height: (size.height.round() as u32).max(1),
            key: Mutex::new(KeySlot {
                weak: Arc::downgrade(key),
                hash: structural_hash(key),
            }),
            state: Mutex::new(ImageState {
                pixels: None,
                rendered: false,
                hits_until_allocation,
            }),
        }
    }

    /// The strong key this image is registered under. The registry entry
    /// stays alive only while someone holds this key strongly, so every
    /// user of the image must retain the returned state, not its own copy.
    /// If the original key died between lookups, `fallback` is re-anchored
    /// as the new key.
    fn key_or_anchor(&self, fallback: &Arc<LayerRenderConf>) -> Arc<LayerRenderConf> {
        let mut slot = self.key.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.weak.upgrade() {
            Some(key) => key,
            None => {
                slot.weak = Arc::downgrade(fallback);
                slot.hash = structural_hash(fallback);
                fallback.clone()
            }
        }
    }

    fn update_hits_until_allocation(&self, latest: i64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.hits_until_allocation < 0 {
            state.hits_until_allocation = latest;
        }
    }

    pub fn is_rendered(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .rendered
    }

    /// Rebinds a no-longer-referenced image to a new key for reuse. The
    /// already-allocated pixels are cleared in place; a freshly allocated
    /// buffer never needs this because allocation zeroes it.
    fn recycle_for(&self, key: &Arc<LayerRenderConf>, hits_until_allocation: i64) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(pixels) = &mut state.pixels {
            pixels.clear();
        }
        state.rendered = false;
        state.hits_until_allocation = hits_until_allocation;
        drop(state);
        let mut slot = self.key.lock().unwrap_or_else(PoisonError::into_inner);
        slot.weak = Arc::downgrade(key);
        slot.hash = structural_hash(key);
    }
}

fn structural_hash(key: &Arc<LayerRenderConf>) -> u64 {
    use std::hash::{Hash, Hasher};
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    key.hash(&mut hasher);
    hasher.finish()
}

/// Looks up (or registers) the shared image for `state` on `layer`. Equal
/// render states on *different* layers get separate buffers, since their
/// rasterized content differs. `recycle` is the caller's just-invalidated
/// image; it is reused in place when nobody else references it and its
/// dimensions still fit.
fn allocate_or_get(
    layer: StyleLayer,
    state: &Arc<LayerRenderConf>,
    hits_until_allocation: i64,
    recycle: Option<Arc<CachedImage>>,
) -> (Arc<LayerRenderConf>, Arc<CachedImage>) {
    let size = state.box_model().size;
    let hash = structural_hash(state);
    let mut registry = REGISTRY.lock().unwrap_or_else(PoisonError::into_inner);

    let bucket = registry.entry(hash).or_default();
    bucket.retain(|entry| entry.key.strong_count() > 0);
    for entry in bucket.iter() {
        if entry.layer == layer
            && let Some(existing) = entry.key.upgrade()
            && existing == *state
        {
            // Adopt the key already registered so the weak entry stays
            // anchored by our strong reference.
            let image = entry.image.clone();
            return (image.key_or_anchor(state), image);
        }
    }

    let image = match recycle {
        Some(old)
            if old.width == (size.width.round() as u32).max(1)
                && old.height == (size.height.round() as u32).max(1) =>
        {
            let old_hash = old
                .key
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .hash;
            if let Some(old_bucket) = registry.get_mut(&old_hash) {
                old_bucket.retain(|entry| !Arc::ptr_eq(&entry.image, &old));
            }
            // Only the caller holds it now; safe to clear and rebind.
            if Arc::strong_count(&old) == 1 {
                old.recycle_for(state, hits_until_allocation);
                old
            } else {
                Arc::new(CachedImage::new(size, state, hits_until_allocation))
            }
        }
        _ => Arc::new(CachedImage::new(size, state, hits_until_allocation)),
    };

    registry.entry(hash).or_default().push(RegistryEntry {
        layer,
        key: Arc::downgrade(state),
        image: image.clone(),
    });
    (state.clone(), image)
}

/// The per-component, per-layer cache client. Call [`LayerCache::validate`]
/// with the previous and current component snapshot, then
/// [`LayerCache::paint`], once per paint cycle, in that order.
pub struct LayerCache {
    layer: StyleLayer,
    local: Option<Arc<CachedImage>>,
    render_state: Arc<LayerRenderConf>,
    hits_until_allocation: i64,
    initialized: bool,
}

impl LayerCache {
    pub fn new(layer: StyleLayer) -> Self {
        Self {
            layer,
            local: None,
            render_state: LayerRenderConf::none(),
            hits_until_allocation: -1,
            initialized: false,
        }
    }

    pub fn layer(&self) -> StyleLayer {
        self.layer
    }

    pub fn render_state(&self) -> &Arc<LayerRenderConf> {
        &self.render_state
    }

    pub fn has_buffer(&self) -> bool {
        self.local.is_some()
    }

    fn free_local(&mut self) -> Option<Arc<CachedImage>> {
        self.hits_until_allocation = -1;
        self.initialized = false;
        self.local.take()
    }

    /// Decides whether the cached buffer survives the `old -> new` snapshot
    /// transition, and looks up or allocates a buffer for the new state if
    /// not. Must be called before [`LayerCache::paint`] on every cycle.
    pub fn validate(&mut self, old: &Arc<ComponentConf>, new: &Arc<ComponentConf>) {
        if new.current_bounds().has_width(0.0) || new.current_bounds().has_height(0.0) {
            self.render_state = LayerRenderConf::none();
            return;
        }

        let old_state = old.render_conf_for(self.layer);
        let new_state = new.render_conf_for(self.layer);

        let validation_needed = !self.initialized || old_state != new_state;
        self.initialized = true;

        if validation_needed {
            self.hits_until_allocation = caching_makes_sense_for(self.layer, &new_state);
            if let Some(local) = &self.local {
                local.update_hits_until_allocation(self.hits_until_allocation);
            }
        }

        if self.hits_until_allocation < 0 {
            self.free_local();
            self.initialized = true;
            self.render_state = new_state;
            return;
        }

        let hits = self.hits_until_allocation;

        let mut recycle = None;
        let mut new_buffer_needed = false;
        match &self.local {
            None => new_buffer_needed = true,
            Some(_) => {
                if old_state != new_state {
                    recycle = self.free_local();
                    self.initialized = true;
                    self.hits_until_allocation = hits;
                    new_buffer_needed = true;
                }
            }
        }

        if registry_len() > cache_cap() {
            self.render_state = new_state;
            return;
        }

        if new_buffer_needed {
            let (key, image) = allocate_or_get(self.layer, &new_state, hits, recycle);
            self.render_state = key;
            self.local = Some(image);
        } else if let Some(image) = &self.local {
            // Keep holding the key the registry entry is anchored by.
            self.render_state = image.key_or_anchor(&new_state);
        } else {
            self.render_state = new_state;
        }
    }

    /// Paints this layer onto `ctx`, using the cached buffer when possible.
    ///
    /// Rasterizer failures are logged and neutralized here; at worst the
    /// layer's custom content is missing from this frame.
    pub fn paint<F>(&mut self, ctx: &mut DrawContext<'_>, mut rasterizer: F)
    where
        F: FnMut(&Arc<LayerRenderConf>, &mut DrawContext<'_>) -> GlazeResult<()>,
    {
        let size = self.render_state.box_model().size;
        if !size.has_positive_width() || !size.has_positive_height() {
            return;
        }

        if self.hits_until_allocation < 0 {
            // Caching was judged not worthwhile; render straight through.
            if let Err(error) = rasterizer(&self.render_state, ctx) {
                tracing::warn!(%error, layer = ?self.layer, "layer rasterizer failed");
            }
            return;
        }

        let Some(image) = self.local.clone() else {
            return;
        };

        let mut state = image.state.lock().unwrap_or_else(PoisonError::into_inner);

        if !state.rendered {
            if state.hits_until_allocation > 0 {
                // Not warmed up yet; render directly and count the hit.
                state.hits_until_allocation -= 1;
                drop(state);
                if let Err(error) = rasterizer(&self.render_state, ctx) {
                    tracing::warn!(%error, layer = ?self.layer, "layer rasterizer failed");
                }
                return;
            }
            if state.pixels.is_none() {
                match Pixmap::new(image.width, image.height) {
                    Ok(pixels) => state.pixels = Some(pixels),
                    Err(error) => {
                        // Degenerate allocation: fall back to direct
                        // rendering for this frame.
                        tracing::debug!(%error, "buffer allocation failed");
                        drop(state);
                        if let Err(error) = rasterizer(&self.render_state, ctx) {
                            tracing::warn!(%error, layer = ?self.layer, "layer rasterizer failed");
                        }
                        return;
                    }
                }
            }
            // Render with the lock released, so a rasterizer that paints
            // through another cache sharing this image cannot deadlock.
            let mut pixels = state.pixels.take();
            drop(state);
            if let Some(buffer) = pixels.as_mut() {
                let mut buffer_ctx = ctx.buffer_context(buffer);
                if let Err(error) = rasterizer(&self.render_state, &mut buffer_ctx) {
                    tracing::warn!(%error, layer = ?self.layer, "layer rasterizer failed");
                }
            }
            state = image.state.lock().unwrap_or_else(PoisonError::into_inner);
            if state.pixels.is_none() {
                state.pixels = pixels;
                state.rendered = true;
            }
        }

        if let Some(pixels) = &state.pixels {
            ctx.draw_pixmap(pixels, 0, 0);
        }
    }
}

/// Scores whether caching pays off for `state` on `layer`.
///
/// Returns the number of cache hits to wait before allocating a buffer:
/// `0` for eager allocation, a positive warm-up count for larger buffers,
/// or `-1` when caching makes no sense at all (nothing expensive to cache,
/// degenerate size, or a buffer too large for the budget).
fn caching_makes_sense_for(layer: StyleLayer, state: &Arc<LayerRenderConf>) -> i64 {
    let size = state.box_model().size;
    if !size.has_positive_width() || !size.has_positive_height() {
        return -1;
    }

    let mut heavy_style_count: u64 = 0;

    for gradient in state.layer().gradients().sorted_by_names() {
        if gradient.is_visible() {
            heavy_style_count += 1;
        }
    }
    for shadow in state.layer().shadows().sorted_by_names() {
        if shadow.is_visible() {
            heavy_style_count += 1;
        }
    }
    for image in state.layer().images().sorted_by_names() {
        if image.is_visible() {
            heavy_style_count += 1;
        }
    }

    let box_model = state.box_model();
    let is_rounded = box_model.has_any_non_zero_arcs();

    if layer == StyleLayer::Border
        && box_model.has_visible_border_widths()
        && state.colors().border.is_visible()
    {
        heavy_style_count += 1;
    }
    if layer == StyleLayer::Background {
        let rounded_or_has_margin = is_rounded || !box_model.margin.is_none();
        if rounded_or_has_margin {
            if state.colors().background.is_some_and(|c| c.is_visible()) {
                heavy_style_count += 1;
            }
            if state.colors().foundation.is_some_and(|c| c.is_visible()) {
                heavy_style_count += 1;
            }
        }
    }

    if heavy_style_count < 1 {
        return -1;
    }

    let max_size_limit = cache_aggressiveness() * PIXELS_PER_UNIT_OF_AGGRESSIVENESS;
    let eager_allocation_limit = (max_size_limit as f64 * EAGER_ALLOCATION_FRIENDLINESS) as u64;
    let cache_hit_count_limit =
        (max_size_limit as f64 * (1.0 - EAGER_ALLOCATION_FRIENDLINESS)) as u64;

    let pixel_count = size.pixel_count();
    // Heavier styles get cached more easily.
    let score = pixel_count / heavy_style_count.min(5);

    if score > max_size_limit {
        -1
    } else if score <= eager_allocation_limit {
        0
    } else {
        1 + ((score - eager_allocation_limit) / (cache_hit_count_limit / MAX_CACHE_HIT_COUNT).max(1))
            as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::{ColorConf, Rgba};
    use crate::geom::Outline;
    use crate::render_conf::LayerRenderConf;
    use crate::style_conf::{GradientConf, NamedConfs, StyleLayerConf};

    fn gradient_state(width: f32, height: f32) -> Arc<LayerRenderConf> {
        let layer = StyleLayerConf::of(
            NamedConfs::none(),
            NamedConfs::of(
                "default",
                GradientConf {
                    colors: vec![Rgba::RED, Rgba::BLUE],
                    ..GradientConf::none()
                },
            ),
            NamedConfs::none(),
        );
        LayerRenderConf::of(
            crate::box_model::BoxModelConf::none()
                .with_size(crate::geom::Size::of(width, height)),
            ColorConf::none(),
            layer,
        )
    }

    #[test]
    fn dead_registry_entries_are_expunged_by_any_count() {
        let state = gradient_state(96.0, 96.0);
        let hash = structural_hash(&state);
        let (key, image) = allocate_or_get(StyleLayer::Background, &state, 0, None);
        drop((key, image, state));

        // Counting the registry doubles as the expunge pass.
        let _ = registry_len();

        let registry = REGISTRY.lock().unwrap();
        let dead = registry.get(&hash).map_or(0, |bucket| {
            bucket
                .iter()
                .filter(|entry| entry.key.strong_count() == 0)
                .count()
        });
        assert_eq!(dead, 0);
    }

    #[test]
    fn equal_states_on_different_layers_get_separate_buffers() {
        let state = gradient_state(64.0, 64.0);
        let (key_a, a) = allocate_or_get(StyleLayer::Background, &state, 0, None);
        let (key_b, b) = allocate_or_get(StyleLayer::Content, &state, 0, None);
        assert!(!Arc::ptr_eq(&a, &b));

        let (_key, a_again) = allocate_or_get(StyleLayer::Background, &state, 0, None);
        assert!(Arc::ptr_eq(&a, &a_again));
        drop((key_a, key_b));
    }

    #[test]
    fn plain_state_is_not_worth_caching() {
        let state = LayerRenderConf::of(
            crate::box_model::BoxModelConf::none()
                .with_size(crate::geom::Size::of(100.0, 100.0)),
            ColorConf::none(),
            StyleLayerConf::empty(),
        );
        assert_eq!(
            caching_makes_sense_for(StyleLayer::Background, &state),
            -1
        );
    }

    #[test]
    fn small_gradient_allocates_eagerly() {
        let state = gradient_state(100.0, 50.0);
        assert_eq!(caching_makes_sense_for(StyleLayer::Background, &state), 0);
    }

    #[test]
    fn huge_buffer_is_rejected() {
        let state = gradient_state(4096.0, 4096.0);
        assert_eq!(
            caching_makes_sense_for(StyleLayer::Background, &state),
            -1
        );
    }

    #[test]
    fn mid_sized_buffer_gets_a_warmup_countdown() {
        let state = gradient_state(512.0, 512.0);
        let hits = caching_makes_sense_for(StyleLayer::Background, &state);
        assert!(hits > 0, "expected warm-up countdown, got {hits}");
    }

    #[test]
    fn flat_background_without_rounding_is_cheap() {
        let state = LayerRenderConf::of(
            crate::box_model::BoxModelConf::none()
                .with_size(crate::geom::Size::of(100.0, 100.0)),
            ColorConf::none().with_background(Some(Rgba::WHITE)),
            StyleLayerConf::empty(),
        );
        // A plain rectangular fill is cheaper than a blit; don't cache it.
        assert_eq!(
            caching_makes_sense_for(StyleLayer::Background, &state),
            -1
        );
    }

    #[test]
    fn rounded_background_is_heavy() {
        let layer_conf = LayerRenderConf::of(
            crate::box_model::BoxModelConf::of(
                crate::geom::CornerArc::of(8.0, 8.0),
                crate::geom::CornerArc::of(8.0, 8.0),
                crate::geom::CornerArc::of(8.0, 8.0),
                crate::geom::CornerArc::of(8.0, 8.0),
                Outline::none(),
                Outline::none(),
                Outline::none(),
                Outline::none(),
                crate::geom::Size::of(100.0, 50.0),
            ),
            ColorConf::none().with_background(Some(Rgba::WHITE)),
            StyleLayerConf::empty(),
        );
        assert_eq!(
            caching_makes_sense_for(StyleLayer::Background, &layer_conf),
            0
        );
    }
}
