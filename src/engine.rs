//! The per-component entry point of the styling cache: one [`StyleEngine`]
//! per widget, driven as `validate(new_snapshot)` then `paint_layer(..)`
//! for each layer, once per paint cycle, in that order.

use std::sync::Arc;

use crate::areas::ComponentAreas;
use crate::box_model::BoxModelConf;
use crate::error::GlazeResult;
use crate::layer_cache::LayerCache;
use crate::render_conf::{ComponentConf, LayerRenderConf};
use crate::style_conf::StyleLayer;
use crate::surface::DrawContext;

/// Holds the current component snapshot plus the per-layer raster caches
/// and the derived-geometry cache of one widget.
pub struct StyleEngine {
    conf: Arc<ComponentConf>,
    areas: ComponentAreas,
    caches: [LayerCache; 4],
}

impl StyleEngine {
    pub fn new() -> Self {
        Self {
            conf: ComponentConf::none(),
            areas: ComponentAreas::of(&BoxModelConf::none()),
            caches: StyleLayer::ALL.map(LayerCache::new),
        }
    }

    pub fn component_conf(&self) -> &Arc<ComponentConf> {
        &self.conf
    }

    pub fn areas(&self) -> &ComponentAreas {
        &self.areas
    }

    pub fn layer_cache(&self, layer: StyleLayer) -> &LayerCache {
        &self.caches[layer.index()]
    }

    /// Installs `new` as the current snapshot and revalidates every layer
    /// cache and the derived geometry against the previous one.
    pub fn validate(&mut self, new: Arc<ComponentConf>) {
        let old = std::mem::replace(&mut self.conf, new.clone());

        let old_box = old
            .render_conf_for(StyleLayer::Background)
            .box_model()
            .clone();
        let new_box = new
            .render_conf_for(StyleLayer::Background)
            .box_model()
            .clone();
        self.areas = self.areas.validate(&old_box, &new_box);

        for cache in &mut self.caches {
            cache.validate(&old, &new);
        }
    }

    /// Paints one layer of the current snapshot onto `ctx`, delegating to
    /// `rasterizer` only when the cached buffer cannot be reused.
    pub fn paint_layer<F>(&mut self, layer: StyleLayer, ctx: &mut DrawContext<'_>, rasterizer: F)
    where
        F: FnMut(&Arc<LayerRenderConf>, &mut DrawContext<'_>) -> GlazeResult<()>,
    {
        self.caches[layer.index()].paint(ctx, rasterizer);
    }
}

impl Default for StyleEngine {
    fn default() -> Self {
        Self::new()
    }
}
