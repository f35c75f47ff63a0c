//! The composite snapshot model: a whole-widget [`StyleConf`], the
//! per-paint [`ComponentConf`] snapshot, and the per-layer
//! [`LayerRenderConf`] used as the raster-cache key.
//!
//! Every type here is an immutable value with structural equality, a
//! canonical none instance, and constructors that collapse all-default
//! aggregates onto that instance. Composite nodes are built from
//! already-canonicalized children.

use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock, OnceLock};

use crate::box_model::BoxModelConf;
use crate::color::{BorderColors, ColorConf, Rgba};
use crate::geom::{Bounds, CornerArc, Outline, Size};
use crate::style_conf::{StyleLayer, StyleLayerConf};

/// Border geometry of a widget: corner arcs, edge widths, margin, padding.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BorderConf {
    pub top_left_arc: CornerArc,
    pub top_right_arc: CornerArc,
    pub bottom_left_arc: CornerArc,
    pub bottom_right_arc: CornerArc,
    pub widths: Outline,
    pub margin: Outline,
    pub padding: Outline,
}

impl BorderConf {
    pub const fn none() -> Self {
        Self {
            top_left_arc: CornerArc::none(),
            top_right_arc: CornerArc::none(),
            bottom_left_arc: CornerArc::none(),
            bottom_right_arc: CornerArc::none(),
            widths: Outline::none(),
            margin: Outline::none(),
            padding: Outline::none(),
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::none()
    }

    pub fn with_widths(self, widths: Outline) -> Self {
        Self { widths, ..self }
    }

    pub fn with_margin(self, margin: Outline) -> Self {
        Self { margin, ..self }
    }

    pub fn with_arcs(self, arc: CornerArc) -> Self {
        Self {
            top_left_arc: arc,
            top_right_arc: arc,
            bottom_left_arc: arc,
            bottom_right_arc: arc,
            ..self
        }
    }
}

/// The four per-layer style sets of a widget.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StyleLayers {
    pub background: Arc<StyleLayerConf>,
    pub content: Arc<StyleLayerConf>,
    pub border: Arc<StyleLayerConf>,
    pub foreground: Arc<StyleLayerConf>,
}

impl StyleLayers {
    pub fn empty() -> Self {
        Self {
            background: StyleLayerConf::empty(),
            content: StyleLayerConf::empty(),
            border: StyleLayerConf::empty(),
            foreground: StyleLayerConf::empty(),
        }
    }

    pub fn get(&self, layer: StyleLayer) -> &Arc<StyleLayerConf> {
        match layer {
            StyleLayer::Background => &self.background,
            StyleLayer::Content => &self.content,
            StyleLayer::Border => &self.border,
            StyleLayer::Foreground => &self.foreground,
        }
    }

    pub fn with(&self, layer: StyleLayer, conf: Arc<StyleLayerConf>) -> Self {
        let mut layers = self.clone();
        match layer {
            StyleLayer::Background => layers.background = conf,
            StyleLayer::Content => layers.content = conf,
            StyleLayer::Border => layers.border = conf,
            StyleLayer::Foreground => layers.foreground = conf,
        }
        layers
    }

    fn simplify(&self) -> Self {
        Self {
            background: self.background.simplify(),
            content: self.content.simplify(),
            border: self.border.simplify(),
            foreground: self.foreground.simplify(),
        }
    }

    fn is_empty(&self) -> bool {
        self.background.is_empty()
            && self.content.is_empty()
            && self.border.is_empty()
            && self.foreground.is_empty()
    }
}

static NO_STYLE: LazyLock<Arc<StyleConf>> = LazyLock::new(|| {
    Arc::new(StyleConf {
        border: BorderConf::none(),
        colors: ColorConf::none(),
        layers: StyleLayers::empty(),
        hash: OnceLock::new(),
    })
});

/// The complete visual style of one widget.
#[derive(Debug)]
pub struct StyleConf {
    border: BorderConf,
    colors: ColorConf,
    layers: StyleLayers,
    hash: OnceLock<u64>,
}

impl StyleConf {
    pub fn none() -> Arc<Self> {
        NO_STYLE.clone()
    }

    pub fn of(border: BorderConf, colors: ColorConf, layers: StyleLayers) -> Arc<Self> {
        if border.is_none() && colors.is_none() && layers.is_empty() {
            return NO_STYLE.clone();
        }
        Arc::new(Self {
            border,
            colors,
            layers,
            hash: OnceLock::new(),
        })
    }

    pub fn border(&self) -> &BorderConf {
        &self.border
    }

    pub fn colors(&self) -> &ColorConf {
        &self.colors
    }

    pub fn layers(&self) -> &StyleLayers {
        &self.layers
    }

    pub fn is_none(&self) -> bool {
        *self == **NO_STYLE
    }

    pub fn with_border(self: &Arc<Self>, border: BorderConf) -> Arc<Self> {
        if border == self.border {
            return self.clone();
        }
        Self::of(border, self.colors, self.layers.clone())
    }

    pub fn with_background_color(self: &Arc<Self>, color: Option<Rgba>) -> Arc<Self> {
        self.with_colors(self.colors.with_background(color))
    }

    pub fn with_foundation_color(self: &Arc<Self>, color: Option<Rgba>) -> Arc<Self> {
        self.with_colors(self.colors.with_foundation(color))
    }

    pub fn with_border_colors(self: &Arc<Self>, border: BorderColors) -> Arc<Self> {
        self.with_colors(self.colors.with_border(border))
    }

    pub fn with_colors(self: &Arc<Self>, colors: ColorConf) -> Arc<Self> {
        if colors == self.colors {
            return self.clone();
        }
        Self::of(self.border, colors, self.layers.clone())
    }

    pub fn with_layer(self: &Arc<Self>, layer: StyleLayer, conf: Arc<StyleLayerConf>) -> Arc<Self> {
        if Arc::ptr_eq(self.layers.get(layer), &conf) || *self.layers.get(layer) == conf {
            return self.clone();
        }
        Self::of(self.border, self.colors, self.layers.with(layer, conf))
    }

    /// Recursively canonicalizes children, then collapses an all-default
    /// style onto the shared none instance.
    pub fn simplify(self: &Arc<Self>) -> Arc<Self> {
        let layers = self.layers.simplify();
        if self.border.is_none() && self.colors.is_none() && layers.is_empty() {
            return NO_STYLE.clone();
        }
        if layers == self.layers {
            return self.clone();
        }
        Self::of(self.border, self.colors, layers)
    }

    fn structural_hash(&self) -> u64 {
        *self.hash.get_or_init(|| {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            self.border.hash(&mut hasher);
            self.colors.hash(&mut hasher);
            self.layers.hash(&mut hasher);
            hasher.finish()
        })
    }
}

impl PartialEq for StyleConf {
    fn eq(&self, other: &Self) -> bool {
        if self.structural_hash() != other.structural_hash() {
            return false;
        }
        self.border == other.border && self.colors == other.colors && self.layers == other.layers
    }
}

impl Eq for StyleConf {}

impl Hash for StyleConf {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.structural_hash());
    }
}

static NO_COMPONENT: LazyLock<Arc<ComponentConf>> = LazyLock::new(|| {
    Arc::new(ComponentConf {
        style: StyleConf::none(),
        bounds: Bounds::none(),
        margin_correction: Outline::none(),
        render: OnceLock::new(),
        hash: OnceLock::new(),
    })
});

/// An immutable snapshot of everything a paint cycle needs to know about
/// one widget: its style, its current bounds and the margin correction
/// applied when deriving paintable areas.
#[derive(Debug)]
pub struct ComponentConf {
    style: Arc<StyleConf>,
    bounds: Bounds,
    margin_correction: Outline,
    render: OnceLock<Arc<RenderConf>>,
    hash: OnceLock<u64>,
}

impl ComponentConf {
    pub fn none() -> Arc<Self> {
        NO_COMPONENT.clone()
    }

    pub fn of(style: Arc<StyleConf>, bounds: Bounds, margin_correction: Outline) -> Arc<Self> {
        if style.is_none() && bounds == Bounds::none() && margin_correction.is_none() {
            return NO_COMPONENT.clone();
        }
        Arc::new(Self {
            style,
            bounds,
            margin_correction,
            render: OnceLock::new(),
            hash: OnceLock::new(),
        })
    }

    pub fn style(&self) -> &Arc<StyleConf> {
        &self.style
    }

    pub fn current_bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn margin_correction(&self) -> Outline {
        self.margin_correction
    }

    pub fn with_size(self: &Arc<Self>, width: f32, height: f32) -> Arc<Self> {
        let bounds = self.bounds.with_size(width, height);
        if bounds == self.bounds {
            return self.clone();
        }
        Self::of(self.style.clone(), bounds, self.margin_correction)
    }

    /// The per-layer render state derived from this snapshot. Derived once
    /// and reused; the snapshot is immutable, so this is always safe.
    pub fn render_conf_for(&self, layer: StyleLayer) -> Arc<LayerRenderConf> {
        let render = self
            .render
            .get_or_init(|| Arc::new(RenderConf::of(self)));
        render.layer(layer).clone()
    }

    fn structural_hash(&self) -> u64 {
        *self.hash.get_or_init(|| {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            self.style.hash(&mut hasher);
            self.bounds.hash(&mut hasher);
            self.margin_correction.hash(&mut hasher);
            hasher.finish()
        })
    }
}

impl PartialEq for ComponentConf {
    fn eq(&self, other: &Self) -> bool {
        if self.structural_hash() != other.structural_hash() {
            return false;
        }
        self.style == other.style
            && self.bounds == other.bounds
            && self.margin_correction == other.margin_correction
    }
}

impl Eq for ComponentConf {}

impl Hash for ComponentConf {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.structural_hash());
    }
}

/// The four per-layer render states of one component snapshot.
#[derive(Debug, PartialEq, Eq)]
pub struct RenderConf {
    background: Arc<LayerRenderConf>,
    content: Arc<LayerRenderConf>,
    border: Arc<LayerRenderConf>,
    foreground: Arc<LayerRenderConf>,
}

impl RenderConf {
    pub fn of(conf: &ComponentConf) -> Self {
        Self {
            background: LayerRenderConf::for_layer(StyleLayer::Background, conf),
            content: LayerRenderConf::for_layer(StyleLayer::Content, conf),
            border: LayerRenderConf::for_layer(StyleLayer::Border, conf),
            foreground: LayerRenderConf::for_layer(StyleLayer::Foreground, conf),
        }
    }

    pub fn layer(&self, layer: StyleLayer) -> &Arc<LayerRenderConf> {
        match layer {
            StyleLayer::Background => &self.background,
            StyleLayer::Content => &self.content,
            StyleLayer::Border => &self.border,
            StyleLayer::Foreground => &self.foreground,
        }
    }
}

static NO_LAYER_RENDER: LazyLock<Arc<LayerRenderConf>> = LazyLock::new(|| {
    Arc::new(LayerRenderConf {
        box_model: BoxModelConf::none(),
        colors: ColorConf::none(),
        layer: StyleLayerConf::empty(),
        hash: OnceLock::new(),
    })
});

/// Everything needed to rasterize one layer of one component, and nothing
/// more. Deeply immutable, so it doubles as the raster-buffer cache key.
#[derive(Debug)]
pub struct LayerRenderConf {
    box_model: Arc<BoxModelConf>,
    colors: ColorConf,
    layer: Arc<StyleLayerConf>,
    hash: OnceLock<u64>,
}

impl LayerRenderConf {
    pub fn none() -> Arc<Self> {
        NO_LAYER_RENDER.clone()
    }

    pub fn of(
        box_model: Arc<BoxModelConf>,
        colors: ColorConf,
        layer: Arc<StyleLayerConf>,
    ) -> Arc<Self> {
        let box_model = box_model.simplify();
        let layer = layer.simplify();
        if box_model.is_none() && colors.is_none() && layer.is_empty() {
            return NO_LAYER_RENDER.clone();
        }
        crate::pool::intern(Arc::new(Self {
            box_model,
            colors,
            layer,
            hash: OnceLock::new(),
        }))
    }

    pub fn for_layer(layer: StyleLayer, conf: &ComponentConf) -> Arc<Self> {
        let style = conf.style();
        let border = style.border();
        let box_model = BoxModelConf::of(
            border.top_left_arc,
            border.top_right_arc,
            border.bottom_left_arc,
            border.bottom_right_arc,
            border.widths,
            border.margin,
            border.padding,
            conf.margin_correction(),
            conf.current_bounds().size,
        );
        Self::of(box_model, *style.colors(), style.layers().get(layer).clone())
    }

    pub fn box_model(&self) -> &Arc<BoxModelConf> {
        &self.box_model
    }

    pub fn colors(&self) -> &ColorConf {
        &self.colors
    }

    pub fn layer(&self) -> &Arc<StyleLayerConf> {
        &self.layer
    }

    pub fn is_none(&self) -> bool {
        *self == **NO_LAYER_RENDER
    }

    fn structural_hash(&self) -> u64 {
        *self.hash.get_or_init(|| {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            self.box_model.hash(&mut hasher);
            self.colors.hash(&mut hasher);
            self.layer.hash(&mut hasher);
            hasher.finish()
        })
    }
}

impl PartialEq for LayerRenderConf {
    fn eq(&self, other: &Self) -> bool {
        if self.structural_hash() != other.structural_hash() {
            return false;
        }
        self.box_model == other.box_model
            && self.colors == other.colors
            && self.layer == other.layer
    }
}

impl Eq for LayerRenderConf {}

impl Hash for LayerRenderConf {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.structural_hash());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_style_collapses_to_none() {
        let style = StyleConf::of(BorderConf::none(), ColorConf::none(), StyleLayers::empty());
        assert!(Arc::ptr_eq(&style, &StyleConf::none()));
    }

    #[test]
    fn with_transitions_are_noops_for_equal_values() {
        let style = StyleConf::none().with_background_color(Some(Rgba::RED));
        let same = style.with_background_color(Some(Rgba::RED));
        assert!(Arc::ptr_eq(&style, &same));
        let changed = style.with_background_color(Some(Rgba::BLUE));
        assert!(!Arc::ptr_eq(&style, &changed));
    }

    #[test]
    fn layer_render_conf_of_empty_parts_is_none() {
        let conf = LayerRenderConf::of(
            BoxModelConf::none(),
            ColorConf::none(),
            StyleLayerConf::empty(),
        );
        assert!(Arc::ptr_eq(&conf, &LayerRenderConf::none()));
    }

    #[test]
    fn equal_snapshots_produce_equal_layer_states() {
        let style = StyleConf::none().with_background_color(Some(Rgba::GREEN));
        let a = ComponentConf::of(style.clone(), Bounds::of(0.0, 0.0, 20.0, 10.0), Outline::none());
        let b = ComponentConf::of(style, Bounds::of(0.0, 0.0, 20.0, 10.0), Outline::none());
        assert_eq!(a, b);
        let la = a.render_conf_for(StyleLayer::Background);
        let lb = b.render_conf_for(StyleLayer::Background);
        assert_eq!(la, lb);
        // Interning collapses the two equal states onto one instance.
        assert!(Arc::ptr_eq(&la, &lb));
    }
}
