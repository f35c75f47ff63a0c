#![forbid(unsafe_code)]

pub mod areas;
pub mod box_model;
pub mod color;
pub mod engine;
pub mod error;
pub mod geom;
pub mod layer_cache;
pub mod lazy;
pub mod pool;
pub mod render_conf;
pub mod style_conf;
pub mod surface;

pub use areas::{ComponentArea, ComponentAreas};
pub use box_model::BoxModelConf;
pub use color::{BorderColors, ColorConf, Rgba};
pub use engine::StyleEngine;
pub use error::{GlazeError, GlazeResult};
pub use geom::{Bounds, CornerArc, Outline, Size};
pub use layer_cache::LayerCache;
pub use lazy::{CacheCapability, LazyCache};
pub use pool::{Pool, Pooled, intern};
pub use render_conf::{
    BorderConf, ComponentConf, LayerRenderConf, RenderConf, StyleConf, StyleLayers,
};
pub use style_conf::{
    GradientConf, GradientSpan, ImageConf, ImageSource, NamedConfs, ShadowConf, StyleLayer,
    StyleLayerConf,
};
pub use surface::{DrawContext, Pixmap, RenderHints};
