//! Per-layer style descriptors: shadows, gradients and images, grouped
//! into one [`StyleLayerConf`] per visual layer.
//!
//! Like the rest of the config model these are immutable values compared
//! structurally, with a canonical empty instance per type. [`StyleLayerConf`]
//! is the composite node here: it is `Arc`-shared, collapses to a single
//! shared empty instance, and memoizes its structural hash.

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock, OnceLock};

use crate::color::Rgba;
use crate::surface::Pixmap;

/// One independently cacheable visual pass of a widget.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum StyleLayer {
    Background,
    Content,
    Border,
    Foreground,
}

impl StyleLayer {
    pub const ALL: [StyleLayer; 4] = [
        StyleLayer::Background,
        StyleLayer::Content,
        StyleLayer::Border,
        StyleLayer::Foreground,
    ];

    pub const fn index(self) -> usize {
        match self {
            StyleLayer::Background => 0,
            StyleLayer::Content => 1,
            StyleLayer::Border => 2,
            StyleLayer::Foreground => 3,
        }
    }
}

/// A box shadow (or inset shadow) of one layer.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct ShadowConf {
    pub horizontal_offset: f32,
    pub vertical_offset: f32,
    pub blur_radius: f32,
    pub spread_radius: f32,
    pub color: Option<Rgba>,
    pub is_inset: bool,
}

impl ShadowConf {
    pub const fn none() -> Self {
        Self {
            horizontal_offset: 0.0,
            vertical_offset: 0.0,
            blur_radius: 0.0,
            spread_radius: 0.0,
            color: None,
            is_inset: false,
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::none()
    }

    pub fn is_visible(&self) -> bool {
        self.color.is_some_and(|c| c.is_visible())
    }

    pub fn scale(&self, factor: f32) -> Self {
        Self {
            horizontal_offset: self.horizontal_offset * factor,
            vertical_offset: self.vertical_offset * factor,
            blur_radius: self.blur_radius * factor,
            spread_radius: self.spread_radius * factor,
            ..*self
        }
    }
}

impl Default for ShadowConf {
    fn default() -> Self {
        Self::none()
    }
}

impl PartialEq for ShadowConf {
    fn eq(&self, other: &Self) -> bool {
        self.horizontal_offset.to_bits() == other.horizontal_offset.to_bits()
            && self.vertical_offset.to_bits() == other.vertical_offset.to_bits()
            && self.blur_radius.to_bits() == other.blur_radius.to_bits()
            && self.spread_radius.to_bits() == other.spread_radius.to_bits()
            && self.color == other.color
            && self.is_inset == other.is_inset
    }
}

impl Eq for ShadowConf {}

impl Hash for ShadowConf {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.horizontal_offset.to_bits().hash(state);
        self.vertical_offset.to_bits().hash(state);
        self.blur_radius.to_bits().hash(state);
        self.spread_radius.to_bits().hash(state);
        self.color.hash(state);
        self.is_inset.hash(state);
    }
}

/// The direction a gradient runs in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum GradientSpan {
    #[default]
    TopToBottom,
    LeftToRight,
    TopLeftToBottomRight,
    BottomLeftToTopRight,
}

/// A color gradient of one layer. Empty `colors` means "no gradient".
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct GradientConf {
    pub span: GradientSpan,
    pub colors: Vec<Rgba>,
}

impl GradientConf {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_none(&self) -> bool {
        *self == Self::none()
    }

    pub fn is_visible(&self) -> bool {
        !self.colors.is_empty()
    }
}

/// An opaque handle to already-decoded pixel data. Image payloads have no
/// cheap structural equality, so handles compare by pointer identity.
#[derive(Clone, Debug)]
pub struct ImageSource(Arc<Pixmap>);

impl ImageSource {
    pub fn new(pixels: Arc<Pixmap>) -> Self {
        Self(pixels)
    }

    pub fn pixels(&self) -> &Arc<Pixmap> {
        &self.0
    }
}

impl PartialEq for ImageSource {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for ImageSource {}

impl Hash for ImageSource {
    fn hash<H: Hasher>(&self, state: &mut H) {
        (Arc::as_ptr(&self.0) as usize).hash(state);
    }
}

/// An image drawn onto one layer.
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct ImageConf {
    #[serde(skip)]
    pub image: Option<ImageSource>,
    pub opacity: f32,
}

impl ImageConf {
    pub const fn none() -> Self {
        Self {
            image: None,
            opacity: 1.0,
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::none()
    }

    pub fn is_visible(&self) -> bool {
        self.image.is_some() && self.opacity > 0.0
    }
}

impl Default for ImageConf {
    fn default() -> Self {
        Self::none()
    }
}

impl PartialEq for ImageConf {
    fn eq(&self, other: &Self) -> bool {
        self.image == other.image && self.opacity.to_bits() == other.opacity.to_bits()
    }
}

impl Eq for ImageConf {}

impl Hash for ImageConf {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.image.hash(state);
        self.opacity.to_bits().hash(state);
    }
}

/// A name-sorted set of sub-configs of one kind, so that multiple shadows
/// or gradients can coexist on a layer under stable, ordered names.
#[derive(Clone, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct NamedConfs<T> {
    entries: BTreeMap<String, T>,
}

impl<T> NamedConfs<T> {
    pub fn none() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    pub fn of(name: impl Into<String>, conf: T) -> Self {
        let mut entries = BTreeMap::new();
        entries.insert(name.into(), conf);
        Self { entries }
    }

    pub fn with(mut self, name: impl Into<String>, conf: T) -> Self {
        self.entries.insert(name.into(), conf);
        self
    }

    pub fn get(&self, name: &str) -> Option<&T> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Values in name order.
    pub fn sorted_by_names(&self) -> impl Iterator<Item = &T> {
        self.entries.values()
    }
}

impl<T: Default + PartialEq> NamedConfs<T> {
    /// Drops entries whose value equals the canonical none value, so that
    /// "explicitly set to default" and "never set" compare equal.
    pub fn simplified(&self) -> Self
    where
        T: Clone,
    {
        let none = T::default();
        Self {
            entries: self
                .entries
                .iter()
                .filter(|(_, v)| **v != none)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        }
    }
}

impl<T> Default for NamedConfs<T> {
    fn default() -> Self {
        Self::none()
    }
}

static EMPTY_LAYER: LazyLock<Arc<StyleLayerConf>> = LazyLock::new(|| {
    Arc::new(StyleLayerConf {
        shadows: NamedConfs::none(),
        gradients: NamedConfs::none(),
        images: NamedConfs::none(),
        hash: OnceLock::new(),
    })
});

/// All style settings of one visual layer of a component.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct StyleLayerConf {
    shadows: NamedConfs<ShadowConf>,
    gradients: NamedConfs<GradientConf>,
    images: NamedConfs<ImageConf>,
    #[serde(skip)]
    hash: OnceLock<u64>,
}

impl StyleLayerConf {
    pub fn empty() -> Arc<Self> {
        EMPTY_LAYER.clone()
    }

    pub fn of(
        shadows: NamedConfs<ShadowConf>,
        gradients: NamedConfs<GradientConf>,
        images: NamedConfs<ImageConf>,
    ) -> Arc<Self> {
        if shadows.is_empty() && gradients.is_empty() && images.is_empty() {
            return Self::empty();
        }
        Arc::new(Self {
            shadows,
            gradients,
            images,
            hash: OnceLock::new(),
        })
    }

    pub fn shadows(&self) -> &NamedConfs<ShadowConf> {
        &self.shadows
    }

    pub fn gradients(&self) -> &NamedConfs<GradientConf> {
        &self.gradients
    }

    pub fn images(&self) -> &NamedConfs<ImageConf> {
        &self.images
    }

    pub fn is_empty(&self) -> bool {
        *self == **EMPTY_LAYER
    }

    pub fn with_shadows(self: &Arc<Self>, shadows: NamedConfs<ShadowConf>) -> Arc<Self> {
        if shadows == self.shadows {
            return self.clone();
        }
        Self::of(shadows, self.gradients.clone(), self.images.clone())
    }

    pub fn with_gradients(self: &Arc<Self>, gradients: NamedConfs<GradientConf>) -> Arc<Self> {
        if gradients == self.gradients {
            return self.clone();
        }
        Self::of(self.shadows.clone(), gradients, self.images.clone())
    }

    pub fn with_images(self: &Arc<Self>, images: NamedConfs<ImageConf>) -> Arc<Self> {
        if images == self.images {
            return self.clone();
        }
        Self::of(self.shadows.clone(), self.gradients.clone(), images)
    }

    /// Drops none-valued sub-configs and collapses an all-empty layer onto
    /// the shared empty instance. Surviving layers are interned so that
    /// equal layers collapse to one instance over time.
    pub fn simplify(self: &Arc<Self>) -> Arc<Self> {
        let shadows = self.shadows.simplified();
        let gradients = self.gradients.simplified();
        let images = self.images.simplified();
        if shadows.is_empty() && gradients.is_empty() && images.is_empty() {
            return Self::empty();
        }
        if shadows == self.shadows && gradients == self.gradients && images == self.images {
            return crate::pool::intern(self.clone());
        }
        crate::pool::intern(Self::of(shadows, gradients, images))
    }

    fn structural_hash(&self) -> u64 {
        *self.hash.get_or_init(|| {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            self.shadows.hash(&mut hasher);
            self.gradients.hash(&mut hasher);
            self.images.hash(&mut hasher);
            hasher.finish()
        })
    }
}

impl PartialEq for StyleLayerConf {
    fn eq(&self, other: &Self) -> bool {
        // Memoized hashes are a cheap first tier, never the final word.
        if self.structural_hash() != other.structural_hash() {
            return false;
        }
        self.shadows == other.shadows
            && self.gradients == other.gradients
            && self.images == other.images
    }
}

impl Eq for StyleLayerConf {}

impl Hash for StyleLayerConf {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.structural_hash());
    }
}
