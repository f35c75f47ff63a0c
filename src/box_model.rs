//! The box-model slice of a component's style: corner arcs, border widths,
//! margin, padding, base outline and size. This is the key type for the
//! derived-geometry cache in [`crate::areas`].

use std::hash::{Hash, Hasher};
use std::sync::{Arc, LazyLock, OnceLock};

use crate::geom::{CornerArc, Outline, Size};

static NONE: LazyLock<Arc<BoxModelConf>> = LazyLock::new(|| {
    Arc::new(BoxModelConf {
        top_left_arc: CornerArc::none(),
        top_right_arc: CornerArc::none(),
        bottom_left_arc: CornerArc::none(),
        bottom_right_arc: CornerArc::none(),
        widths: Outline::none(),
        margin: Outline::none(),
        padding: Outline::none(),
        base_outline: Outline::none(),
        size: Size::none(),
        hash: OnceLock::new(),
    })
});

/// Immutable box-model geometry of one component. `Arc`-shared so that the
/// canonical [`BoxModelConf::none`] instance can be recognized by pointer.
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct BoxModelConf {
    pub top_left_arc: CornerArc,
    pub top_right_arc: CornerArc,
    pub bottom_left_arc: CornerArc,
    pub bottom_right_arc: CornerArc,
    pub widths: Outline,
    pub margin: Outline,
    pub padding: Outline,
    pub base_outline: Outline,
    pub size: Size,
    #[serde(skip)]
    hash: OnceLock<u64>,
}

impl BoxModelConf {
    pub fn none() -> Arc<Self> {
        NONE.clone()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn of(
        top_left_arc: CornerArc,
        top_right_arc: CornerArc,
        bottom_left_arc: CornerArc,
        bottom_right_arc: CornerArc,
        widths: Outline,
        margin: Outline,
        padding: Outline,
        base_outline: Outline,
        size: Size,
    ) -> Arc<Self> {
        let conf = Self {
            top_left_arc,
            top_right_arc,
            bottom_left_arc,
            bottom_right_arc,
            widths,
            margin,
            padding,
            base_outline,
            size,
            hash: OnceLock::new(),
        };
        if conf == **NONE {
            return NONE.clone();
        }
        Arc::new(conf)
    }

    pub fn is_none(&self) -> bool {
        *self == **NONE
    }

    pub fn with_size(self: &Arc<Self>, size: Size) -> Arc<Self> {
        if size == self.size {
            return self.clone();
        }
        Self::of(
            self.top_left_arc,
            self.top_right_arc,
            self.bottom_left_arc,
            self.bottom_right_arc,
            self.widths,
            self.margin,
            self.padding,
            self.base_outline,
            size,
        )
    }

    pub fn has_any_non_zero_arcs(&self) -> bool {
        self.top_left_arc.is_round()
            || self.top_right_arc.is_round()
            || self.bottom_left_arc.is_round()
            || self.bottom_right_arc.is_round()
    }

    pub fn all_corners_share_the_same_arc(&self) -> bool {
        self.top_left_arc == self.top_right_arc
            && self.top_right_arc == self.bottom_left_arc
            && self.bottom_left_arc == self.bottom_right_arc
    }

    pub fn has_visible_border_widths(&self) -> bool {
        !self.widths.is_none()
    }

    /// Canonicalizes this node: the semantically-empty box model collapses
    /// onto the shared none instance, everything else is interned.
    pub fn simplify(self: &Arc<Self>) -> Arc<Self> {
        if self.is_none() {
            return NONE.clone();
        }
        crate::pool::intern(self.clone())
    }

    pub(crate) fn structural_hash(&self) -> u64 {
        *self.hash.get_or_init(|| {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            self.top_left_arc.hash(&mut hasher);
            self.top_right_arc.hash(&mut hasher);
            self.bottom_left_arc.hash(&mut hasher);
            self.bottom_right_arc.hash(&mut hasher);
            self.widths.hash(&mut hasher);
            self.margin.hash(&mut hasher);
            self.padding.hash(&mut hasher);
            self.base_outline.hash(&mut hasher);
            self.size.hash(&mut hasher);
            hasher.finish()
        })
    }
}

impl PartialEq for BoxModelConf {
    fn eq(&self, other: &Self) -> bool {
        if self.structural_hash() != other.structural_hash() {
            return false;
        }
        self.top_left_arc == other.top_left_arc
            && self.top_right_arc == other.top_right_arc
            && self.bottom_left_arc == other.bottom_left_arc
            && self.bottom_right_arc == other.bottom_right_arc
            && self.widths == other.widths
            && self.margin == other.margin
            && self.padding == other.padding
            && self.base_outline == other.base_outline
            && self.size == other.size
    }
}

impl Eq for BoxModelConf {}

impl Hash for BoxModelConf {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.structural_hash());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_default_fields_collapse_to_none() {
        let conf = BoxModelConf::of(
            CornerArc::none(),
            CornerArc::none(),
            CornerArc::none(),
            CornerArc::none(),
            Outline::none(),
            Outline::none(),
            Outline::none(),
            Outline::none(),
            Size::none(),
        );
        assert!(Arc::ptr_eq(&conf, &BoxModelConf::none()));
    }

    #[test]
    fn with_size_is_noop_for_equal_size() {
        let conf = BoxModelConf::none().with_size(Size::of(10.0, 10.0));
        assert!(!Arc::ptr_eq(&conf, &BoxModelConf::none()));
        let same = conf.with_size(Size::of(10.0, 10.0));
        assert!(Arc::ptr_eq(&conf, &same));
    }

    #[test]
    fn corner_predicates() {
        let rounded = BoxModelConf::none().with_size(Size::of(5.0, 5.0));
        assert!(!rounded.has_any_non_zero_arcs());
        assert!(rounded.all_corners_share_the_same_arc());
    }
}
