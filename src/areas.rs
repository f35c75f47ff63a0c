//! Derived component geometry: the body, interior, exterior and border
//! ring of a box model, each produced lazily and revalidated against the
//! fields that can actually change it.
//!
//! Areas are shared process-wide through a weak registry keyed by the
//! interned [`BoxModelConf`], so sibling widgets with equal box models
//! compute each path once.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, PoisonError, Weak};

use kurbo::{BezPath, Point, Rect, RoundedRect, RoundedRectRadii, Shape};

use crate::box_model::BoxModelConf;
use crate::error::GlazeResult;
use crate::geom::Outline;
use crate::lazy::{CacheCapability, LazyCache};

/// A paintable/clippable region of a component.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentArea {
    /// The full bounds; no clipping needed.
    All,
    /// Margin-inset rounded box, border included.
    Body,
    /// The body minus the border ring.
    Interior,
    /// Everything outside the body.
    Exterior,
    /// The body minus the interior.
    Border,
}

/// The lazily derived area paths of one box model.
///
/// The handle holds its box model strongly, so the paths it produces are
/// always derived from the configuration it was created for. Only the
/// shared registry refers to the box model weakly.
#[derive(Clone, Debug)]
pub struct ComponentAreas {
    key: Arc<BoxModelConf>,
    slots: AreaSlots,
}

/// The four path slots of one box model. Clones share the underlying
/// cache slots.
#[derive(Clone, Debug)]
struct AreaSlots {
    body: LazyCache<BezPath>,
    interior: LazyCache<BezPath>,
    exterior: LazyCache<BezPath>,
    border: LazyCache<BezPath>,
}

impl AreaSlots {
    fn new() -> Self {
        Self {
            body: LazyCache::new(),
            interior: LazyCache::new(),
            exterior: LazyCache::new(),
            border: LazyCache::new(),
        }
    }
}

static AREAS: LazyLock<Mutex<HashMap<u64, Vec<(Weak<BoxModelConf>, AreaSlots)>>>> =
    LazyLock::new(|| Mutex::new(HashMap::new()));

impl ComponentAreas {
    /// The shared areas of `conf`, created on first sight of an equal box
    /// model. Dead registry entries are pruned on the way.
    pub fn of(conf: &Arc<BoxModelConf>) -> ComponentAreas {
        Self::register(conf, AreaSlots::new())
    }

    /// Looks up the slots registered for a box model equal to `conf`, or
    /// registers `slots` under it. On a hit the registered key is adopted,
    /// so equal handles converge on one instance.
    fn register(conf: &Arc<BoxModelConf>, slots: AreaSlots) -> ComponentAreas {
        let hash = conf.structural_hash();
        let mut registry = AREAS.lock().unwrap_or_else(PoisonError::into_inner);
        let bucket = registry.entry(hash).or_default();
        bucket.retain(|(key, _)| key.strong_count() > 0);
        for (key, existing) in bucket.iter() {
            if let Some(registered) = key.upgrade()
                && registered == *conf
            {
                return ComponentAreas {
                    key: registered,
                    slots: existing.clone(),
                };
            }
        }
        bucket.push((Arc::downgrade(conf), slots.clone()));
        ComponentAreas {
            key: conf.clone(),
            slots,
        }
    }

    /// The path of `area`, produced on first use. `All` means "no clip"
    /// and yields `None`.
    pub fn get(&self, area: ComponentArea) -> Option<Arc<BezPath>> {
        let conf = self.key.as_ref();
        match area {
            ComponentArea::All => None,
            ComponentArea::Body => self.slots.body.get_for(&BodyArea, conf, &()),
            ComponentArea::Interior => self.slots.interior.get_for(&InteriorArea, conf, &()),
            ComponentArea::Exterior => self.slots.exterior.get_for(&ExteriorArea, conf, &()),
            ComponentArea::Border => self.slots.border.get_for(&BorderRingArea, conf, &()),
        }
    }

    /// Revalidates each derived path for the `old -> new` transition.
    /// Still-valid paths keep their slots; stale ones become lazy again.
    /// The result is registered under `new`, so later lookups for an equal
    /// box model share the surviving slots instead of recomputing.
    #[must_use]
    pub fn validate(&self, old: &Arc<BoxModelConf>, new: &Arc<BoxModelConf>) -> Self {
        if old == new {
            return self.clone();
        }
        let migrated = AreaSlots {
            body: self.slots.body.validate(&BodyArea, old.as_ref(), new.as_ref(), &()),
            interior: self
                .slots
                .interior
                .validate(&InteriorArea, old.as_ref(), new.as_ref(), &()),
            exterior: self
                .slots
                .exterior
                .validate(&ExteriorArea, old.as_ref(), new.as_ref(), &()),
            border: self
                .slots
                .border
                .validate(&BorderRingArea, old.as_ref(), new.as_ref(), &()),
        };
        Self::register(new, migrated)
    }
}

fn same_body_inputs(old: &BoxModelConf, new: &BoxModelConf) -> bool {
    old.size == new.size
        && old.margin == new.margin
        && old.base_outline == new.base_outline
        && old.top_left_arc == new.top_left_arc
        && old.top_right_arc == new.top_right_arc
        && old.bottom_left_arc == new.bottom_left_arc
        && old.bottom_right_arc == new.bottom_right_arc
}

/// The margin-inset rounded body of the component.
fn body_path(conf: &BoxModelConf, extra_insets: Outline) -> BezPath {
    let insets = conf
        .base_outline
        .plus(conf.margin.clamped())
        .plus(extra_insets);
    let width = f64::from(conf.size.width);
    let height = f64::from(conf.size.height);
    let rect = Rect::new(
        f64::from(insets.left),
        f64::from(insets.top),
        (width - f64::from(insets.right)).max(f64::from(insets.left)),
        (height - f64::from(insets.bottom)).max(f64::from(insets.top)),
    );
    if !conf.has_any_non_zero_arcs() {
        return rect.to_path(0.1);
    }
    // Corner arcs shrink with the insets; kurbo radii are circular, so use
    // the smaller arc axis.
    let shrink = |arc: crate::geom::CornerArc, inset: f32| -> f64 {
        f64::from((arc.width.min(arc.height) - inset).max(0.0))
    };
    let radii = RoundedRectRadii::new(
        shrink(conf.top_left_arc, insets.top.min(insets.left)),
        shrink(conf.top_right_arc, insets.top.min(insets.right)),
        shrink(conf.bottom_right_arc, insets.bottom.min(insets.right)),
        shrink(conf.bottom_left_arc, insets.bottom.min(insets.left)),
    );
    RoundedRect::from_rect(rect, radii).to_path(0.1)
}

struct BodyArea;

impl CacheCapability<BoxModelConf, ()> for BodyArea {
    type Value = BezPath;

    fn produce(&self, state: &BoxModelConf, _ctx: &()) -> GlazeResult<BezPath> {
        Ok(body_path(state, Outline::none()))
    }

    fn is_still_valid(&self, old: &BoxModelConf, new: &BoxModelConf, _ctx: &()) -> bool {
        same_body_inputs(old, new)
    }
}

struct InteriorArea;

impl CacheCapability<BoxModelConf, ()> for InteriorArea {
    type Value = BezPath;

    fn produce(&self, state: &BoxModelConf, _ctx: &()) -> GlazeResult<BezPath> {
        Ok(body_path(state, state.widths.clamped()))
    }

    fn is_still_valid(&self, old: &BoxModelConf, new: &BoxModelConf, _ctx: &()) -> bool {
        same_body_inputs(old, new) && old.widths == new.widths
    }
}

struct ExteriorArea;

impl CacheCapability<BoxModelConf, ()> for ExteriorArea {
    type Value = BezPath;

    fn produce(&self, state: &BoxModelConf, _ctx: &()) -> GlazeResult<BezPath> {
        // Bounds rect plus the body as one even-odd compound path: the
        // region between them.
        let mut path = Rect::new(
            0.0,
            0.0,
            f64::from(state.size.width),
            f64::from(state.size.height),
        )
        .to_path(0.1);
        path.extend(body_path(state, Outline::none()));
        Ok(path)
    }

    fn is_still_valid(&self, old: &BoxModelConf, new: &BoxModelConf, _ctx: &()) -> bool {
        same_body_inputs(old, new)
    }
}

struct BorderRingArea;

impl CacheCapability<BoxModelConf, ()> for BorderRingArea {
    type Value = BezPath;

    fn produce(&self, state: &BoxModelConf, _ctx: &()) -> GlazeResult<BezPath> {
        let mut path = body_path(state, Outline::none());
        path.extend(body_path(state, state.widths.clamped()));
        Ok(path)
    }

    fn is_still_valid(&self, old: &BoxModelConf, new: &BoxModelConf, _ctx: &()) -> bool {
        same_body_inputs(old, new) && old.widths == new.widths
    }
}

/// Even-odd membership test used by tests and simple fills.
pub fn area_contains(path: &BezPath, point: Point) -> bool {
    path.winding(point) % 2 != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::{CornerArc, Size};

    fn boxy(widths: f32, margin: f32, size: f32) -> Arc<BoxModelConf> {
        BoxModelConf::of(
            CornerArc::none(),
            CornerArc::none(),
            CornerArc::none(),
            CornerArc::none(),
            Outline::all(widths),
            Outline::all(margin),
            Outline::none(),
            Outline::none(),
            Size::of(size, size),
        )
    }

    #[test]
    fn equal_box_models_share_their_areas() {
        let a = boxy(2.0, 1.0, 40.0);
        let b = boxy(2.0, 1.0, 40.0);
        let area_a = ComponentAreas::of(&a).get(ComponentArea::Body).unwrap();
        let area_b = ComponentAreas::of(&b).get(ComponentArea::Body).unwrap();
        assert!(Arc::ptr_eq(&area_a, &area_b));
    }

    #[test]
    fn border_ring_lies_between_body_and_interior() {
        let conf = boxy(4.0, 0.0, 40.0);
        let areas = ComponentAreas::of(&conf);
        let ring = areas.get(ComponentArea::Border).unwrap();
        // Inside the border band:
        assert!(area_contains(&ring, Point::new(2.0, 20.0)));
        // In the interior:
        assert!(!area_contains(&ring, Point::new(20.0, 20.0)));
        // Outside the component:
        assert!(!area_contains(&ring, Point::new(-1.0, 20.0)));
    }

    #[test]
    fn areas_outlive_the_config_they_came_from() {
        let conf = boxy(0.0, 0.0, 44.0);
        let areas = ComponentAreas::of(&conf);
        drop(conf);
        // The handle keeps its box model alive; the body still covers the
        // component, not the empty default geometry.
        let body = areas.get(ComponentArea::Body).unwrap();
        assert!(area_contains(&body, Point::new(22.0, 22.0)));
    }

    #[test]
    fn validated_areas_stay_shared_with_fresh_lookups() {
        let old = boxy(3.0, 0.0, 52.0);
        let new = boxy(3.0, 0.0, 56.0);
        let validated = ComponentAreas::of(&old).validate(&old, &new);
        let body = validated.get(ComponentArea::Body).unwrap();

        let sibling = ComponentAreas::of(&new).get(ComponentArea::Body).unwrap();
        assert!(Arc::ptr_eq(&body, &sibling));
    }

    #[test]
    fn width_change_invalidates_interior_but_not_body() {
        let old = boxy(2.0, 1.0, 40.0);
        let new = boxy(6.0, 1.0, 40.0);
        let areas = ComponentAreas::of(&old);
        let body_before = areas.get(ComponentArea::Body).unwrap();
        let interior_before = areas.get(ComponentArea::Interior).unwrap();

        let validated = areas.validate(&old, &new);
        let body_after = validated.get(ComponentArea::Body).unwrap();
        let interior_after = validated.get(ComponentArea::Interior).unwrap();

        assert!(Arc::ptr_eq(&body_before, &body_after));
        assert!(!Arc::ptr_eq(&interior_before, &interior_after));
    }
}
