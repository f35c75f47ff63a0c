//! Leaf geometry values used by the structural config model.
//!
//! All of these are small `Copy` values with *bitwise* float equality and
//! hashing (`f32::to_bits`), so they can serve as cache-key material.
//! Bitwise semantics make `NaN == NaN` hold and distinguish `-0.0` from
//! `0.0`, which is exactly what a cache key wants.

use std::hash::{Hash, Hasher};

/// The pixel size of a component or buffer. `none()` means "no usable size".
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn none() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn of(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn has_positive_width(&self) -> bool {
        self.width > 0.0
    }

    pub fn has_positive_height(&self) -> bool {
        self.height > 0.0
    }

    /// Pixel count, rounded down. Zero for degenerate sizes.
    pub fn pixel_count(&self) -> u64 {
        if !self.has_positive_width() || !self.has_positive_height() {
            return 0;
        }
        (self.width as u64) * (self.height as u64)
    }

    pub fn scale(&self, factor: f32) -> Self {
        Self::of(self.width * factor, self.height * factor)
    }
}

impl PartialEq for Size {
    fn eq(&self, other: &Self) -> bool {
        self.width.to_bits() == other.width.to_bits()
            && self.height.to_bits() == other.height.to_bits()
    }
}

impl Eq for Size {}

impl Hash for Size {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.width.to_bits().hash(state);
        self.height.to_bits().hash(state);
    }
}

/// Four edge values (insets, border widths, margins...).
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct Outline {
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
    pub left: f32,
}

impl Outline {
    pub const fn none() -> Self {
        Self {
            top: 0.0,
            right: 0.0,
            bottom: 0.0,
            left: 0.0,
        }
    }

    pub fn of(top: f32, right: f32, bottom: f32, left: f32) -> Self {
        Self {
            top,
            right,
            bottom,
            left,
        }
    }

    pub fn all(value: f32) -> Self {
        Self::of(value, value, value, value)
    }

    pub fn is_none(&self) -> bool {
        *self == Self::none()
    }

    pub fn with_top(self, top: f32) -> Self {
        Self { top, ..self }
    }

    pub fn with_right(self, right: f32) -> Self {
        Self { right, ..self }
    }

    pub fn with_bottom(self, bottom: f32) -> Self {
        Self { bottom, ..self }
    }

    pub fn with_left(self, left: f32) -> Self {
        Self { left, ..self }
    }

    pub fn plus(self, other: Self) -> Self {
        Self::of(
            self.top + other.top,
            self.right + other.right,
            self.bottom + other.bottom,
            self.left + other.left,
        )
    }

    pub fn scale(&self, factor: f32) -> Self {
        Self::of(
            self.top * factor,
            self.right * factor,
            self.bottom * factor,
            self.left * factor,
        )
    }

    /// Edge values clamped to be non-negative.
    pub fn clamped(&self) -> Self {
        Self::of(
            self.top.max(0.0),
            self.right.max(0.0),
            self.bottom.max(0.0),
            self.left.max(0.0),
        )
    }
}

impl PartialEq for Outline {
    fn eq(&self, other: &Self) -> bool {
        self.top.to_bits() == other.top.to_bits()
            && self.right.to_bits() == other.right.to_bits()
            && self.bottom.to_bits() == other.bottom.to_bits()
            && self.left.to_bits() == other.left.to_bits()
    }
}

impl Eq for Outline {}

impl Hash for Outline {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.top.to_bits().hash(state);
        self.right.to_bits().hash(state);
        self.bottom.to_bits().hash(state);
        self.left.to_bits().hash(state);
    }
}

/// The elliptical radii of one rounded corner.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct CornerArc {
    pub width: f32,
    pub height: f32,
}

impl CornerArc {
    pub const fn none() -> Self {
        Self {
            width: 0.0,
            height: 0.0,
        }
    }

    pub fn of(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::none()
    }

    pub fn is_round(&self) -> bool {
        self.width > 0.0 && self.height > 0.0
    }

    pub fn scale(&self, factor: f32) -> Self {
        Self::of(self.width * factor, self.height * factor)
    }
}

impl PartialEq for CornerArc {
    fn eq(&self, other: &Self) -> bool {
        self.width.to_bits() == other.width.to_bits()
            && self.height.to_bits() == other.height.to_bits()
    }
}

impl Eq for CornerArc {}

impl Hash for CornerArc {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.width.to_bits().hash(state);
        self.height.to_bits().hash(state);
    }
}

/// The position and size of a component, in its parent's coordinates.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct Bounds {
    pub x: f32,
    pub y: f32,
    pub size: Size,
}

impl Bounds {
    pub const fn none() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            size: Size::none(),
        }
    }

    pub fn of(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            size: Size::of(width, height),
        }
    }

    pub fn with_size(self, width: f32, height: f32) -> Self {
        Self {
            size: Size::of(width, height),
            ..self
        }
    }

    pub fn has_width(&self, width: f32) -> bool {
        self.size.width.to_bits() == width.to_bits()
    }

    pub fn has_height(&self, height: f32) -> bool {
        self.size.height.to_bits() == height.to_bits()
    }
}

impl PartialEq for Bounds {
    fn eq(&self, other: &Self) -> bool {
        self.x.to_bits() == other.x.to_bits()
            && self.y.to_bits() == other.y.to_bits()
            && self.size == other.size
    }
}

impl Eq for Bounds {}

impl Hash for Bounds {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.x.to_bits().hash(state);
        self.y.to_bits().hash(state);
        self.size.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outline_plus_and_clamp() {
        let a = Outline::of(1.0, 2.0, 3.0, 4.0);
        let b = Outline::all(-1.0);
        assert_eq!(a.plus(b), Outline::of(0.0, 1.0, 2.0, 3.0));
        assert_eq!(b.clamped(), Outline::none());
    }

    #[test]
    fn size_pixel_count_is_zero_for_degenerate() {
        assert_eq!(Size::of(0.0, 100.0).pixel_count(), 0);
        assert_eq!(Size::of(100.0, -1.0).pixel_count(), 0);
        assert_eq!(Size::of(10.0, 10.0).pixel_count(), 100);
    }

    #[test]
    fn scaling_multiplies_every_edge() {
        assert_eq!(Size::of(10.0, 20.0).scale(2.0), Size::of(20.0, 40.0));
        assert_eq!(Outline::all(3.0).scale(0.5), Outline::all(1.5));
        assert_eq!(CornerArc::of(4.0, 8.0).scale(2.0), CornerArc::of(8.0, 16.0));
    }

    #[test]
    fn bitwise_equality_treats_nan_as_equal() {
        let a = Size::of(f32::NAN, 1.0);
        let b = Size::of(f32::NAN, 1.0);
        assert_eq!(a, b);
    }
}
