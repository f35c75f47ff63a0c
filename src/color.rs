//! Color values of the structural config model.

use std::hash::Hash;

/// An 8-bit straight-alpha color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const TRANSPARENT: Rgba = Rgba::rgba(0, 0, 0, 0);
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const RED: Rgba = Rgba::rgb(255, 0, 0);
    pub const GREEN: Rgba = Rgba::rgb(0, 255, 0);
    pub const BLUE: Rgba = Rgba::rgb(0, 0, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn is_visible(&self) -> bool {
        self.a > 0
    }

    /// Premultiplied RGBA8, the format `surface::Pixmap` stores.
    pub fn to_premul(self) -> [u8; 4] {
        let a = u16::from(self.a);
        [
            ((u16::from(self.r) * a + 127) / 255) as u8,
            ((u16::from(self.g) * a + 127) / 255) as u8,
            ((u16::from(self.b) * a + 127) / 255) as u8,
            self.a,
        ]
    }
}

/// Per-edge border colors. Most borders are homogeneous, so `of_all`
/// and `homogeneous_color` are the common paths.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct BorderColors {
    pub top: Option<Rgba>,
    pub right: Option<Rgba>,
    pub bottom: Option<Rgba>,
    pub left: Option<Rgba>,
}

impl BorderColors {
    pub const fn none() -> Self {
        Self {
            top: None,
            right: None,
            bottom: None,
            left: None,
        }
    }

    pub fn of_all(color: Rgba) -> Self {
        Self {
            top: Some(color),
            right: Some(color),
            bottom: Some(color),
            left: Some(color),
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::none()
    }

    /// The single color of a homogeneous border, if all four edges agree.
    pub fn homogeneous_color(&self) -> Option<Rgba> {
        match (self.top, self.right, self.bottom, self.left) {
            (Some(t), Some(r), Some(b), Some(l)) if t == r && r == b && b == l => Some(t),
            _ => None,
        }
    }

    pub fn is_visible(&self) -> bool {
        [self.top, self.right, self.bottom, self.left]
            .iter()
            .any(|c| c.is_some_and(|c| c.is_visible()))
    }
}

/// The base color set of a component: the background fill, the foundation
/// fill (the area between the component's margin and its outer bounds)
/// and the border edge colors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ColorConf {
    pub background: Option<Rgba>,
    pub foundation: Option<Rgba>,
    pub border: BorderColors,
}

impl ColorConf {
    pub const fn none() -> Self {
        Self {
            background: None,
            foundation: None,
            border: BorderColors::none(),
        }
    }

    pub fn is_none(&self) -> bool {
        *self == Self::none()
    }

    pub fn with_background(self, color: Option<Rgba>) -> Self {
        Self {
            background: color,
            ..self
        }
    }

    pub fn with_foundation(self, color: Option<Rgba>) -> Self {
        Self {
            foundation: color,
            ..self
        }
    }

    pub fn with_border(self, border: BorderColors) -> Self {
        Self { border, ..self }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn premul_scales_channels_by_alpha() {
        assert_eq!(Rgba::rgba(255, 128, 0, 128).to_premul(), [128, 64, 0, 128]);
        assert_eq!(Rgba::RED.to_premul(), [255, 0, 0, 255]);
        assert_eq!(Rgba::TRANSPARENT.to_premul(), [0, 0, 0, 0]);
    }

    #[test]
    fn homogeneous_border_detection() {
        assert_eq!(
            BorderColors::of_all(Rgba::RED).homogeneous_color(),
            Some(Rgba::RED)
        );
        let mixed = BorderColors {
            top: Some(Rgba::BLUE),
            ..BorderColors::of_all(Rgba::RED)
        };
        assert_eq!(mixed.homogeneous_color(), None);
        assert_eq!(BorderColors::none().homogeneous_color(), None);
    }
}
