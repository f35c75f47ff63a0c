//! In-memory draw surfaces: premultiplied RGBA8 pixel buffers, source-over
//! compositing and the [`DrawContext`] handed to layer rasterizers.

use kurbo::Shape;

use crate::color::Rgba;
use crate::error::{GlazeError, GlazeResult};

/// A premultiplied RGBA8 pixel buffer. Freshly allocated buffers are fully
/// transparent.
#[derive(Clone, Debug)]
pub struct Pixmap {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl Pixmap {
    /// Fails for zero dimensions; callers treat that as "caching not
    /// applicable", not as a paint error.
    pub fn new(width: u32, height: u32) -> GlazeResult<Self> {
        if width == 0 || height == 0 {
            return Err(GlazeError::allocation(format!(
                "cannot allocate a {width}x{height} pixel buffer"
            )));
        }
        Ok(Self {
            width,
            height,
            data: vec![0; (width as usize) * (height as usize) * 4],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Resets every pixel to fully transparent.
    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = ((y * self.width + x) as usize) * 4;
        Some([
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ])
    }

    fn composite_pixel(&mut self, x: u32, y: u32, src: [u8; 4], opacity: f32) {
        if x >= self.width || y >= self.height {
            return;
        }
        let i = ((y * self.width + x) as usize) * 4;
        let dst = [
            self.data[i],
            self.data[i + 1],
            self.data[i + 2],
            self.data[i + 3],
        ];
        let out = over(dst, src, opacity);
        self.data[i..i + 4].copy_from_slice(&out);
    }

    /// Composites `src` onto `self` with its top-left corner at `(x, y)`.
    pub fn blit(&mut self, src: &Pixmap, x: i32, y: i32) {
        for sy in 0..src.height {
            let ty = y + sy as i32;
            if ty < 0 || ty >= self.height as i32 {
                continue;
            }
            for sx in 0..src.width {
                let tx = x + sx as i32;
                if tx < 0 || tx >= self.width as i32 {
                    continue;
                }
                if let Some(p) = src.pixel(sx, sy) {
                    self.composite_pixel(tx as u32, ty as u32, p, 1.0);
                }
            }
        }
    }
}

/// Premultiplied source-over, with an extra opacity factor applied to `src`.
pub fn over(dst: [u8; 4], src: [u8; 4], opacity: f32) -> [u8; 4] {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - sa;

    let mut out = [0u8; 4];
    out[3] = add_sat_u8(sa as u8, mul_div255(u16::from(dst[3]), inv) as u8);
    for i in 0..3 {
        let sc = mul_div255(u16::from(src[i]), op);
        let dc = mul_div255(u16::from(dst[i]), inv);
        out[i] = add_sat_u8(sc as u8, dc as u8);
    }
    out
}

fn mul_div255(a: u16, b: u16) -> u16 {
    (a * b + 127) / 255
}

fn add_sat_u8(a: u8, b: u8) -> u8 {
    a.saturating_add(b)
}

/// Rendering attributes carried alongside a draw surface.
#[derive(Clone, Copy, Debug)]
pub struct RenderHints {
    pub antialias: bool,
}

impl Default for RenderHints {
    fn default() -> Self {
        Self { antialias: true }
    }
}

/// A mutable draw surface plus the paint attributes a rasterizer sees:
/// a clip path (tested with even-odd parity), a global opacity and
/// rendering hints.
pub struct DrawContext<'a> {
    target: &'a mut Pixmap,
    pub clip: Option<kurbo::BezPath>,
    pub opacity: f32,
    pub hints: RenderHints,
}

impl<'a> DrawContext<'a> {
    pub fn new(target: &'a mut Pixmap) -> Self {
        Self {
            target,
            clip: None,
            opacity: 1.0,
            hints: RenderHints::default(),
        }
    }

    /// A context over `buffer` inheriting this context's paint attributes.
    /// The clip is intentionally *not* inherited: the buffer's own bounds
    /// are its natural clip.
    pub fn buffer_context<'b>(&self, buffer: &'b mut Pixmap) -> DrawContext<'b> {
        DrawContext {
            target: buffer,
            clip: None,
            opacity: self.opacity,
            hints: self.hints,
        }
    }

    pub fn width(&self) -> u32 {
        self.target.width()
    }

    pub fn height(&self) -> u32 {
        self.target.height()
    }

    pub fn target(&self) -> &Pixmap {
        self.target
    }

    fn clipped_out(&self, x: u32, y: u32) -> bool {
        match &self.clip {
            None => false,
            Some(path) => {
                let center = kurbo::Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                path.winding(center) % 2 == 0
            }
        }
    }

    pub fn fill_rect(&mut self, rect: kurbo::Rect, color: Rgba) {
        let src = color.to_premul();
        let x0 = rect.x0.max(0.0).floor() as u32;
        let y0 = rect.y0.max(0.0).floor() as u32;
        let x1 = (rect.x1.min(f64::from(self.target.width())).ceil() as u32).max(x0);
        let y1 = (rect.y1.min(f64::from(self.target.height())).ceil() as u32).max(y0);
        for y in y0..y1 {
            for x in x0..x1 {
                if !self.clipped_out(x, y) {
                    self.target.composite_pixel(x, y, src, self.opacity);
                }
            }
        }
    }

    /// Fills `path` with even-odd parity at pixel centers. Coarse, but all
    /// this core needs; real gradient/shape rasterizers live outside.
    pub fn fill_path(&mut self, path: &kurbo::BezPath, color: Rgba) {
        let src = color.to_premul();
        let bbox = path.bounding_box();
        let x0 = bbox.x0.max(0.0).floor() as u32;
        let y0 = bbox.y0.max(0.0).floor() as u32;
        let x1 = (bbox.x1.min(f64::from(self.target.width())).ceil() as u32).max(x0);
        let y1 = (bbox.y1.min(f64::from(self.target.height())).ceil() as u32).max(y0);
        for y in y0..y1 {
            for x in x0..x1 {
                let center = kurbo::Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
                if path.winding(center) % 2 != 0 && !self.clipped_out(x, y) {
                    self.target.composite_pixel(x, y, src, self.opacity);
                }
            }
        }
    }

    pub fn draw_pixmap(&mut self, src: &Pixmap, x: i32, y: i32) {
        self.target.blit(src, x, y);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sized_pixmap_is_an_allocation_error() {
        assert!(Pixmap::new(0, 4).is_err());
        assert!(Pixmap::new(4, 0).is_err());
    }

    #[test]
    fn fill_and_blit_roundtrip() {
        let mut buffer = Pixmap::new(4, 4).unwrap();
        let mut ctx = DrawContext::new(&mut buffer);
        ctx.fill_rect(kurbo::Rect::new(0.0, 0.0, 4.0, 4.0), Rgba::RED);

        let mut target = Pixmap::new(8, 8).unwrap();
        target.blit(&buffer, 2, 2);
        assert_eq!(target.pixel(2, 2), Some(Rgba::RED.to_premul()));
        assert_eq!(target.pixel(1, 1), Some([0, 0, 0, 0]));
    }

    #[test]
    fn buffer_context_inherits_attributes_but_not_clip() {
        let mut target = Pixmap::new(4, 4).unwrap();
        let mut ctx = DrawContext::new(&mut target);
        ctx.opacity = 0.5;
        ctx.clip = Some(kurbo::Rect::new(0.0, 0.0, 1.0, 1.0).to_path(0.1));

        let mut buffer = Pixmap::new(4, 4).unwrap();
        let buffer_ctx = ctx.buffer_context(&mut buffer);
        assert_eq!(buffer_ctx.opacity, 0.5);
        assert!(buffer_ctx.clip.is_none());
    }

    #[test]
    fn over_is_identity_for_transparent_source() {
        let dst = [10, 20, 30, 200];
        assert_eq!(over(dst, [0, 0, 0, 0], 1.0), dst);
        assert_eq!(over(dst, [255, 0, 0, 255], 0.0), dst);
    }
}
