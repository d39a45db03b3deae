//! Software RGBA surfaces and the handful of bitmap operations the gauges
//! are composed from: region copies, scaled copies, scaled + rotated copies,
//! multiply blending and a darken pass.

use crate::config::Color;

/// Axis-aligned rectangle in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub w: f32,
    pub h: f32,
}

impl Rect {
    pub const fn new(x: f32, y: f32, w: f32, h: f32) -> Self {
        Self { x, y, w, h }
    }

    /// Multiply every component by `factor`.
    pub fn scaled(self, factor: f32) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            w: self.w * factor,
            h: self.h * factor,
        }
    }
}

/// How source pixels are combined with the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlendMode {
    /// Source-over alpha blending.
    #[default]
    Normal,
    /// Destination colour multiplied by source colour. Grey darkens,
    /// white leaves the destination untouched. Used for shadows.
    Multiply,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Surface {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl Surface {
    /// Fully transparent surface.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            data: vec![0; width * height * 4],
        }
    }

    pub fn filled(width: usize, height: usize, color: Color) -> Self {
        let mut surface = Self::new(width, height);
        surface.clear(color);
        surface
    }

    /// Wrap an RGBA8 buffer. Returns `None` when the length does not match.
    pub fn from_rgba(width: usize, height: usize, data: Vec<u8>) -> Option<Self> {
        (data.len() == width * height * 4).then_some(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn pixel(&self, x: usize, y: usize) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = (y * self.width + x) * 4;
        Some([
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ])
    }

    pub fn clear(&mut self, color: Color) {
        for chunk in self.data.chunks_exact_mut(4) {
            chunk.copy_from_slice(&[color.r, color.g, color.b, 0xff]);
        }
    }

    pub fn clear_transparent(&mut self) {
        self.data.fill(0);
    }

    fn blend_pixel(&mut self, x: i64, y: i64, src: [u8; 4], mode: BlendMode) {
        if x < 0 || y < 0 || x as usize >= self.width || y as usize >= self.height {
            return;
        }
        let idx = (y as usize * self.width + x as usize) * 4;
        let dst = &mut self.data[idx..idx + 4];
        match mode {
            BlendMode::Normal => {
                if src[3] == 0 {
                    return;
                }
                let a = src[3] as f32 / 255.0;
                let da = dst[3] as f32 / 255.0;
                for c in 0..3 {
                    dst[c] = (src[c] as f32 * a + dst[c] as f32 * (1.0 - a)).round() as u8;
                }
                dst[3] = ((a + da * (1.0 - a)) * 255.0).round() as u8;
            }
            BlendMode::Multiply => {
                for c in 0..3 {
                    dst[c] = ((src[c] as u16 * dst[c] as u16 + 127) / 255) as u8;
                }
            }
        }
    }

    /// Copy `src_rect` of `src` unscaled with its top-left at `(dx, dy)`.
    pub fn draw_region(&mut self, src: &Surface, src_rect: Rect, dx: f32, dy: f32, mode: BlendMode) {
        self.draw_scaled(
            src,
            src_rect,
            Rect::new(dx, dy, src_rect.w, src_rect.h),
            mode,
        );
    }

    /// Copy `src_rect` of `src` stretched onto `dst_rect` (nearest sample).
    pub fn draw_scaled(&mut self, src: &Surface, src_rect: Rect, dst_rect: Rect, mode: BlendMode) {
        if dst_rect.w <= 0.0 || dst_rect.h <= 0.0 || src_rect.w <= 0.0 || src_rect.h <= 0.0 {
            return;
        }
        let x0 = dst_rect.x.floor() as i64;
        let y0 = dst_rect.y.floor() as i64;
        let x1 = (dst_rect.x + dst_rect.w).ceil() as i64;
        let y1 = (dst_rect.y + dst_rect.h).ceil() as i64;
        let sx = src_rect.w / dst_rect.w;
        let sy = src_rect.h / dst_rect.h;
        for y in y0.max(0)..y1.min(self.height as i64) {
            let v = src_rect.y + ((y as f32 + 0.5) - dst_rect.y) * sy;
            if v < src_rect.y || v >= src_rect.y + src_rect.h {
                continue;
            }
            for x in x0.max(0)..x1.min(self.width as i64) {
                let u = src_rect.x + ((x as f32 + 0.5) - dst_rect.x) * sx;
                if u < src_rect.x || u >= src_rect.x + src_rect.w {
                    continue;
                }
                if let Some(px) = src.sample(u, v) {
                    self.blend_pixel(x, y, px, mode);
                }
            }
        }
    }

    /// Draw `src` scaled by `(sx, sy)` and rotated by `angle` radians
    /// (clockwise on screen) about the source point `pivot`, which lands on
    /// `(dx, dy)` in this surface.
    pub fn draw_scaled_rotated(
        &mut self,
        src: &Surface,
        pivot: (f32, f32),
        dx: f32,
        dy: f32,
        sx: f32,
        sy: f32,
        angle: f32,
        mode: BlendMode,
    ) {
        if sx <= 0.0 || sy <= 0.0 {
            return;
        }
        let (sin, cos) = angle.sin_cos();
        let forward = |u: f32, v: f32| {
            let lx = (u - pivot.0) * sx;
            let ly = (v - pivot.1) * sy;
            (dx + lx * cos - ly * sin, dy + lx * sin + ly * cos)
        };
        let (w, h) = (src.width as f32, src.height as f32);
        let corners = [forward(0.0, 0.0), forward(w, 0.0), forward(0.0, h), forward(w, h)];
        let (min_x, max_x, min_y, max_y) = corners.iter().fold(
            (f32::MAX, f32::MIN, f32::MAX, f32::MIN),
            |(min_x, max_x, min_y, max_y), &(x, y)| {
                (min_x.min(x), max_x.max(x), min_y.min(y), max_y.max(y))
            },
        );
        let x0 = (min_x.floor() as i64).max(0);
        let y0 = (min_y.floor() as i64).max(0);
        let x1 = (max_x.ceil() as i64).min(self.width as i64);
        let y1 = (max_y.ceil() as i64).min(self.height as i64);
        for y in y0..y1 {
            for x in x0..x1 {
                let px = x as f32 + 0.5 - dx;
                let py = y as f32 + 0.5 - dy;
                // Inverse rotation back into source space
                let u = (px * cos + py * sin) / sx + pivot.0;
                let v = (-px * sin + py * cos) / sy + pivot.1;
                if let Some(color) = src.sample(u, v) {
                    self.blend_pixel(x, y, color, mode);
                }
            }
        }
    }

    /// Draw all of `src` at `(x, y)` with normal blending.
    pub fn blit(&mut self, src: &Surface, x: f32, y: f32) {
        let whole = Rect::new(0.0, 0.0, src.width as f32, src.height as f32);
        self.draw_region(src, whole, x, y, BlendMode::Normal);
    }

    /// Scale the colour of every pixel inside `rect` by `factor`.
    pub fn darken(&mut self, rect: Rect, factor: f32) {
        let factor = factor.clamp(0.0, 1.0);
        let x0 = (rect.x.floor() as i64).max(0) as usize;
        let y0 = (rect.y.floor() as i64).max(0) as usize;
        let x1 = ((rect.x + rect.w).ceil() as i64).clamp(0, self.width as i64) as usize;
        let y1 = ((rect.y + rect.h).ceil() as i64).clamp(0, self.height as i64) as usize;
        for y in y0..y1 {
            for x in x0..x1 {
                let idx = (y * self.width + x) * 4;
                for c in 0..3 {
                    self.data[idx + c] = (self.data[idx + c] as f32 * factor).round() as u8;
                }
            }
        }
    }

    /// Blend a single coloured pixel with coverage `alpha`, used by text
    /// rasterisation.
    pub fn plot(&mut self, x: i64, y: i64, color: Color, alpha: f32) {
        let a = (alpha.clamp(0.0, 1.0) * 255.0).round() as u8;
        self.blend_pixel(x, y, [color.r, color.g, color.b, a], BlendMode::Normal);
    }

    fn sample(&self, u: f32, v: f32) -> Option<[u8; 4]> {
        if u < 0.0 || v < 0.0 {
            return None;
        }
        self.pixel(u as usize, v as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Color = Color::new(0xff, 0x00, 0x00);
    const WHITE: Color = Color::new(0xff, 0xff, 0xff);

    #[test]
    fn region_copy_lands_at_offset() {
        let src = Surface::filled(4, 4, RED);
        let mut dst = Surface::new(10, 10);
        dst.draw_region(&src, Rect::new(0.0, 0.0, 2.0, 2.0), 5.0, 6.0, BlendMode::Normal);
        assert_eq!(dst.pixel(5, 6), Some([0xff, 0, 0, 0xff]));
        assert_eq!(dst.pixel(6, 7), Some([0xff, 0, 0, 0xff]));
        assert_eq!(dst.pixel(7, 6), Some([0, 0, 0, 0]));
        assert_eq!(dst.pixel(4, 6), Some([0, 0, 0, 0]));
    }

    #[test]
    fn scaled_copy_halves_footprint() {
        let src = Surface::filled(8, 8, RED);
        let mut dst = Surface::new(8, 8);
        dst.draw_scaled(
            &src,
            Rect::new(0.0, 0.0, 8.0, 8.0),
            Rect::new(0.0, 0.0, 4.0, 4.0),
            BlendMode::Normal,
        );
        assert_eq!(dst.pixel(3, 3), Some([0xff, 0, 0, 0xff]));
        assert_eq!(dst.pixel(4, 4), Some([0, 0, 0, 0]));
    }

    #[test]
    fn multiply_darkens_and_white_is_neutral() {
        let mut dst = Surface::filled(2, 1, Color::new(200, 100, 50));
        let mut shadow = Surface::filled(2, 1, WHITE);
        dst.draw_region(&shadow, Rect::new(0.0, 0.0, 1.0, 1.0), 0.0, 0.0, BlendMode::Multiply);
        assert_eq!(dst.pixel(0, 0), Some([200, 100, 50, 0xff]));

        shadow.clear(Color::new(128, 128, 128));
        dst.draw_region(&shadow, Rect::new(0.0, 0.0, 1.0, 1.0), 1.0, 0.0, BlendMode::Multiply);
        assert_eq!(dst.pixel(1, 0), Some([100, 50, 25, 0xff]));
    }

    #[test]
    fn quarter_turn_rotates_clockwise() {
        // A 1x3 vertical bar pointing up from its pivot at the bottom.
        let mut bar = Surface::new(1, 3);
        bar.clear(RED);
        let mut dst = Surface::new(9, 9);
        dst.draw_scaled_rotated(
            &bar,
            (0.5, 3.0),
            4.5,
            4.5,
            1.0,
            1.0,
            std::f32::consts::FRAC_PI_2,
            BlendMode::Normal,
        );
        // Up rotated clockwise points right.
        assert_eq!(dst.pixel(6, 4), Some([0xff, 0, 0, 0xff]));
        assert_eq!(dst.pixel(4, 2), Some([0, 0, 0, 0]));
    }

    #[test]
    fn darken_scales_colour_inside_rect_only() {
        let mut dst = Surface::filled(2, 1, Color::new(200, 100, 50));
        dst.darken(Rect::new(0.0, 0.0, 1.0, 1.0), 0.5);
        assert_eq!(dst.pixel(0, 0), Some([100, 50, 25, 0xff]));
        assert_eq!(dst.pixel(1, 0), Some([200, 100, 50, 0xff]));
    }

    #[test]
    fn from_rgba_rejects_wrong_length() {
        assert!(Surface::from_rgba(2, 2, vec![0; 15]).is_none());
        assert!(Surface::from_rgba(2, 2, vec![0; 16]).is_some());
    }
}
