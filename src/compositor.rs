//! Declarative frame assembly.
//!
//! A gauge describes each frame as an ordered list of [`Layer`]s: which
//! cached bitmap to draw, from where, to where, with what rotation and blend.
//! Destination rects are given in the gauge's base coordinates and scaled on
//! insertion, so a composition can be checked without drawing anything.

use std::f32::consts::PI;

use crate::graphics::{BlendMode, Rect, Surface};

/// Rotation of a layer about `pivot`, a point in source pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rotation {
    pub pivot: (f32, f32),
    pub angle: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    /// Index into the instrument's bitmap cache.
    pub source: usize,
    pub src: Rect,
    /// Scaled destination rect. For rotated layers this is the footprint
    /// before rotation.
    pub dst: Rect,
    pub rotation: Option<Rotation>,
    pub blend: BlendMode,
}

/// Glyph sheet with the digits 0-9 side by side.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DigitStrip {
    pub source: usize,
    pub glyph_w: f32,
    pub glyph_h: f32,
}

/// Decimal point glyph drawn between the whole and fractional digits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DotGlyph {
    pub source: usize,
    pub w: f32,
    pub h: f32,
}

/// Dial rotation for a heading in degrees: zero points up, clockwise
/// positive on screen, so the card turns against the heading.
pub fn dial_angle(heading: f64) -> f32 {
    (-heading * std::f64::consts::PI / 180.0) as f32
}

pub fn degrees_to_radians(degrees: f64) -> f32 {
    degrees as f32 * PI / 180.0
}

/// The lowest `width` decimal digits of `value`, most significant first.
pub fn digits_of(value: i64, width: usize) -> Vec<u8> {
    let mut value = value.unsigned_abs();
    let mut digits = vec![0u8; width];
    for slot in digits.iter_mut().rev() {
        *slot = (value % 10) as u8;
        value /= 10;
    }
    digits
}

#[derive(Debug, Clone, PartialEq)]
pub struct Composition {
    scale: f32,
    layers: Vec<Layer>,
}

impl Composition {
    pub fn new(scale: f32) -> Self {
        Self {
            scale,
            layers: Vec::new(),
        }
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn push(&mut self, layer: Layer) {
        self.layers.push(layer);
    }

    /// Draw a bitmap that was cut already scaled to the instrument size,
    /// covering `base` (in base coordinates).
    pub fn prescaled(&mut self, source: usize, base: Rect) {
        let dst = base.scaled(self.scale);
        self.push(Layer {
            source,
            src: Rect::new(0.0, 0.0, dst.w, dst.h),
            dst,
            rotation: None,
            blend: BlendMode::Normal,
        });
    }

    /// Draw `src` of an unscaled bitmap with its top-left at base `(x, y)`.
    pub fn region(&mut self, source: usize, src: Rect, x: f32, y: f32) {
        self.region_to(source, src, Rect::new(x, y, src.w, src.h));
    }

    /// Draw `src` of an unscaled bitmap stretched over `base`.
    pub fn region_to(&mut self, source: usize, src: Rect, base: Rect) {
        self.push(Layer {
            source,
            src,
            dst: base.scaled(self.scale),
            rotation: None,
            blend: BlendMode::Normal,
        });
    }

    /// Draw an unscaled bitmap of `size` rotated by `angle` about `pivot`
    /// (source pixels), with the pivot landing on base `(x, y)`.
    pub fn rotated(
        &mut self,
        source: usize,
        size: (f32, f32),
        pivot: (f32, f32),
        at: (f32, f32),
        angle: f32,
        blend: BlendMode,
    ) {
        let base = Rect::new(at.0 - pivot.0, at.1 - pivot.1, size.0, size.1);
        self.push(Layer {
            source,
            src: Rect::new(0.0, 0.0, size.0, size.1),
            dst: base.scaled(self.scale),
            rotation: Some(Rotation { pivot, angle }),
            blend,
        });
    }

    /// One digit glyph at base `(x, y)`.
    pub fn digit(&mut self, strip: DigitStrip, digit: u8, x: f32, y: f32) {
        let src = Rect::new(strip.glyph_w * digit as f32, 0.0, strip.glyph_w, strip.glyph_h);
        self.region(strip.source, src, x, y);
    }

    /// `value` as `width` fixed glyphs starting at base `(x, y)`.
    ///
    /// Without `leading`, a zero value draws nothing and the first two
    /// glyphs are left blank while they are leading zeros.
    pub fn number(&mut self, strip: DigitStrip, value: i64, width: usize, x: f32, y: f32, leading: bool) {
        if !leading && value == 0 {
            return;
        }
        let mut blank = !leading;
        for (i, d) in digits_of(value, width).into_iter().enumerate() {
            blank = blank && i < 2 && d == 0;
            if !blank {
                self.digit(strip, d, x + strip.glyph_w * i as f32, y);
            }
        }
    }

    /// Fixed point readout: `whole` digits, a dot, then `frac` digits of
    /// `value`, which is already multiplied by 10^frac.
    pub fn fixed_point(
        &mut self,
        strip: DigitStrip,
        dot: DotGlyph,
        value: i64,
        whole: usize,
        frac: usize,
        x: f32,
        y: f32,
    ) {
        let digits = digits_of(value, whole + frac);
        let mut pos = x;
        for (i, d) in digits.into_iter().enumerate() {
            if i == whole {
                self.region(dot.source, Rect::new(0.0, 0.0, dot.w, dot.h), pos, y);
                pos += dot.w;
            }
            self.digit(strip, d, pos, y);
            pos += strip.glyph_w;
        }
    }

    /// Evaluate every layer in order onto `target`, reading sources from
    /// `bitmaps`. Missing sources are skipped.
    pub fn render(&self, bitmaps: &[Surface], target: &mut Surface) {
        for layer in &self.layers {
            let Some(src) = bitmaps.get(layer.source) else {
                continue;
            };
            match layer.rotation {
                Some(Rotation { pivot, angle }) => {
                    let sx = layer.dst.w / layer.src.w;
                    let sy = layer.dst.h / layer.src.h;
                    target.draw_scaled_rotated(
                        src,
                        pivot,
                        layer.dst.x + pivot.0 * sx,
                        layer.dst.y + pivot.1 * sy,
                        sx,
                        sy,
                        angle,
                        layer.blend,
                    );
                }
                None => target.draw_scaled(src, layer.src, layer.dst, layer.blend),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Color;

    const STRIP: DigitStrip = DigitStrip {
        source: 4,
        glyph_w: 38.0,
        glyph_h: 80.0,
    };

    fn glyph_xs(comp: &Composition) -> Vec<f32> {
        comp.layers().iter().map(|l| l.dst.x).collect()
    }

    fn glyph_digits(comp: &Composition) -> Vec<u8> {
        comp.layers()
            .iter()
            .map(|l| (l.src.x / STRIP.glyph_w) as u8)
            .collect()
    }

    #[test]
    fn digits_are_fixed_width() {
        assert_eq!(digits_of(7, 3), [0, 0, 7]);
        assert_eq!(digits_of(12_345, 3), [3, 4, 5]);
        assert_eq!(digits_of(-42, 2), [4, 2]);
    }

    #[test]
    fn dial_turns_against_heading() {
        assert_eq!(dial_angle(0.0), 0.0);
        assert!((dial_angle(90.0) + std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn leading_zeros_blank_first_two_glyphs() {
        let mut comp = Composition::new(1.0);
        comp.number(STRIP, 5, 4, 0.0, 0.0, false);
        assert_eq!(glyph_digits(&comp), [0, 5]);
        assert_eq!(glyph_xs(&comp), [76.0, 114.0]);

        let mut comp = Composition::new(1.0);
        comp.number(STRIP, 500, 5, 0.0, 0.0, false);
        assert_eq!(glyph_digits(&comp), [5, 0, 0]);

        let mut comp = Composition::new(1.0);
        comp.number(STRIP, 0, 5, 0.0, 0.0, false);
        assert!(comp.layers().is_empty());

        let mut comp = Composition::new(1.0);
        comp.number(STRIP, 0, 3, 0.0, 0.0, true);
        assert_eq!(glyph_digits(&comp), [0, 0, 0]);
    }

    #[test]
    fn zero_inside_number_is_drawn() {
        let mut comp = Composition::new(1.0);
        comp.number(STRIP, 1_005, 4, 0.0, 0.0, false);
        assert_eq!(glyph_digits(&comp), [1, 0, 0, 5]);
    }

    #[test]
    fn fixed_point_inserts_dot() {
        let dot = DotGlyph {
            source: 5,
            w: 20.0,
            h: 80.0,
        };
        let mut comp = Composition::new(0.5);
        comp.fixed_point(STRIP, dot, 118_275, 3, 3, 100.0, 10.0);
        let xs: Vec<f32> = comp.layers().iter().map(|l| l.dst.x).collect();
        assert_eq!(xs, [50.0, 69.0, 88.0, 107.0, 117.0, 136.0, 155.0]);
        assert_eq!(comp.layers()[3].source, 5);
        assert!(comp.layers().iter().all(|l| l.dst.y == 5.0 && l.dst.h == 40.0));
    }

    #[test]
    fn rotated_footprint_centres_pivot() {
        let mut comp = Composition::new(0.5);
        comp.rotated(2, (800.0, 800.0), (400.0, 400.0), (400.0, 400.0), 1.0, BlendMode::Normal);
        let layer = &comp.layers()[0];
        assert_eq!(layer.dst, Rect::new(0.0, 0.0, 400.0, 400.0));
        assert_eq!(layer.rotation, Some(Rotation { pivot: (400.0, 400.0), angle: 1.0 }));
    }

    #[test]
    fn render_skips_missing_sources() {
        let red = Color::new(0xff, 0, 0);
        let bitmaps = vec![Surface::filled(4, 4, red)];
        let mut comp = Composition::new(1.0);
        comp.region(7, Rect::new(0.0, 0.0, 4.0, 4.0), 0.0, 0.0);
        comp.region(0, Rect::new(0.0, 0.0, 2.0, 2.0), 1.0, 1.0);
        let mut target = Surface::new(4, 4);
        comp.render(&bitmaps, &mut target);
        assert_eq!(target.pixel(0, 0), Some([0, 0, 0, 0]));
        assert_eq!(target.pixel(2, 2), Some([0xff, 0, 0, 0xff]));
    }
}
