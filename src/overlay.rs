//! Status text drawn over the panel, e.g. while the simulator is away.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use rusttype::{point, Font, PositionedGlyph, Scale};

use crate::config::Color;
use crate::graphics::Surface;

pub struct StatusOverlay {
    font: Font<'static>,
    scale: Scale,
    color: Color,
}

impl StatusOverlay {
    pub fn new(font: Font<'static>, size: f32, color: Color) -> Self {
        Self {
            font,
            scale: Scale::uniform(size),
            color,
        }
    }

    /// Load a TrueType/OpenType font from disk.
    pub fn from_file(path: &Path, size: f32, color: Color) -> Result<Self> {
        let bytes = std::fs::read(path).with_context(|| format!("failed to read font {:?}", path))?;
        let font = Font::try_from_vec(bytes).ok_or_else(|| anyhow!("{:?} is not a usable font", path))?;
        Ok(Self::new(font, size, color))
    }

    /// Draw `text` centred on `(x, y)`.
    pub fn draw_centered(&self, frame: &mut Surface, x: i32, y: i32, text: &str) {
        let glyphs = self.layout(text);
        let (min_x, max_x, min_y, max_y) = bounds(&glyphs);
        if min_x >= max_x || min_y >= max_y {
            return;
        }
        let offset_x = x - (max_x - min_x) / 2;
        let offset_y = y - (max_y - min_y) / 2;
        for glyph in glyphs {
            if let Some(bb) = glyph.pixel_bounding_box() {
                glyph.draw(|gx, gy, v| {
                    let px = offset_x + gx as i32 + bb.min.x - min_x;
                    let py = offset_y + gy as i32 + bb.min.y - min_y;
                    frame.plot(px as i64, py as i64, self.color, v);
                });
            }
        }
    }

    fn layout(&self, text: &str) -> Vec<PositionedGlyph<'static>> {
        let v_metrics = self.font.v_metrics(self.scale);
        self.font
            .layout(text, self.scale, point(0.0, v_metrics.ascent))
            .collect()
    }
}

/// Pixel bounding box of a laid out string.
fn bounds(glyphs: &[PositionedGlyph]) -> (i32, i32, i32, i32) {
    glyphs.iter().filter_map(|g| g.pixel_bounding_box()).fold(
        (i32::MAX, i32::MIN, i32::MAX, i32::MIN),
        |(min_x, max_x, min_y, max_y), bb| {
            (
                min_x.min(bb.min.x),
                max_x.max(bb.max.x),
                min_y.min(bb.min.y),
                max_y.max(bb.max.y),
            )
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_font_is_an_error() {
        let err = StatusOverlay::from_file(Path::new("/nonexistent/font.ttf"), 20.0, Color::new(0, 0, 0))
            .err()
            .expect("no font there");
        assert!(format!("{err:#}").contains("font.ttf"));
    }

    #[test]
    fn garbage_is_not_a_font() {
        let path = std::env::temp_dir().join("instrument-panel-not-a-font.ttf");
        std::fs::write(&path, b"definitely not a font").expect("temp file");
        let result = StatusOverlay::from_file(&path, 20.0, Color::new(0, 0, 0));
        let _ = std::fs::remove_file(&path);
        assert!(result.is_err());
    }

    #[test]
    fn text_lands_inside_the_frame() {
        // Needs a real font; skipped on machines without DejaVu
        let path = Path::new("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf");
        if !path.exists() {
            return;
        }
        let overlay = StatusOverlay::from_file(path, 24.0, Color::new(0xff, 0, 0)).expect("usable font");
        let mut frame = Surface::filled(200, 60, Color::new(0, 0, 0));
        overlay.draw_centered(&mut frame, 100, 30, "Waiting");

        let lit: Vec<(usize, usize)> = (0..60)
            .flat_map(|y| (0..200).map(move |x| (x, y)))
            .filter(|&(x, y)| frame.pixel(x, y).is_some_and(|p| p[0] > 0))
            .collect();
        assert!(!lit.is_empty());
        // Centred: ink on both sides of the anchor
        assert!(lit.iter().any(|&(x, _)| x < 100));
        assert!(lit.iter().any(|&(x, _)| x > 100));
    }
}
