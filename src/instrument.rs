//! Shared gauge lifecycle.
//!
//! Every gauge embeds an [`InstrumentBase`] holding its placement, scale
//! factor and bitmap cache. The cache is laid out by convention:
//!
//! - slot 0: the decoded source asset
//! - slot 1: the destination the composition is evaluated onto
//! - slot 2 and up: regions cut from the source, scaled or not
//!
//! A resize clears the cache and rebuilds it for the new size. If the source
//! asset cannot be loaded the gauge is degraded for good and never draws.

use std::time::Instant;

use log::{info, warn};

use crate::assets::Assets;
use crate::bus::VariableBus;
use crate::compositor::Composition;
use crate::config::{Placement, Placements};
use crate::graphics::{BlendMode, Rect, Surface};
use crate::knobs::KnobInput;

pub const SOURCE: usize = 0;
pub const DESTINATION: usize = 1;

/// Everything a gauge may touch during `update`.
pub struct Context<'a> {
    pub bus: &'a mut dyn VariableBus,
    /// `None` when hardware knobs are disabled.
    pub knobs: Option<&'a mut dyn KnobInput>,
    pub placements: &'a mut Placements,
    pub assets: &'a mut Assets,
    pub now: Instant,
}

/// Render-time options.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct View {
    /// When false the gauge is dimmed after drawing.
    pub active: bool,
    pub shadows: bool,
    pub dim_factor: f32,
}

impl Default for View {
    fn default() -> Self {
        Self {
            active: true,
            shadows: true,
            dim_factor: 0.4,
        }
    }
}

pub trait Instrument {
    fn base(&self) -> &InstrumentBase;
    fn base_mut(&mut self) -> &mut InstrumentBase;

    fn name(&self) -> &str {
        self.base().name()
    }

    /// Rebuild the bitmap cache for the current size.
    fn resize(&mut self, assets: &mut Assets);

    /// Poll placement, knobs and the bus, then recompute derived state.
    fn update(&mut self, ctx: &mut Context);

    /// The layers making up the next frame.
    fn composition(&self, view: &View) -> Composition;

    /// Draw onto `frame` at the gauge's placement.
    fn render(&mut self, frame: &mut Surface, view: &View) {
        if !self.base().is_ready() {
            return;
        }
        let composition = self.composition(view);
        self.base_mut().present(&composition, frame, view);
    }
}

pub struct InstrumentBase {
    name: &'static str,
    placement: Placement,
    base_width: f32,
    aspect: f32,
    scale_factor: f32,
    bitmaps: Vec<Surface>,
    sized: bool,
    degraded: bool,
}

impl InstrumentBase {
    /// `base_width` is the width the layout coordinates are written for;
    /// the height is `aspect` times the width.
    pub fn new(name: &'static str, placement: Placement, base_width: f32, aspect: f32) -> Self {
        Self {
            name,
            placement,
            base_width,
            aspect,
            scale_factor: 1.0,
            bitmaps: Vec::new(),
            sized: false,
            degraded: false,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn placement(&self) -> Placement {
        self.placement
    }

    pub fn scale_factor(&self) -> f32 {
        self.scale_factor
    }

    pub fn bitmaps(&self) -> &[Surface] {
        &self.bitmaps
    }

    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// Cache built and destination present.
    pub fn is_ready(&self) -> bool {
        !self.degraded && self.bitmaps.len() > DESTINATION
    }

    /// Pixel size of the destination for the current placement.
    pub fn extent(&self) -> (usize, usize) {
        let w = self.placement.size.max(1) as f32;
        (w as usize, (w * self.aspect).round().max(1.0) as usize)
    }

    /// Read this gauge's placement. Returns true when the cache has to be
    /// rebuilt.
    pub fn sync_placement(&mut self, placements: &mut Placements) -> bool {
        let placement = placements.read(self.name, self.placement);
        let resized = placement.size != self.placement.size || !self.sized;
        self.placement = placement;
        resized && !self.degraded
    }

    /// Clear the cache, recompute the scale factor and load `file` into the
    /// source slot. Returns false if the gauge is or just became degraded.
    pub fn begin_resize(&mut self, assets: &mut Assets, file: &str) -> bool {
        self.bitmaps.clear();
        self.sized = true;
        if self.degraded {
            return false;
        }
        self.scale_factor = self.placement.size.max(1) as f32 / self.base_width;

        let source = match assets.load(file) {
            Ok(source) => source,
            Err(err) => {
                warn!("{}: {:#}, instrument disabled", self.name, err);
                self.degraded = true;
                return false;
            }
        };
        let (w, h) = self.extent();
        self.bitmaps.push(source);
        self.bitmaps.push(Surface::new(w, h));
        info!("{}: sized {}x{} (scale {:.3})", self.name, w, h, self.scale_factor);
        true
    }

    /// Cut `region` from the source unscaled. Returns its cache slot.
    pub fn add_region(&mut self, region: Rect) -> usize {
        self.cut(region, 1.0)
    }

    /// Cut `region` from the source scaled to the current size.
    pub fn add_scaled(&mut self, region: Rect) -> usize {
        self.cut(region, self.scale_factor)
    }

    fn cut(&mut self, region: Rect, factor: f32) -> usize {
        let w = (region.w * factor).round().max(1.0) as usize;
        let h = (region.h * factor).round().max(1.0) as usize;
        let mut piece = Surface::new(w, h);
        if let Some(source) = self.bitmaps.get(SOURCE) {
            piece.draw_scaled(
                source,
                region,
                Rect::new(0.0, 0.0, w as f32, h as f32),
                BlendMode::Normal,
            );
        }
        self.bitmaps.push(piece);
        self.bitmaps.len() - 1
    }

    /// Evaluate `composition` onto the destination slot and blit it to the
    /// frame, dimming it when the panel is inactive.
    pub fn present(&mut self, composition: &Composition, frame: &mut Surface, view: &View) {
        if !self.is_ready() {
            return;
        }
        let mut dest = std::mem::replace(&mut self.bitmaps[DESTINATION], Surface::new(0, 0));
        dest.clear_transparent();
        composition.render(&self.bitmaps, &mut dest);

        let (x, y) = (self.placement.x as f32, self.placement.y as f32);
        frame.blit(&dest, x, y);
        if !view.active {
            let area = Rect::new(x, y, dest.width() as f32, dest.height() as f32);
            frame.darken(area, view.dim_factor);
        }
        self.bitmaps[DESTINATION] = dest;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Color;

    fn assets_with(name: &str) -> Assets {
        let mut assets = Assets::new("/nonexistent");
        assets.insert(name, Surface::filled(1600, 800, Color::new(0x80, 0x80, 0x80)));
        assets
    }

    #[test]
    fn first_sync_requests_resize() {
        let mut placements = Placements::new();
        let mut base = InstrumentBase::new("HI", Placement::new(0, 0, 400), 800.0, 1.0);
        assert!(base.sync_placement(&mut placements));
        base.begin_resize(&mut assets_with("hi.bmp"), "hi.bmp");
        assert!(!base.sync_placement(&mut placements));

        placements.nudge("HI", 0, 0, 100, 100);
        assert!(base.sync_placement(&mut placements));
    }

    #[test]
    fn resize_scales_regions() {
        let mut base = InstrumentBase::new("HI", Placement::new(0, 0, 400), 800.0, 1.0);
        assert!(base.begin_resize(&mut assets_with("hi.bmp"), "hi.bmp"));
        assert_eq!(base.scale_factor(), 0.5);

        let scaled = base.add_scaled(Rect::new(800.0, 0.0, 800.0, 800.0));
        let raw = base.add_region(Rect::new(1600.0, 0.0, 80.0, 80.0));
        assert_eq!((scaled, raw), (2, 3));
        assert_eq!(base.bitmaps()[scaled].width(), 400);
        assert_eq!(base.bitmaps()[raw].width(), 80);
        assert_eq!(base.bitmaps()[DESTINATION].width(), 400);
    }

    #[test]
    fn wide_gauge_keeps_aspect() {
        let mut base = InstrumentBase::new("Nav", Placement::new(0, 0, 800), 1600.0, 0.25);
        assert!(base.begin_resize(&mut assets_with("nav.png"), "nav.png"));
        assert_eq!(base.extent(), (800, 200));
    }

    #[test]
    fn missing_asset_degrades_for_good() {
        let mut assets = Assets::new("/nonexistent");
        let mut placements = Placements::new();
        let mut base = InstrumentBase::new("VOR1", Placement::new(0, 0, 400), 800.0, 1.0);
        assert!(base.sync_placement(&mut placements));
        assert!(!base.begin_resize(&mut assets, "vor1.png"));
        assert!(base.is_degraded());
        assert!(!base.is_ready());

        placements.nudge("VOR1", 0, 0, 50, 100);
        assert!(!base.sync_placement(&mut placements));

        let mut frame = Surface::new(10, 10);
        base.present(&Composition::new(0.5), &mut frame, &View::default());
        assert_eq!(frame, Surface::new(10, 10));
    }

    #[test]
    fn inactive_panel_dims_gauge() {
        let mut assets = Assets::new("/nonexistent");
        assets.insert("x.png", Surface::filled(8, 8, Color::new(200, 200, 200)));
        let mut base = InstrumentBase::new("X", Placement::new(0, 0, 8), 8.0, 1.0);
        base.begin_resize(&mut assets, "x.png");
        let mut comp = Composition::new(1.0);
        comp.region(SOURCE, Rect::new(0.0, 0.0, 8.0, 8.0), 0.0, 0.0);

        let mut frame = Surface::new(8, 8);
        let view = View {
            active: false,
            shadows: true,
            dim_factor: 0.5,
        };
        base.present(&comp, &mut frame, &view);
        assert_eq!(frame.pixel(4, 4), Some([100, 100, 100, 0xff]));
    }
}
