use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use bon::Builder;

/// Color representation for panel elements
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Raw encoder ticks per logical detent.
pub const DETENT_TICKS: i32 = 2;

/// Seconds without an adjust-knob reading before the edit place resets.
pub const ADJUST_IDLE_SECS: u64 = 5;

/// Panel-wide settings shared by the driver and every instrument
#[derive(Debug, Clone, Builder)]
pub struct PanelConfig {
    // Window configuration
    #[builder(default = 1600)]
    pub window_width: usize,
    #[builder(default = 1000)]
    pub window_height: usize,
    #[builder(default = 60.0)]
    pub max_framerate: f64,

    // Assets
    #[builder(default = PathBuf::from("bitmaps"))]
    pub asset_dir: PathBuf,

    // Rendering
    #[builder(default = true)]
    pub enable_shadows: bool,
    #[builder(default = 0.4)]
    pub dim_factor: f32,
    #[builder(default = Color::new(0x00, 0x00, 0x00))]
    pub background_color: Color,
    #[builder(default = Color::new(0xff, 0x40, 0x40))]
    pub status_color: Color,
    #[builder(default = 36.0)]
    pub status_font_size: f32,

    // Knobs
    #[builder(default = true)]
    pub hardware_knobs: bool,
    #[builder(default = Duration::from_secs(ADJUST_IDLE_SECS))]
    pub adjust_idle_timeout: Duration,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Position and size of one instrument on the panel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub x: i32,
    pub y: i32,
    pub size: i32,
}

impl Placement {
    pub const fn new(x: i32, y: i32, size: i32) -> Self {
        Self { x, y, size }
    }
}

/// Per-instrument placement settings, keyed by instrument name.
///
/// Instruments read their entry once per tick; the first read of an unknown
/// name stores the instrument's own placement as the default.
#[derive(Debug, Clone, Default)]
pub struct Placements {
    entries: HashMap<String, Placement>,
}

impl Placements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn read(&mut self, name: &str, default: Placement) -> Placement {
        *self.entries.entry(name.to_string()).or_insert(default)
    }

    pub fn get(&self, name: &str) -> Option<Placement> {
        self.entries.get(name).copied()
    }

    pub fn set(&mut self, name: &str, placement: Placement) {
        self.entries.insert(name.to_string(), placement);
    }

    /// Move an instrument by `(dx, dy)` and grow it by `dsize`. The size
    /// never drops below `min_size`.
    pub fn nudge(&mut self, name: &str, dx: i32, dy: i32, dsize: i32, min_size: i32) {
        if let Some(p) = self.entries.get_mut(name) {
            p.x += dx;
            p.y += dy;
            p.size = (p.size + dsize).max(min_size);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults_match_panel_constants() {
        let config = PanelConfig::builder().enable_shadows(false).build();
        assert!(!config.enable_shadows);
        assert_eq!(config.adjust_idle_timeout, Duration::from_secs(5));
    }

    #[test]
    fn first_read_stores_default_then_sticks() {
        let mut placements = Placements::new();
        let p = placements.read("HI", Placement::new(10, 20, 400));
        assert_eq!(p, Placement::new(10, 20, 400));

        placements.nudge("HI", 5, 0, -500, 100);
        let p = placements.read("HI", Placement::new(0, 0, 800));
        assert_eq!(p, Placement::new(15, 20, 100));
    }
}
