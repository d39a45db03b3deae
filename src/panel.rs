//! The gauge collection and the per-tick driver.

use std::time::Instant;

use log::info;

use crate::assets::Assets;
use crate::bus::VariableBus;
use crate::config::{PanelConfig, Placement, Placements};
use crate::graphics::Surface;
use crate::instrument::{Context, Instrument, View};
use crate::knobs::{reborrow, KnobInput};
use crate::overlay::StatusOverlay;

/// Smallest size an instrument can be shrunk to from the keyboard.
pub const MIN_SIZE: i32 = 100;

pub struct Panel {
    config: PanelConfig,
    instruments: Vec<Box<dyn Instrument>>,
    placements: Placements,
    assets: Assets,
    overlay: Option<StatusOverlay>,
    active: bool,
    focus: usize,
}

impl Panel {
    pub fn new(config: PanelConfig, instruments: Vec<Box<dyn Instrument>>) -> Self {
        let assets = Assets::new(config.asset_dir.clone());
        Self {
            config,
            instruments,
            placements: Placements::new(),
            assets,
            overlay: None,
            active: true,
            focus: 0,
        }
    }

    pub fn with_overlay(mut self, overlay: StatusOverlay) -> Self {
        self.overlay = Some(overlay);
        self
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn instruments(&self) -> &[Box<dyn Instrument>] {
        &self.instruments
    }

    pub fn assets_mut(&mut self) -> &mut Assets {
        &mut self.assets
    }

    pub fn placements(&self) -> &Placements {
        &self.placements
    }

    pub fn placements_mut(&mut self) -> &mut Placements {
        &mut self.placements
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Inactive panels are drawn dimmed.
    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    pub fn focused(&self) -> Option<&str> {
        self.instruments.get(self.focus).map(|i| i.name())
    }

    /// Move keyboard focus to the next instrument.
    pub fn focus_next(&mut self) {
        if !self.instruments.is_empty() {
            self.focus = (self.focus + 1) % self.instruments.len();
        }
        if let Some(name) = self.focused() {
            info!("focus on {}", name);
        }
    }

    /// Move and resize the focused instrument. Takes effect on the next tick.
    pub fn nudge_focused(&mut self, dx: i32, dy: i32, dsize: i32) {
        let Some(instrument) = self.instruments.get(self.focus) else {
            return;
        };
        let name = instrument.name().to_string();
        self.placements.nudge(&name, dx, dy, dsize, MIN_SIZE);
        if let Some(Placement { x, y, size }) = self.placements.get(&name) {
            info!("{} at ({}, {}) size {}", name, x, y, size);
        }
    }

    /// One display tick: refresh the bus, then update and draw every gauge
    /// in order. Returns the bus connectivity flag.
    pub fn tick(
        &mut self,
        bus: &mut dyn VariableBus,
        mut knobs: Option<&mut dyn KnobInput>,
        frame: &mut Surface,
        now: Instant,
    ) -> bool {
        let connected = bus.update();

        frame.clear(self.config.background_color);
        let view = View {
            active: self.active,
            shadows: self.config.enable_shadows,
            dim_factor: self.config.dim_factor,
        };

        for instrument in &mut self.instruments {
            let mut ctx = Context {
                bus: &mut *bus,
                knobs: reborrow(&mut knobs),
                placements: &mut self.placements,
                assets: &mut self.assets,
                now,
            };
            instrument.update(&mut ctx);
            instrument.render(frame, &view);
        }

        if !connected {
            if let Some(overlay) = &self.overlay {
                let x = frame.width() as i32 / 2;
                let y = frame.height() as i32 - 2 * self.config.status_font_size as i32;
                overlay.draw_centered(frame, x, y, "Waiting for simulator");
            }
        }
        connected
    }
}
