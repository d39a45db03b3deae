//! VOR1 course deviation indicator with glide slope.

use crate::assets::Assets;
use crate::bus::{vars, BusEvent, Snapshot, VariableBus};
use crate::compositor::{degrees_to_radians, Composition};
use crate::config::Placement;
use crate::graphics::{BlendMode, Rect};
use crate::instrument::{Context, Instrument, InstrumentBase, View};
use crate::knobs::{Encoder, KnobInput, KnobPins};

pub const NAME: &str = "VOR1";
const ASSET: &str = "vor1.png";
const BASE: f32 = 800.0;

/// Needle deflection limit in degrees.
const NEEDLE_LIMIT: f64 = 50.0;
/// OBS change per knob detent in degrees.
const OBS_STEP: i32 = 5;

const BACK: usize = 2;
const COMPASS: usize = 3;
const GS_FLAG: usize = 4;
const FROM: usize = 5;
const TO: usize = 6;
const LOC_NEEDLE: usize = 7;
const GS_NEEDLE: usize = 8;
const TOP_GUIDE: usize = 9;
const BOTTOM_GUIDE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToFrom {
    Off,
    To,
    From,
}

impl ToFrom {
    fn from_value(value: f64) -> Self {
        match value.round() as i32 {
            1 => ToFrom::To,
            2 => ToFrom::From,
            _ => ToFrom::Off,
        }
    }
}

pub struct Vor1 {
    base: InstrumentBase,
    knob: Option<Encoder>,
    obs: f64,
    compass_angle: f64,
    loc_angle: f64,
    slope_angle: f64,
    to_from: ToFrom,
    glide_slope: bool,
}

impl Vor1 {
    pub fn new(placement: Placement, bus: &mut dyn VariableBus, knobs: Option<&mut dyn KnobInput>) -> Self {
        bus.add_variable(NAME, vars::VOR1_OBS, false, 0.0, 90.0);
        bus.add_variable(NAME, vars::VOR1_RADIAL_ERROR, false, 4.0, 0.0);
        bus.add_variable(NAME, vars::VOR1_GLIDE_SLOPE_ERROR, false, 2.5, 0.0);
        bus.add_variable(NAME, vars::VOR1_TO_FROM, false, 0.0, 1.0);
        bus.add_variable(NAME, vars::VOR1_GS_FLAG, false, 0.0, 1.0);

        Self {
            base: InstrumentBase::new(NAME, placement, BASE, 1.0),
            knob: knobs.map(|k| Encoder::new(k.add(KnobPins::encoder(11, 5)))),
            obs: 0.0,
            compass_angle: 0.0,
            loc_angle: 0.0,
            slope_angle: 0.0,
            to_from: ToFrom::Off,
            glide_slope: false,
        }
    }

    pub fn loc_angle(&self) -> f64 {
        self.loc_angle
    }

    pub fn slope_angle(&self) -> f64 {
        self.slope_angle
    }

    pub fn to_from(&self) -> ToFrom {
        self.to_from
    }

    fn update_knobs(&mut self, knobs: &mut dyn KnobInput, bus: &mut dyn VariableBus) {
        let Some(knob) = self.knob.as_mut() else {
            return;
        };
        let adjust = knob.poll(knobs).unwrap_or(0) * OBS_STEP;
        if adjust != 0 {
            let obs = (self.obs + adjust as f64).rem_euclid(360.0);
            bus.write(BusEvent::Vor1ObsSet(obs));
        }
    }

    fn read(&mut self, snapshot: &Snapshot) {
        self.obs = snapshot.get(vars::VOR1_OBS);
        self.compass_angle = -self.obs;
        self.loc_angle = (-snapshot.get(vars::VOR1_RADIAL_ERROR) * 15.0).clamp(-NEEDLE_LIMIT, NEEDLE_LIMIT);
        self.slope_angle =
            (snapshot.get(vars::VOR1_GLIDE_SLOPE_ERROR) * 25.0).clamp(-NEEDLE_LIMIT, NEEDLE_LIMIT);
        self.to_from = ToFrom::from_value(snapshot.get(vars::VOR1_TO_FROM));
        self.glide_slope = snapshot.flag(vars::VOR1_GS_FLAG);
    }
}

impl Instrument for Vor1 {
    fn base(&self) -> &InstrumentBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut InstrumentBase {
        &mut self.base
    }

    fn resize(&mut self, assets: &mut Assets) {
        if !self.base.begin_resize(assets, ASSET) {
            return;
        }
        self.base.add_scaled(Rect::new(0.0, 0.0, 800.0, 800.0));
        self.base.add_region(Rect::new(800.0, 0.0, 800.0, 800.0));
        self.base.add_scaled(Rect::new(800.0, 800.0, 100.0, 50.0));
        self.base.add_scaled(Rect::new(900.0, 800.0, 100.0, 50.0));
        self.base.add_scaled(Rect::new(1000.0, 800.0, 100.0, 50.0));
        self.base.add_region(Rect::new(1600.0, 0.0, 30.0, 800.0));
        self.base.add_region(Rect::new(0.0, 800.0, 800.0, 30.0));
        self.base.add_scaled(Rect::new(1630.0, 0.0, 70.0, 180.0));
        self.base.add_scaled(Rect::new(1630.0, 180.0, 70.0, 180.0));
    }

    fn update(&mut self, ctx: &mut Context) {
        if self.base.sync_placement(ctx.placements) {
            self.resize(ctx.assets);
        }
        if let Some(knobs) = ctx.knobs.as_deref_mut() {
            self.update_knobs(knobs, ctx.bus);
        }
        self.read(ctx.bus.snapshot());
    }

    fn composition(&self, _view: &View) -> Composition {
        let mut comp = Composition::new(self.base.scale_factor());
        comp.prescaled(BACK, Rect::new(0.0, 0.0, 800.0, 800.0));

        if self.glide_slope {
            comp.prescaled(GS_FLAG, Rect::new(490.0, 335.0, 100.0, 50.0));
        }
        match self.to_from {
            ToFrom::To => comp.prescaled(TO, Rect::new(350.0, 549.0, 100.0, 50.0)),
            ToFrom::From => comp.prescaled(FROM, Rect::new(350.0, 549.0, 100.0, 50.0)),
            ToFrom::Off => {}
        }

        comp.rotated(
            LOC_NEEDLE,
            (30.0, 800.0),
            (15.0, 140.0),
            (400.0, 140.0),
            degrees_to_radians(self.loc_angle),
            BlendMode::Normal,
        );
        comp.rotated(
            GS_NEEDLE,
            (800.0, 30.0),
            (140.0, 15.0),
            (140.0, 400.0),
            degrees_to_radians(self.slope_angle),
            BlendMode::Normal,
        );
        comp.rotated(
            COMPASS,
            (800.0, 800.0),
            (400.0, 400.0),
            (400.0, 400.0),
            degrees_to_radians(self.compass_angle),
            BlendMode::Normal,
        );

        comp.prescaled(TOP_GUIDE, Rect::new(365.0, 0.0, 70.0, 180.0));
        comp.prescaled(BOTTOM_GUIDE, Rect::new(365.0, 620.0, 70.0, 180.0));
        comp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::SimulatedBus;
    use crate::knobs::VirtualKnobs;

    fn vor(bus: &mut SimulatedBus) -> Vor1 {
        Vor1::new(Placement::new(0, 0, 400), bus, None)
    }

    #[test]
    fn needles_clamp_at_limit() {
        let mut bus = SimulatedBus::still();
        let mut vor = vor(&mut bus);
        bus.set(vars::VOR1_RADIAL_ERROR, -10.0);
        bus.set(vars::VOR1_GLIDE_SLOPE_ERROR, 1.0);
        bus.update();
        vor.read(bus.snapshot());
        assert_eq!(vor.loc_angle(), 50.0);
        assert_eq!(vor.slope_angle(), 25.0);

        bus.set(vars::VOR1_GLIDE_SLOPE_ERROR, -3.0);
        bus.update();
        vor.read(bus.snapshot());
        assert_eq!(vor.slope_angle(), -50.0);
    }

    #[test]
    fn flags_select_annunciators() {
        let mut bus = SimulatedBus::still();
        let mut vor = vor(&mut bus);
        bus.set(vars::VOR1_TO_FROM, 2.0);
        bus.set(vars::VOR1_GS_FLAG, 0.0);
        bus.update();
        vor.read(bus.snapshot());
        assert_eq!(vor.to_from(), ToFrom::From);

        let sources: Vec<usize> = vor
            .composition(&View::default())
            .layers()
            .iter()
            .map(|l| l.source)
            .collect();
        assert_eq!(sources, [BACK, FROM, LOC_NEEDLE, GS_NEEDLE, COMPASS, TOP_GUIDE, BOTTOM_GUIDE]);
    }

    #[test]
    fn obs_knob_steps_five_degrees_and_wraps() {
        let mut bus = SimulatedBus::still();
        let mut knobs = VirtualKnobs::new();
        let mut vor = Vor1::new(Placement::new(0, 0, 400), &mut bus, Some(&mut knobs));
        let handle = knobs.find(11).expect("obs knob");
        bus.set(vars::VOR1_OBS, 5.0);
        bus.update();
        vor.read(bus.snapshot());

        knobs.turn(handle, -4);
        vor.update_knobs(&mut knobs, &mut bus);
        bus.update();
        assert_eq!(bus.snapshot().get(vars::VOR1_OBS), 355.0);
    }
}
