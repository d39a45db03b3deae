//! Heading indicator with a heading bug.

use crate::assets::Assets;
use crate::bus::{vars, BusEvent, Snapshot, VariableBus};
use crate::compositor::{dial_angle, Composition};
use crate::config::Placement;
use crate::graphics::{BlendMode, Rect};
use crate::instrument::{Context, Instrument, InstrumentBase, View};
use crate::knobs::{Encoder, KnobInput, KnobPins};

pub const NAME: &str = "HI";
const ASSET: &str = "hi.bmp";
const BASE: f32 = 800.0;

const DIAL: usize = 2;
const PLANE: usize = 3;
const BUG: usize = 4;
const BUG_SHADOW: usize = 5;

pub struct HeadingIndicator {
    base: InstrumentBase,
    knob: Option<Encoder>,
    heading: f64,
    bug: f64,
    angle: f32,
    bug_angle: f32,
}

impl HeadingIndicator {
    pub fn new(placement: Placement, bus: &mut dyn VariableBus, knobs: Option<&mut dyn KnobInput>) -> Self {
        bus.add_variable(NAME, vars::HEADING, false, 180.0, 180.0);
        bus.add_variable(NAME, vars::AP_HEADING, false, 0.0, 0.0);

        Self {
            base: InstrumentBase::new(NAME, placement, BASE, 1.0),
            knob: knobs.map(|k| Encoder::new(k.add(KnobPins::encoder(2, 3)))),
            heading: 0.0,
            bug: 0.0,
            angle: 0.0,
            bug_angle: 0.0,
        }
    }

    pub fn heading(&self) -> f64 {
        self.heading
    }

    pub fn bug(&self) -> f64 {
        self.bug
    }

    fn update_knobs(&mut self, knobs: &mut dyn KnobInput, bus: &mut dyn VariableBus) {
        let Some(knob) = self.knob.as_mut() else {
            return;
        };
        match knob.poll(knobs) {
            Some(steps) if steps != 0 => {
                let bug = (self.bug.round() as i32 + steps).rem_euclid(360);
                self.bug = bug as f64;
                bus.write(BusEvent::HeadingBugSet(self.bug));
            }
            _ => {}
        }
    }

    fn read(&mut self, snapshot: &Snapshot) {
        self.heading = snapshot.get(vars::HEADING);
        self.bug = snapshot.get(vars::AP_HEADING);
        self.angle = dial_angle(self.heading);
        self.bug_angle = -dial_angle(self.bug - self.heading);
    }
}

impl Instrument for HeadingIndicator {
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
        self.base.add_region(Rect::new(0.0, 0.0, 800.0, 800.0));
        self.base.add_scaled(Rect::new(800.0, 0.0, 800.0, 800.0));
        self.base.add_region(Rect::new(1600.0, 0.0, 80.0, 80.0));
        self.base.add_region(Rect::new(1600.0, 400.0, 80.0, 80.0));
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

    fn composition(&self, view: &View) -> Composition {
        let mut comp = Composition::new(self.base.scale_factor());
        comp.rotated(DIAL, (800.0, 800.0), (400.0, 400.0), (400.0, 400.0), self.angle, BlendMode::Normal);
        comp.prescaled(PLANE, Rect::new(0.0, 0.0, 800.0, 800.0));
        if view.shadows {
            comp.rotated(BUG_SHADOW, (80.0, 80.0), (40.0, 400.0), (410.0, 408.0), self.bug_angle, BlendMode::Multiply);
        }
        comp.rotated(BUG, (80.0, 80.0), (40.0, 400.0), (400.0, 400.0), self.bug_angle, BlendMode::Normal);
        comp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::SimulatedBus;
    use crate::knobs::VirtualKnobs;

    #[test]
    fn bug_angle_is_relative_to_heading() {
        let mut bus = SimulatedBus::still();
        let mut hi = HeadingIndicator::new(Placement::new(0, 0, 400), &mut bus, None);
        bus.set(vars::HEADING, 90.0);
        bus.set(vars::AP_HEADING, 180.0);
        bus.update();
        hi.read(bus.snapshot());

        assert!((hi.angle + std::f32::consts::FRAC_PI_2).abs() < 1e-6);
        assert!((hi.bug_angle - std::f32::consts::FRAC_PI_2).abs() < 1e-6);
    }

    #[test]
    fn knob_moves_bug_and_wraps() {
        let mut bus = SimulatedBus::still();
        let mut knobs = VirtualKnobs::new();
        let mut hi = HeadingIndicator::new(Placement::new(0, 0, 400), &mut bus, Some(&mut knobs));
        let handle = knobs.find(2).expect("heading knob");

        bus.set(vars::AP_HEADING, 358.0);
        bus.update();
        hi.read(bus.snapshot());

        knobs.turn(handle, 6);
        hi.update_knobs(&mut knobs, &mut bus);
        bus.update();
        assert_eq!(bus.snapshot().get(vars::AP_HEADING), 1.0);
    }

    #[test]
    fn shadow_layer_only_with_shadows() {
        let mut bus = SimulatedBus::still();
        let hi = HeadingIndicator::new(Placement::new(0, 0, 400), &mut bus, None);
        let with = hi.composition(&View::default());
        let without = hi.composition(&View {
            shadows: false,
            ..View::default()
        });
        assert_eq!(with.layers().len(), 4);
        assert_eq!(with.layers()[2].blend, BlendMode::Multiply);
        assert_eq!(without.layers().len(), 3);
    }
}
