//! Elevator trim, flaps, landing gear and parking brake annunciator panel.

use std::time::{Duration, Instant};

use crate::assets::Assets;
use crate::bus::{vars, BusEvent, Snapshot, VariableBus};
use crate::compositor::Composition;
use crate::config::Placement;
use crate::graphics::Rect;
use crate::instrument::{Context, Instrument, InstrumentBase, View};
use crate::knobs::{KnobHandle, KnobInput, KnobPins};

pub const NAME: &str = "Trim Flaps";
const ASSET: &str = "trim-flaps.png";
const BASE: f32 = 800.0;

/// Travel of the flaps indicator between fully up and fully down.
const FLAPS_TRAVEL: f64 = 345.0;
const TRIM_LIMIT: f64 = 150.0;
/// Raw ticks the flaps knob has to move before a notch is taken.
const FLAPS_THRESHOLD: i32 = 6;
const FLAPS_WINDOW: Duration = Duration::from_secs(1);

const PANEL: usize = 2;
const TRIM: usize = 3;
const FLAPS: usize = 4;
const FLAPS_TARGET: usize = 5;
const GEAR: usize = 6;
const UNLOCKED: usize = 7;
const GEAR_DOWN: usize = 8;
const PARKING_BRAKE: usize = 9;

/// Left, centre and right leg: where the down glyph and UNLK go.
const LEGS: [(f32, f32); 3] = [(223.0, 214.0), (358.0, 350.0), (493.0, 486.0)];

/// Flaps knob state. A notch is taken once the knob has moved far enough
/// from where the current turn started.
#[derive(Debug)]
struct FlapsLever {
    handle: KnobHandle,
    anchor: i32,
    last_turn: Option<Instant>,
}

impl FlapsLever {
    fn feed(&mut self, raw: Option<i32>, now: Instant) -> Option<BusEvent> {
        let Some(raw) = raw else {
            if self
                .last_turn
                .is_some_and(|t| now.saturating_duration_since(t) > FLAPS_WINDOW)
            {
                self.last_turn = None;
            }
            return None;
        };

        let mut event = None;
        if self.last_turn.is_none() {
            self.anchor = raw;
        } else if self.anchor - raw > FLAPS_THRESHOLD {
            event = Some(BusEvent::FlapsIncrement);
            self.anchor = raw;
        } else if raw - self.anchor > FLAPS_THRESHOLD {
            event = Some(BusEvent::FlapsDecrement);
            self.anchor = raw;
        }
        self.last_turn = Some(now);
        event
    }
}

#[derive(Debug)]
struct TrimWheel {
    handle: KnobHandle,
    last: i32,
}

impl TrimWheel {
    fn feed(&mut self, raw: i32) -> Option<BusEvent> {
        let event = if raw > self.last {
            Some(BusEvent::ElevatorTrimDown)
        } else if raw < self.last {
            Some(BusEvent::ElevatorTrimUp)
        } else {
            None
        };
        self.last = raw;
        event
    }
}

pub struct TrimFlaps {
    base: InstrumentBase,
    trim_wheel: Option<TrimWheel>,
    flaps_lever: Option<FlapsLever>,
    trim_offset: f64,
    target_flaps: f64,
    flaps_offset: f64,
    gear_retractable: bool,
    gear: [f64; 3],
    parking_brake: bool,
}

impl TrimFlaps {
    pub fn new(placement: Placement, bus: &mut dyn VariableBus, knobs: Option<&mut dyn KnobInput>) -> Self {
        bus.add_variable(NAME, vars::ELEVATOR_TRIM, false, 2.0, 0.0);
        bus.add_variable(NAME, vars::FLAPS_COUNT, false, 0.0, 4.0);
        bus.add_variable(NAME, vars::FLAPS_INDEX, false, 0.0, 0.0);
        bus.add_variable(NAME, vars::GEAR_RETRACTABLE, true, 0.0, 1.0);
        bus.add_variable(NAME, vars::GEAR_LEFT, false, 0.0, 100.0);
        bus.add_variable(NAME, vars::GEAR_CENTRE, false, 0.0, 100.0);
        bus.add_variable(NAME, vars::GEAR_RIGHT, false, 0.0, 100.0);
        bus.add_variable(NAME, vars::PARKING_BRAKE, true, 0.0, 0.0);

        let (trim_wheel, flaps_lever) = match knobs {
            Some(knobs) => (
                Some(TrimWheel {
                    handle: knobs.add(KnobPins::encoder(14, 15)),
                    last: 0,
                }),
                Some(FlapsLever {
                    handle: knobs.add(KnobPins::encoder(18, 23)),
                    anchor: 0,
                    last_turn: None,
                }),
            ),
            None => (None, None),
        };

        Self {
            base: InstrumentBase::new(NAME, placement, BASE, 1.0),
            trim_wheel,
            flaps_lever,
            trim_offset: 0.0,
            target_flaps: 0.0,
            flaps_offset: 0.0,
            gear_retractable: false,
            gear: [0.0; 3],
            parking_brake: false,
        }
    }

    pub fn trim_offset(&self) -> f64 {
        self.trim_offset
    }

    pub fn target_flaps(&self) -> f64 {
        self.target_flaps
    }

    pub fn flaps_offset(&self) -> f64 {
        self.flaps_offset
    }

    fn update_knobs(&mut self, knobs: &mut dyn KnobInput, bus: &mut dyn VariableBus, now: Instant) {
        if let Some(wheel) = self.trim_wheel.as_mut() {
            if let Some(event) = knobs.read(wheel.handle).and_then(|raw| wheel.feed(raw)) {
                bus.write(event);
            }
        }
        if let Some(lever) = self.flaps_lever.as_mut() {
            let raw = knobs.read(lever.handle);
            if let Some(event) = lever.feed(raw, now) {
                bus.write(event);
            }
        }
    }

    fn read(&mut self, snapshot: &Snapshot) {
        self.trim_offset = (snapshot.get(vars::ELEVATOR_TRIM) * 20.0).clamp(-TRIM_LIMIT, TRIM_LIMIT);

        let count = snapshot.get(vars::FLAPS_COUNT);
        self.target_flaps = if count > 0.0 {
            FLAPS_TRAVEL * snapshot.get(vars::FLAPS_INDEX) / count
        } else {
            0.0
        };
        self.flaps_offset = approach(self.flaps_offset, self.target_flaps);

        self.gear_retractable = snapshot.flag(vars::GEAR_RETRACTABLE);
        self.gear = [
            snapshot.get(vars::GEAR_LEFT),
            snapshot.get(vars::GEAR_CENTRE),
            snapshot.get(vars::GEAR_RIGHT),
        ];
        self.parking_brake = snapshot.flag(vars::PARKING_BRAKE);
    }
}

/// Move the displayed flaps one animation step towards `target`.
fn approach(current: f64, target: f64) -> f64 {
    let diff = (target - current).abs();
    let step = if diff > 5.0 {
        2.5
    } else if diff > 1.25 {
        1.25
    } else {
        return target;
    };
    if current < target {
        current + step
    } else {
        current - step
    }
}

impl Instrument for TrimFlaps {
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
        self.base.add_scaled(Rect::new(800.0, 0.0, 40.0, 24.0));
        self.base.add_scaled(Rect::new(800.0, 24.0, 36.0, 36.0));
        self.base.add_scaled(Rect::new(800.0, 60.0, 36.0, 36.0));
        self.base.add_region(Rect::new(0.0, 800.0, 198.0, 44.0));
        self.base.add_region(Rect::new(198.0, 800.0, 104.0, 37.0));
        self.base.add_region(Rect::new(302.0, 800.0, 90.0, 70.0));
        self.base.add_region(Rect::new(392.0, 800.0, 251.0, 44.0));
    }

    fn update(&mut self, ctx: &mut Context) {
        if self.base.sync_placement(ctx.placements) {
            self.resize(ctx.assets);
        }
        if let Some(knobs) = ctx.knobs.as_deref_mut() {
            self.update_knobs(knobs, ctx.bus, ctx.now);
        }
        self.read(ctx.bus.snapshot());
    }

    fn composition(&self, _view: &View) -> Composition {
        let mut comp = Composition::new(self.base.scale_factor());
        comp.prescaled(PANEL, Rect::new(0.0, 0.0, 800.0, 800.0));
        comp.prescaled(TRIM, Rect::new(262.0, 301.0 + self.trim_offset as f32, 40.0, 24.0));
        comp.prescaled(FLAPS_TARGET, Rect::new(501.0, 161.0 + self.target_flaps as f32, 36.0, 36.0));
        comp.prescaled(FLAPS, Rect::new(501.0, 161.0 + self.flaps_offset as f32, 36.0, 36.0));

        if self.gear_retractable {
            comp.region(GEAR, Rect::new(0.0, 0.0, 198.0, 44.0), 227.0, 535.0);
            for (position, (down_x, unlocked_x)) in self.gear.iter().zip(LEGS) {
                if *position == 100.0 {
                    comp.region(GEAR_DOWN, Rect::new(0.0, 0.0, 90.0, 70.0), down_x, 590.0);
                } else if *position > 0.0 {
                    comp.region(UNLOCKED, Rect::new(0.0, 0.0, 104.0, 37.0), unlocked_x, 602.0);
                }
            }
        }

        if self.parking_brake {
            comp.region_to(
                PARKING_BRAKE,
                Rect::new(0.0, 0.0, 251.0, 44.0),
                Rect::new(277.0, 692.0, 254.0, 44.0),
            );
        }
        comp
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::SimulatedBus;
    use crate::knobs::VirtualKnobs;

    #[test]
    fn flaps_indicator_animates_towards_target() {
        let mut offset = 0.0;
        let mut steps = Vec::new();
        while offset != 8.0 {
            offset = approach(offset, 8.0);
            steps.push(offset);
        }
        assert_eq!(steps, [2.5, 5.0, 6.25, 7.5, 8.0]);
        assert_eq!(approach(10.0, 0.0), 7.5);
    }

    #[test]
    fn trim_offset_is_clamped() {
        let mut bus = SimulatedBus::still();
        let mut panel = TrimFlaps::new(Placement::new(0, 0, 400), &mut bus, None);
        bus.set(vars::ELEVATOR_TRIM, 9.0);
        bus.set(vars::FLAPS_COUNT, 3.0);
        bus.set(vars::FLAPS_INDEX, 1.0);
        bus.update();
        panel.read(bus.snapshot());
        assert_eq!(panel.trim_offset(), 150.0);
        assert_eq!(panel.target_flaps(), 115.0);
    }

    #[test]
    fn zero_flap_positions_do_not_divide_by_zero() {
        let mut bus = SimulatedBus::still();
        let mut panel = TrimFlaps::new(Placement::new(0, 0, 400), &mut bus, None);
        bus.set(vars::FLAPS_COUNT, 0.0);
        bus.update();
        panel.read(bus.snapshot());
        assert_eq!(panel.target_flaps(), 0.0);
    }

    #[test]
    fn gear_legs_show_down_or_unlocked() {
        let mut bus = SimulatedBus::still();
        let mut panel = TrimFlaps::new(Placement::new(0, 0, 800), &mut bus, None);
        bus.set(vars::GEAR_RETRACTABLE, 1.0);
        bus.set(vars::GEAR_LEFT, 100.0);
        bus.set(vars::GEAR_CENTRE, 40.0);
        bus.set(vars::GEAR_RIGHT, 0.0);
        bus.set(vars::PARKING_BRAKE, 1.0);
        bus.update();
        panel.read(bus.snapshot());

        let comp = panel.composition(&View::default());
        let sources: Vec<usize> = comp.layers().iter().map(|l| l.source).collect();
        assert_eq!(
            sources,
            [PANEL, TRIM, FLAPS_TARGET, FLAPS, GEAR, GEAR_DOWN, UNLOCKED, PARKING_BRAKE]
        );
        assert_eq!(comp.layers()[6].dst.x, 350.0);
        assert_eq!(comp.layers()[7].dst.w, 254.0);
    }

    #[test]
    fn trim_wheel_direction() {
        let mut bus = SimulatedBus::still();
        let mut knobs = VirtualKnobs::new();
        let mut panel = TrimFlaps::new(Placement::new(0, 0, 400), &mut bus, Some(&mut knobs));
        let wheel = knobs.find(14).expect("trim knob");
        let now = Instant::now();

        knobs.turn(wheel, 1);
        panel.update_knobs(&mut knobs, &mut bus, now);
        knobs.turn(wheel, 1);
        panel.update_knobs(&mut knobs, &mut bus, now);
        bus.update();
        assert_eq!(bus.snapshot().get(vars::ELEVATOR_TRIM), -1.0);

        knobs.turn(wheel, -1);
        panel.update_knobs(&mut knobs, &mut bus, now);
        bus.update();
        assert_eq!(bus.snapshot().get(vars::ELEVATOR_TRIM), -0.5);
    }

    #[test]
    fn flaps_need_a_long_turn_within_the_window() {
        let start = Instant::now();
        let mut knobs = VirtualKnobs::new();
        let mut lever = FlapsLever {
            handle: knobs.add(KnobPins::encoder(18, 23)),
            anchor: 0,
            last_turn: None,
        };
        assert_eq!(lever.feed(Some(-2), start), None);
        assert_eq!(lever.feed(Some(-8), start), None);
        assert_eq!(lever.feed(Some(-9), start), Some(BusEvent::FlapsIncrement));
        assert_eq!(lever.feed(Some(-2), start), Some(BusEvent::FlapsDecrement));

        // Idle past the window, the next reading only starts a new turn
        assert_eq!(lever.feed(None, start + Duration::from_secs(2)), None);
        assert_eq!(lever.feed(Some(20), start + Duration::from_secs(2)), None);
        assert_eq!(lever.feed(Some(27), start + Duration::from_secs(2)), Some(BusEvent::FlapsDecrement));
    }
}
