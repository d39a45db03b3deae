//! Radio stack and autopilot panel.
//!
//! Two knobs drive the whole panel. The select knob walks a ring of
//! sub-panels (radios, ADF and transponder, then the autopilot entries when
//! an autopilot is fitted) and its push button runs the action of the
//! selected entry. The adjust knob edits the selected value one place at a
//! time; its push button moves to the next place.

use std::time::{Duration, Instant};

use log::debug;

use crate::adjust::{self, alt_change_settled, squawk_digits, Field};
use crate::assets::Assets;
use crate::bus::{vars, BusEvent, Radio, Snapshot, VariableBus};
use crate::compositor::{Composition, DigitStrip, DotGlyph};
use crate::config::{Placement, ADJUST_IDLE_SECS};
use crate::graphics::Rect;
use crate::instrument::{Context, Instrument, InstrumentBase, View};
use crate::knobs::{Button, Encoder, KnobInput, KnobPins};
use crate::selector::SwitchSelector;

pub const NAME: &str = "Nav";
const ASSET: &str = "nav.png";
const BASE: f32 = 1600.0;

/// Entries on the radio page.
const RADIO_ENTRIES: usize = 6;
/// Entries once the autopilot page is reachable.
const AUTOPILOT_ENTRIES: usize = 11;

const NAV_PANEL: usize = 2;
const AP_PANEL: usize = 3;
const DIGITS: usize = 4;
const DOT: usize = 5;
const SWITCH: usize = 6;
const XPDR_SELECTED: usize = 7;
const XPDR: usize = 8;
const AP_SWITCHES: usize = 9;
const AP_DISPLAY: usize = 10;
const VS_DIGITS: usize = 11;
const FPM: usize = 12;
const MINUS: usize = 13;

const STRIP: DigitStrip = DigitStrip {
    source: DIGITS,
    glyph_w: 38.0,
    glyph_h: 80.0,
};
const VS_STRIP: DigitStrip = DigitStrip {
    source: VS_DIGITS,
    glyph_w: 32.0,
    glyph_h: 50.0,
};
const POINT: DotGlyph = DotGlyph {
    source: DOT,
    w: 20.0,
    h: 80.0,
};

/// Switch indicator position for radio entries 0 to 4.
const SWITCH_POSITIONS: [(f32, f32); 5] = [
    (460.0, 104.0),
    (1064.0, 104.0),
    (460.0, 233.0),
    (1064.0, 233.0),
    (460.0, 363.0),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpeedMode {
    None,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingMode {
    None,
    Set,
    LevelFlight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AltitudeMode {
    None,
    Hold,
    Pitch,
    VerticalSpeed,
    /// Climbing or descending to a new target; reverts to `Hold` near it.
    Change,
}

/// Snapshot values in the integer encodings the panel edits and shows.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Readout {
    com: [i32; 2],
    com_standby: [i32; 2],
    nav: [i32; 2],
    nav_standby: [i32; 2],
    adf: i32,
    adf_standby: i32,
    squawk: i32,
    airspeed: i32,
    mach: f64,
    mach_x100: i32,
    heading: i32,
    altitude: i32,
    vertical_speed: i32,
    indicated_airspeed: f64,
    indicated_altitude: f64,
    ap_available: bool,
    ap_engaged: bool,
}

impl Readout {
    fn from_snapshot(snapshot: &Snapshot) -> Self {
        let com = |name| ((snapshot.get(name) + 0.0000001) * 1000.0) as i32;
        let nav = |name| ((snapshot.get(name) + 0.0000001) * 100.0) as i32;
        let rounded = |name| (snapshot.get(name) + 0.5) as i32;
        Self {
            com: [com(vars::COM1_ACTIVE), com(vars::COM2_ACTIVE)],
            com_standby: [com(vars::COM1_STANDBY), com(vars::COM2_STANDBY)],
            nav: [nav(vars::NAV1_ACTIVE), nav(vars::NAV2_ACTIVE)],
            nav_standby: [nav(vars::NAV1_STANDBY), nav(vars::NAV2_STANDBY)],
            adf: snapshot.get(vars::ADF_ACTIVE).round() as i32,
            adf_standby: snapshot.get(vars::ADF_STANDBY).round() as i32,
            squawk: snapshot.get(vars::TRANSPONDER_CODE).round() as i32,
            airspeed: rounded(vars::AP_AIRSPEED),
            mach: snapshot.get(vars::AP_MACH),
            mach_x100: (snapshot.get(vars::AP_MACH) * 100.0 + 0.5) as i32,
            heading: rounded(vars::AP_HEADING).rem_euclid(360),
            altitude: rounded(vars::AP_ALTITUDE),
            vertical_speed: snapshot.get(vars::AP_VERTICAL_SPEED) as i32,
            indicated_airspeed: snapshot.get(vars::AIRSPEED),
            indicated_altitude: snapshot.get(vars::INDICATED_ALTITUDE),
            ap_available: snapshot.flag(vars::AP_AVAILABLE),
            ap_engaged: snapshot.flag(vars::AP_MASTER),
        }
    }
}

#[derive(Debug)]
struct NavKnobs {
    select: Encoder,
    select_push: Button,
    adjust: Encoder,
    adjust_push: Button,
}

impl NavKnobs {
    fn add(knobs: &mut dyn KnobInput) -> Self {
        Self {
            select: Encoder::new(knobs.add(KnobPins::encoder(8, 7))),
            select_push: Button::new(knobs.add(KnobPins::button(12))),
            adjust: Encoder::new(knobs.add(KnobPins::encoder(20, 21))),
            adjust_push: Button::new(knobs.add(KnobPins::button(16))),
        }
    }
}

pub struct Nav {
    base: InstrumentBase,
    knobs: Option<NavKnobs>,
    selector: SwitchSelector,
    readout: Readout,
    speed: SpeedMode,
    heading_mode: HeadingMode,
    altitude_mode: AltitudeMode,
    show_mach: bool,
    transponder_state: usize,
}

impl Nav {
    pub fn new(placement: Placement, bus: &mut dyn VariableBus, knobs: Option<&mut dyn KnobInput>) -> Self {
        Self::with_idle_timeout(placement, bus, knobs, Duration::from_secs(ADJUST_IDLE_SECS))
    }

    pub fn with_idle_timeout(
        placement: Placement,
        bus: &mut dyn VariableBus,
        knobs: Option<&mut dyn KnobInput>,
        idle_timeout: Duration,
    ) -> Self {
        let registrations: [(&str, f64, f64); 26] = [
            (vars::COM1_ACTIVE, 0.0, 118.3),
            (vars::COM1_STANDBY, 0.0, 121.5),
            (vars::NAV1_ACTIVE, 0.0, 110.5),
            (vars::NAV1_STANDBY, 0.0, 113.9),
            (vars::COM2_ACTIVE, 0.0, 124.35),
            (vars::COM2_STANDBY, 0.0, 118.0),
            (vars::NAV2_ACTIVE, 0.0, 109.2),
            (vars::NAV2_STANDBY, 0.0, 115.8),
            (vars::ADF_ACTIVE, 0.0, 350.0),
            (vars::ADF_STANDBY, 0.0, 1_250.0),
            (vars::TRANSPONDER_CODE, 0.0, 0x1200 as f64),
            (vars::AP_AVAILABLE, 0.0, 1.0),
            (vars::AP_MASTER, 0.0, 0.0),
            (vars::AP_HEADING, 0.0, 0.0),
            (vars::AP_HEADING_LOCK, 0.0, 0.0),
            (vars::AP_WING_LEVELER, 0.0, 0.0),
            (vars::AP_ALTITUDE, 0.0, 3_000.0),
            (vars::AP_ALTITUDE_LOCK, 0.0, 0.0),
            (vars::AP_PITCH_HOLD, 0.0, 0.0),
            (vars::AP_VERTICAL_SPEED, 0.0, 0.0),
            (vars::AP_VERTICAL_HOLD, 0.0, 0.0),
            (vars::AP_AIRSPEED, 0.0, 110.0),
            (vars::AP_MACH, 0.0, 0.18),
            (vars::AP_AIRSPEED_HOLD, 0.0, 0.0),
            (vars::AIRSPEED, 20.0, 110.0),
            (vars::INDICATED_ALTITUDE, 400.0, 3_000.0),
        ];
        for (name, scale, offset) in registrations {
            bus.add_variable(NAME, name, false, scale, offset);
        }

        Self {
            base: InstrumentBase::new(NAME, placement, BASE, 0.25),
            knobs: knobs.map(NavKnobs::add),
            selector: SwitchSelector::new(RADIO_ENTRIES, idle_timeout),
            readout: Readout::default(),
            speed: SpeedMode::None,
            heading_mode: HeadingMode::None,
            altitude_mode: AltitudeMode::None,
            show_mach: false,
            transponder_state: 0,
        }
    }

    pub fn selector(&self) -> &SwitchSelector {
        &self.selector
    }

    pub fn speed_mode(&self) -> SpeedMode {
        self.speed
    }

    pub fn heading_mode(&self) -> HeadingMode {
        self.heading_mode
    }

    pub fn altitude_mode(&self) -> AltitudeMode {
        self.altitude_mode
    }

    pub fn show_mach(&self) -> bool {
        self.show_mach
    }

    pub fn transponder_state(&self) -> usize {
        self.transponder_state
    }

    /// Field edited by the adjust knob for the selected entry.
    fn field(&self) -> Option<Field> {
        match self.selector.index() {
            0 | 2 => Some(Field::Com),
            1 | 3 => Some(Field::Nav),
            4 => Some(Field::Adf),
            5 => Some(Field::Squawk),
            7 if self.show_mach => Some(Field::Mach),
            7 => Some(Field::Airspeed),
            8 => Some(Field::Heading),
            9 | 10 => Some(Field::Altitude),
            _ => None,
        }
    }

    fn update_knobs(&mut self, knobs: &mut dyn KnobInput, bus: &mut dyn VariableBus, now: Instant) {
        let Some(mut nav_knobs) = self.knobs.take() else {
            return;
        };

        // Clockwise on the select knob lowers the raw counter
        if let Some(steps) = nav_knobs.select.poll(knobs) {
            self.selector.turn(-steps);
        }

        if let Some(pressed) = nav_knobs.select_push.poll(knobs) {
            let index = self.selector.select();
            if pressed {
                self.switch_pressed(index, bus);
            }
        }

        match nav_knobs.adjust.poll(knobs) {
            Some(steps) => {
                if steps != 0 {
                    self.adjust_digits(steps.signum(), bus);
                }
                self.selector.touch_adjust(now);
            }
            None => self.selector.expire(now),
        }

        if let Some(true) = nav_knobs.adjust_push.poll(knobs) {
            let places = self.field().map_or(2, Field::place_count);
            self.selector.next_place(places);
        }

        self.knobs = Some(nav_knobs);
    }

    fn switch_pressed(&mut self, index: usize, bus: &mut dyn VariableBus) {
        let r = self.readout;
        debug!("{}: switch {} pressed", NAME, index);
        match index {
            0 => bus.write(BusEvent::ComSwap(Radio::One)),
            1 => bus.write(BusEvent::NavSwap(Radio::One)),
            2 => bus.write(BusEvent::ComSwap(Radio::Two)),
            3 => bus.write(BusEvent::NavSwap(Radio::Two)),
            4 => {
                bus.write(BusEvent::AdfStandbySet(r.adf));
                bus.write(BusEvent::AdfActiveSet(r.adf_standby));
            }
            5 => self.transponder_state = (self.transponder_state + 1) % 4,
            6 => bus.write(BusEvent::ApMasterToggle),
            7 => {
                if self.speed == SpeedMode::Hold {
                    // Store the shown value before switching units
                    if self.show_mach {
                        bus.write(BusEvent::ApMachSet(r.mach * 100.0));
                    } else {
                        bus.write(BusEvent::ApAirspeedSet(r.airspeed as f64));
                    }
                    self.show_mach = !self.show_mach;
                } else {
                    let hold = round_speed(r.indicated_airspeed as i32);
                    bus.write(BusEvent::ApAirspeedSet(hold as f64));
                    bus.write(BusEvent::ApAirspeedOn);
                    self.show_mach = false;
                }
            }
            8 => {
                if self.heading_mode == HeadingMode::Set {
                    self.heading_mode = HeadingMode::LevelFlight;
                    bus.write(BusEvent::ApHeadingHold(false));
                } else {
                    self.heading_mode = HeadingMode::Set;
                    bus.write(BusEvent::ApHeadingHold(true));
                }
            }
            9 => {
                if self.altitude_mode == AltitudeMode::Hold {
                    self.altitude_mode = AltitudeMode::Pitch;
                    bus.write(BusEvent::ApAltitudeHold(false));
                } else {
                    self.altitude_mode = AltitudeMode::Hold;
                    let hold = round_altitude(r.indicated_altitude as i32);
                    bus.write(BusEvent::ApAltitudeSet(hold as f64));
                    bus.write(BusEvent::ApAltitudeHold(true));
                }
            }
            10 => {
                self.altitude_mode = AltitudeMode::Change;
                bus.write(BusEvent::ApAltitudeSet(r.altitude as f64));
                bus.write(BusEvent::ApAltitudeHold(true));
            }
            _ => {}
        }
    }

    fn adjust_digits(&mut self, step: i32, bus: &mut dyn VariableBus) {
        let r = self.readout;
        let place = self.selector.place();
        let index = self.selector.index();
        let Some(field) = self.field() else {
            return;
        };
        let radio = |i: usize| if i < 2 { Radio::One } else { Radio::Two };
        match index {
            0 | 2 => {
                let khz = adjust::adjust(field, r.com_standby[index / 2], place, step);
                bus.write(BusEvent::ComStandbySet(radio(index), khz as f64 / 1000.0));
            }
            1 | 3 => {
                let hundredths = adjust::adjust(field, r.nav_standby[index / 2], place, step);
                bus.write(BusEvent::NavStandbySet(radio(index), hundredths as f64 / 100.0));
            }
            4 => bus.write(BusEvent::AdfStandbySet(adjust::adjust(field, r.adf_standby, place, step))),
            5 => bus.write(BusEvent::TransponderSet(adjust::adjust(field, r.squawk, place, step))),
            7 if self.speed == SpeedMode::Hold => {
                if self.show_mach {
                    let mach = adjust::adjust(field, r.mach_x100, place, step);
                    bus.write(BusEvent::ApMachSet(mach as f64));
                } else {
                    let speed = adjust::adjust(field, r.airspeed, place, step);
                    bus.write(BusEvent::ApAirspeedSet(speed as f64));
                }
            }
            8 => {
                let heading = adjust::adjust(field, r.heading, place, step);
                bus.write(BusEvent::HeadingBugSet(heading as f64));
            }
            // Vertical speed entry edits the target altitude instead
            9 | 10 => {
                let altitude = adjust::adjust(field, r.altitude, place, step);
                if self.altitude_mode == AltitudeMode::Change
                    && alt_change_settled(r.altitude, altitude, r.indicated_altitude as i32)
                {
                    self.altitude_mode = AltitudeMode::Hold;
                }
                bus.write(BusEvent::ApAltitudeSet(altitude as f64));
            }
            _ => {}
        }
    }

    fn read(&mut self, snapshot: &Snapshot) {
        self.readout = Readout::from_snapshot(snapshot);

        self.speed = if snapshot.flag(vars::AP_AIRSPEED_HOLD) {
            SpeedMode::Hold
        } else {
            SpeedMode::None
        };

        self.heading_mode = if snapshot.flag(vars::AP_HEADING_LOCK) {
            HeadingMode::Set
        } else if snapshot.flag(vars::AP_WING_LEVELER) {
            HeadingMode::LevelFlight
        } else {
            HeadingMode::None
        };

        self.altitude_mode = if snapshot.flag(vars::AP_ALTITUDE_LOCK) {
            let remaining = (snapshot.get(vars::INDICATED_ALTITUDE) - snapshot.get(vars::AP_ALTITUDE)).abs();
            if self.altitude_mode == AltitudeMode::Change && remaining >= 210.0 {
                AltitudeMode::Change
            } else {
                AltitudeMode::Hold
            }
        } else if snapshot.flag(vars::AP_VERTICAL_HOLD) {
            AltitudeMode::VerticalSpeed
        } else if snapshot.flag(vars::AP_PITCH_HOLD) {
            AltitudeMode::Pitch
        } else {
            AltitudeMode::None
        };

        let entries = if self.readout.ap_available {
            AUTOPILOT_ENTRIES
        } else {
            RADIO_ENTRIES
        };
        self.selector.set_ring_size(entries);
    }

    fn compose_radios(&self, comp: &mut Composition) {
        let r = &self.readout;
        comp.prescaled(NAV_PANEL, Rect::new(0.0, 0.0, 1600.0, 400.0));

        for (i, y) in [19.0, 148.0].into_iter().enumerate() {
            comp.fixed_point(STRIP, POINT, r.com[i] as i64, 3, 3, 237.0, y);
            comp.fixed_point(STRIP, POINT, r.com_standby[i] as i64, 3, 3, 523.0, y);
            comp.fixed_point(STRIP, POINT, r.nav[i] as i64, 3, 2, 837.0, y);
            comp.fixed_point(STRIP, POINT, r.nav_standby[i] as i64, 3, 2, 1153.0, y);
        }

        comp.number(STRIP, r.adf as i64, 4, 273.0, 278.0, true);
        comp.number(STRIP, r.adf_standby as i64, 4, 586.0, 278.0, true);

        for (i, digit) in squawk_digits(r.squawk).into_iter().enumerate() {
            comp.digit(STRIP, digit as u8, 968.0 + 76.0 * i as f32, 278.0);
        }

        let index = self.selector.index();
        if let Some(&(x, y)) = SWITCH_POSITIONS.get(index) {
            comp.region(SWITCH, Rect::new(0.0, 0.0, 80.0, 34.0), x, y);
        }

        let state = Rect::new(80.0 * self.transponder_state as f32, 0.0, 80.0, 34.0);
        let source = if index == 5 { XPDR_SELECTED } else { XPDR };
        comp.region(source, state, 1064.0, 363.0);
    }

    fn compose_autopilot(&self, comp: &mut Composition) {
        let r = &self.readout;
        comp.prescaled(AP_PANEL, Rect::new(0.0, 0.0, 1600.0, 400.0));

        let entry = self.selector.index().saturating_sub(RADIO_ENTRIES) as f32;
        comp.region(AP_SWITCHES, Rect::new(80.0 * entry, 0.0, 80.0, 34.0), 443.0 + 160.0 * entry, 340.0);

        if self.speed == SpeedMode::Hold {
            if self.show_mach {
                comp.fixed_point(STRIP, POINT, r.mach_x100 as i64, 1, 2, 421.0, 82.0);
            } else {
                comp.number(STRIP, r.airspeed as i64, 4, 403.0, 82.0, false);
            }
        }
        comp.number(STRIP, r.heading as i64, 3, 816.0, 82.0, true);
        comp.number(STRIP, r.altitude as i64, 5, 1188.0, 82.0, false);

        let annunciator = |comp: &mut Composition, src_x: f32, x: f32| {
            comp.region(AP_DISPLAY, Rect::new(src_x, 0.0, 128.0, 50.0), x, 252.0);
        };

        match self.heading_mode {
            HeadingMode::Set => annunciator(comp, 0.0, 385.0),
            HeadingMode::LevelFlight => annunciator(comp, 128.0, 385.0),
            HeadingMode::None => {}
        }

        if r.ap_engaged {
            annunciator(comp, 256.0, 530.0);
        }

        match self.altitude_mode {
            AltitudeMode::Hold => annunciator(comp, 384.0, 680.0),
            AltitudeMode::Pitch => annunciator(comp, 512.0, 680.0),
            AltitudeMode::VerticalSpeed => {
                annunciator(comp, 640.0, 680.0);
                vertical_speed(comp, r.vertical_speed, 836.0, 252.0);
                annunciator(comp, 896.0, 1115.0);
            }
            AltitudeMode::Change => {
                annunciator(comp, 384.0, 680.0);
                // Trailing S turns ALT into ALTS
                comp.region(AP_DISPLAY, Rect::new(692.0, 0.0, 32.0, 50.0), 788.0, 252.0);
                comp.region(AP_DISPLAY, Rect::new(896.0, 0.0, 94.0, 50.0), 1115.0, 252.0);
            }
            AltitudeMode::None => {}
        }
    }
}

/// Nearest 10 knots, halves rounding up.
fn round_speed(knots: i32) -> i32 {
    let units = knots % 10;
    if units < 5 {
        knots - units
    } else {
        knots + 10 - units
    }
}

/// Hold altitude for the current altitude: down to the hundred below when
/// less than 30 ft past it, otherwise up to the next hundred.
fn round_altitude(feet: i32) -> i32 {
    let hundreds = feet % 100;
    if hundreds < 30 {
        feet - hundreds
    } else {
        feet + 100 - hundreds
    }
}

/// Vertical speed readout in hundreds of fpm, e.g. `-15 00fpm`.
fn vertical_speed(comp: &mut Composition, fpm: i32, x: f32, y: f32) {
    if fpm == 0 {
        comp.region_to(FPM, Rect::new(32.0, 0.0, 130.0, 50.0), Rect::new(x + 87.0, y, 162.0, 50.0));
        return;
    }

    let value = fpm.abs();
    let thousands = ((value % 10_000) / 1_000) as u8;
    let hundreds = ((value % 1_000) / 100) as u8;

    let mut x = x;
    if thousands == 0 {
        x += 32.0;
    }
    if fpm < 0 {
        comp.region(MINUS, Rect::new(0.0, 0.0, 23.0, 50.0), x, y);
    }
    x += 23.0;
    if thousands != 0 {
        comp.digit(VS_STRIP, thousands, x, y);
        x += 32.0;
    }
    comp.digit(VS_STRIP, hundreds, x, y);
    x += 32.0;
    comp.region(FPM, Rect::new(0.0, 0.0, 162.0, 50.0), x, y);
}

impl Instrument for Nav {
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
        self.base.add_scaled(Rect::new(0.0, 0.0, 1600.0, 400.0));
        self.base.add_scaled(Rect::new(0.0, 400.0, 1600.0, 400.0));
        self.base.add_region(Rect::new(0.0, 800.0, 380.0, 80.0));
        self.base.add_region(Rect::new(380.0, 800.0, 20.0, 80.0));
        self.base.add_region(Rect::new(400.0, 800.0, 80.0, 34.0));
        self.base.add_region(Rect::new(480.0, 800.0, 320.0, 34.0));
        self.base.add_region(Rect::new(480.0, 834.0, 320.0, 34.0));
        self.base.add_region(Rect::new(800.0, 800.0, 400.0, 34.0));
        self.base.add_region(Rect::new(0.0, 880.0, 1024.0, 50.0));
        self.base.add_region(Rect::new(1024.0, 880.0, 320.0, 50.0));
        self.base.add_region(Rect::new(1344.0, 880.0, 162.0, 50.0));
        self.base.add_region(Rect::new(1506.0, 880.0, 23.0, 50.0));
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
        if self.selector.index() < RADIO_ENTRIES {
            self.compose_radios(&mut comp);
        } else {
            self.compose_autopilot(&mut comp);
        }
        comp
    }
}
