//! The telemetry/control channel to the flight simulator.
//!
//! Instruments register the variables they care about once, read the latest
//! [`Snapshot`] every tick and send [`BusEvent`]s to change simulator
//! settings. [`SimulatedBus`] is an in-process implementation used for the
//! desktop panel and for tests.

use std::collections::HashMap;

use log::{debug, info, warn};
use rand::Rng;

/// Simulator variable names.
pub mod vars {
    pub const HEADING: &str = "Heading Indicator";
    pub const INDICATED_ALTITUDE: &str = "Indicated Altitude";
    pub const AIRSPEED: &str = "Airspeed Indicated";

    pub const VOR1_OBS: &str = "Nav Obs:1";
    pub const VOR1_RADIAL_ERROR: &str = "Nav Radial Error:1";
    pub const VOR1_GLIDE_SLOPE_ERROR: &str = "Nav Glide Slope Error:1";
    pub const VOR1_TO_FROM: &str = "Nav ToFrom:1";
    pub const VOR1_GS_FLAG: &str = "Nav Gs Flag:1";

    pub const ELEVATOR_TRIM: &str = "Elevator Trim Position";
    pub const FLAPS_COUNT: &str = "Flaps Num Handle Positions";
    pub const FLAPS_INDEX: &str = "Flaps Handle Index";
    pub const GEAR_RETRACTABLE: &str = "Is Gear Retractable";
    pub const GEAR_LEFT: &str = "Gear Left Position";
    pub const GEAR_CENTRE: &str = "Gear Center Position";
    pub const GEAR_RIGHT: &str = "Gear Right Position";
    pub const PARKING_BRAKE: &str = "Brake Parking Position";

    pub const COM1_ACTIVE: &str = "Com Active Frequency:1";
    pub const COM1_STANDBY: &str = "Com Standby Frequency:1";
    pub const NAV1_ACTIVE: &str = "Nav Active Frequency:1";
    pub const NAV1_STANDBY: &str = "Nav Standby Frequency:1";
    pub const COM2_ACTIVE: &str = "Com Active Frequency:2";
    pub const COM2_STANDBY: &str = "Com Standby Frequency:2";
    pub const NAV2_ACTIVE: &str = "Nav Active Frequency:2";
    pub const NAV2_STANDBY: &str = "Nav Standby Frequency:2";
    pub const ADF_ACTIVE: &str = "Adf Active Frequency:1";
    pub const ADF_STANDBY: &str = "Adf Standby Frequency:1";
    pub const TRANSPONDER_CODE: &str = "Transponder Code:1";

    pub const AP_AVAILABLE: &str = "Autopilot Available";
    pub const AP_MASTER: &str = "Autopilot Master";
    pub const AP_HEADING: &str = "Autopilot Heading Lock Dir";
    pub const AP_HEADING_LOCK: &str = "Autopilot Heading Lock";
    pub const AP_WING_LEVELER: &str = "Autopilot Wing Leveler";
    pub const AP_ALTITUDE: &str = "Autopilot Altitude Lock Var";
    pub const AP_ALTITUDE_LOCK: &str = "Autopilot Altitude Lock";
    pub const AP_PITCH_HOLD: &str = "Autopilot Pitch Hold";
    pub const AP_VERTICAL_SPEED: &str = "Autopilot Vertical Hold Var";
    pub const AP_VERTICAL_HOLD: &str = "Autopilot Vertical Hold";
    pub const AP_AIRSPEED: &str = "Autopilot Airspeed Hold Var";
    pub const AP_MACH: &str = "Autopilot Mach Hold Var";
    pub const AP_AIRSPEED_HOLD: &str = "Autopilot Airspeed Hold";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Radio {
    One,
    Two,
}

/// Control requests understood by the simulator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BusEvent {
    ComSwap(Radio),
    NavSwap(Radio),
    /// Standby frequency in MHz
    ComStandbySet(Radio, f64),
    NavStandbySet(Radio, f64),
    /// Frequency in kHz
    AdfStandbySet(i32),
    AdfActiveSet(i32),
    /// Packed squawk code
    TransponderSet(i32),
    ApMasterToggle,
    ApAirspeedOn,
    ApAirspeedSet(f64),
    /// Mach × 100
    ApMachSet(f64),
    ApHeadingHold(bool),
    HeadingBugSet(f64),
    ApAltitudeHold(bool),
    ApAltitudeSet(f64),
    Vor1ObsSet(f64),
    ElevatorTrimUp,
    ElevatorTrimDown,
    FlapsIncrement,
    FlapsDecrement,
}

/// Latest value of every known variable. Unknown names read as zero.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    values: HashMap<String, f64>,
}

impl Snapshot {
    pub fn get(&self, name: &str) -> f64 {
        self.values.get(name).copied().unwrap_or(0.0)
    }

    pub fn flag(&self, name: &str) -> bool {
        self.get(name) >= 0.5
    }

    pub fn set(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Read/write channel to the simulator.
pub trait VariableBus {
    /// Register interest in `name` on behalf of `owner`. Registering the
    /// same name again only records the extra owner.
    fn add_variable(&mut self, owner: &str, name: &str, is_string: bool, scale: f64, offset: f64);

    /// Refresh the snapshot. Returns the connectivity flag.
    fn update(&mut self) -> bool;

    fn snapshot(&self) -> &Snapshot;

    /// Fire-and-forget control request.
    fn write(&mut self, event: BusEvent);

    fn connected(&self) -> bool;
}

#[derive(Debug, Clone)]
struct Registration {
    owners: Vec<String>,
    is_string: bool,
    scale: f64,
    base: f64,
    walk: f64,
    target: f64,
}

impl Registration {
    fn value(&self) -> f64 {
        self.base + self.scale * self.walk
    }
}

/// In-process simulator.
///
/// A registered variable reads `base + scale * walk`, where `base` starts at
/// the registration offset and `walk` drifts within `[-1, 1]`. Writes change
/// `base`. While the link is down the last snapshot is returned unchanged.
#[derive(Debug, Default)]
pub struct SimulatedBus {
    registrations: HashMap<String, Registration>,
    snapshot: Snapshot,
    link_up: bool,
    connected: bool,
    animate: bool,
}

impl SimulatedBus {
    pub fn new() -> Self {
        Self {
            link_up: true,
            animate: true,
            ..Default::default()
        }
    }

    /// Bus whose values never drift, for deterministic use.
    pub fn still() -> Self {
        Self {
            animate: false,
            ..Self::new()
        }
    }

    /// Simulate the backend dropping or returning.
    pub fn set_link(&mut self, up: bool) {
        self.link_up = up;
    }

    pub fn link_up(&self) -> bool {
        self.link_up
    }

    /// Force the base value of a variable, registering it if needed.
    pub fn set(&mut self, name: &str, value: f64) {
        self.registration_mut(name).base = value;
    }

    pub fn owners(&self, name: &str) -> &[String] {
        self.registrations
            .get(name)
            .map(|r| r.owners.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_string(&self, name: &str) -> bool {
        self.registrations.get(name).is_some_and(|r| r.is_string)
    }

    fn registration_mut(&mut self, name: &str) -> &mut Registration {
        self.registrations
            .entry(name.to_string())
            .or_insert_with(|| Registration {
                owners: Vec::new(),
                is_string: false,
                scale: 0.0,
                base: 0.0,
                walk: 0.0,
                target: 0.0,
            })
    }

    fn base(&self, name: &str) -> f64 {
        self.registrations.get(name).map_or(0.0, |r| r.base)
    }

    fn swap(&mut self, a: &str, b: &str) {
        let (va, vb) = (self.base(a), self.base(b));
        self.set(a, vb);
        self.set(b, va);
    }

    fn drift(&mut self) {
        let mut rng = rand::rng();
        for reg in self.registrations.values_mut() {
            if reg.scale == 0.0 {
                continue;
            }
            // Lerp towards a random target that occasionally moves
            if rng.random_range(0.0..1.0) < 0.01 {
                reg.target = rng.random_range(-1.0..1.0);
            }
            reg.walk = (reg.walk + (reg.target - reg.walk) * 0.1).clamp(-1.0, 1.0);
        }
    }
}

impl VariableBus for SimulatedBus {
    fn add_variable(&mut self, owner: &str, name: &str, is_string: bool, scale: f64, offset: f64) {
        let fresh = !self.registrations.contains_key(name);
        let reg = self.registration_mut(name);
        if fresh {
            reg.is_string = is_string;
            reg.scale = scale;
            reg.base = offset;
        }
        if !reg.owners.iter().any(|o| o == owner) {
            reg.owners.push(owner.to_string());
        }
    }

    fn update(&mut self) -> bool {
        if !self.link_up {
            if self.connected {
                warn!("simulator disconnected, holding last values");
            }
            self.connected = false;
            return false;
        }
        if !self.connected {
            info!("simulator connected");
        }
        self.connected = true;

        if self.animate {
            self.drift();
        }
        for (name, reg) in &self.registrations {
            self.snapshot.set(name, reg.value());
        }
        true
    }

    fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    fn write(&mut self, event: BusEvent) {
        use vars::*;

        if !self.link_up {
            debug!("dropping {:?} while disconnected", event);
            return;
        }
        debug!("write {:?}", event);
        match event {
            BusEvent::ComSwap(Radio::One) => self.swap(COM1_ACTIVE, COM1_STANDBY),
            BusEvent::ComSwap(Radio::Two) => self.swap(COM2_ACTIVE, COM2_STANDBY),
            BusEvent::NavSwap(Radio::One) => self.swap(NAV1_ACTIVE, NAV1_STANDBY),
            BusEvent::NavSwap(Radio::Two) => self.swap(NAV2_ACTIVE, NAV2_STANDBY),
            BusEvent::ComStandbySet(Radio::One, v) => self.set(COM1_STANDBY, v),
            BusEvent::ComStandbySet(Radio::Two, v) => self.set(COM2_STANDBY, v),
            BusEvent::NavStandbySet(Radio::One, v) => self.set(NAV1_STANDBY, v),
            BusEvent::NavStandbySet(Radio::Two, v) => self.set(NAV2_STANDBY, v),
            BusEvent::AdfStandbySet(v) => self.set(ADF_STANDBY, v as f64),
            BusEvent::AdfActiveSet(v) => self.set(ADF_ACTIVE, v as f64),
            BusEvent::TransponderSet(v) => self.set(TRANSPONDER_CODE, v as f64),
            BusEvent::ApMasterToggle => {
                let on = self.base(AP_MASTER) >= 0.5;
                self.set(AP_MASTER, if on { 0.0 } else { 1.0 });
            }
            BusEvent::ApAirspeedOn => self.set(AP_AIRSPEED_HOLD, 1.0),
            BusEvent::ApAirspeedSet(v) => self.set(AP_AIRSPEED, v),
            BusEvent::ApMachSet(v) => self.set(AP_MACH, v / 100.0),
            BusEvent::ApHeadingHold(on) => {
                self.set(AP_HEADING_LOCK, if on { 1.0 } else { 0.0 });
                self.set(AP_WING_LEVELER, if on { 0.0 } else { 1.0 });
            }
            BusEvent::HeadingBugSet(v) => self.set(AP_HEADING, v),
            BusEvent::ApAltitudeHold(on) => {
                self.set(AP_ALTITUDE_LOCK, if on { 1.0 } else { 0.0 });
                self.set(AP_PITCH_HOLD, if on { 0.0 } else { 1.0 });
            }
            BusEvent::ApAltitudeSet(v) => self.set(AP_ALTITUDE, v),
            BusEvent::Vor1ObsSet(v) => self.set(VOR1_OBS, v),
            BusEvent::ElevatorTrimUp => {
                let trim = (self.base(ELEVATOR_TRIM) + 0.5).min(7.5);
                self.set(ELEVATOR_TRIM, trim);
            }
            BusEvent::ElevatorTrimDown => {
                let trim = (self.base(ELEVATOR_TRIM) - 0.5).max(-7.5);
                self.set(ELEVATOR_TRIM, trim);
            }
            BusEvent::FlapsIncrement => {
                let index = (self.base(FLAPS_INDEX) + 1.0).min(self.base(FLAPS_COUNT));
                self.set(FLAPS_INDEX, index);
            }
            BusEvent::FlapsDecrement => {
                let index = (self.base(FLAPS_INDEX) - 1.0).max(0.0);
                self.set(FLAPS_INDEX, index);
            }
        }
    }

    fn connected(&self) -> bool {
        self.connected
    }
}
