//! Rotary encoders and push buttons.
//!
//! A knob driver exposes one raw counter per handle. The counter moves by the
//! encoder's physical ticks since start-up and never resets on its own; a
//! read returns `None` when nothing changed since the previous read.
//!
//! Push buttons share the same channel: the counter is odd while the button
//! is held. A press is the transition from an even reading to an odd one,
//! so every consumer keeps the previous parity of its own button handles,
//! just as it keeps the previous raw value of its encoders.

use crate::config::DETENT_TICKS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KnobHandle(usize);

/// GPIO lines a knob is wired to. Unused lines are `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KnobPins {
    pub a: u8,
    pub b: Option<u8>,
    pub push: Option<u8>,
    pub push2: Option<u8>,
    pub initial: i32,
}

impl KnobPins {
    /// Quadrature encoder on two lines.
    pub const fn encoder(a: u8, b: u8) -> Self {
        Self {
            a,
            b: Some(b),
            push: None,
            push2: None,
            initial: 0,
        }
    }

    /// Push button on a single line.
    pub const fn button(pin: u8) -> Self {
        Self {
            a: pin,
            b: None,
            push: None,
            push2: None,
            initial: 0,
        }
    }
}

pub trait KnobInput {
    fn add(&mut self, pins: KnobPins) -> KnobHandle;

    /// Raw counter, or `None` when unchanged since the last read.
    fn read(&mut self, handle: KnobHandle) -> Option<i32>;
}

/// Shorten the borrow of an optional knob driver so it can be handed out
/// more than once.
pub fn reborrow<'a>(knobs: &'a mut Option<&mut dyn KnobInput>) -> Option<&'a mut dyn KnobInput> {
    match knobs {
        Some(knobs) => Some(&mut **knobs),
        None => None,
    }
}

/// Rotary encoder decoder: turns raw counter readings into detent steps.
#[derive(Debug, Clone)]
pub struct Encoder {
    handle: KnobHandle,
    prev: i32,
    divisor: i32,
}

impl Encoder {
    pub fn new(handle: KnobHandle) -> Self {
        Self::with_divisor(handle, DETENT_TICKS)
    }

    pub fn with_divisor(handle: KnobHandle, divisor: i32) -> Self {
        Self {
            handle,
            prev: 0,
            divisor: divisor.max(1),
        }
    }

    /// `None` when the knob reported no change. Otherwise the signed number
    /// of whole detents since the last consumed reading, which may be zero
    /// for a partial turn. Partial turns keep accumulating against the last
    /// consumed reading.
    pub fn poll(&mut self, knobs: &mut dyn KnobInput) -> Option<i32> {
        let raw = knobs.read(self.handle)?;
        Some(self.feed(raw))
    }

    fn feed(&mut self, raw: i32) -> i32 {
        let steps = (raw - self.prev) / self.divisor;
        if steps != 0 {
            self.prev = raw;
        }
        steps
    }
}

/// Push button decoder: detects presses from counter parity.
#[derive(Debug, Clone)]
pub struct Button {
    handle: KnobHandle,
    prev_odd: bool,
}

impl Button {
    pub fn new(handle: KnobHandle) -> Self {
        Self {
            handle,
            prev_odd: false,
        }
    }

    /// `None` when the button reported no change, otherwise whether this
    /// reading is a new press.
    pub fn poll(&mut self, knobs: &mut dyn KnobInput) -> Option<bool> {
        let raw = knobs.read(self.handle)?;
        Some(self.feed(raw))
    }

    fn feed(&mut self, raw: i32) -> bool {
        let odd = raw.rem_euclid(2) == 1;
        let pressed = odd && !self.prev_odd;
        self.prev_odd = odd;
        pressed
    }
}

#[derive(Debug, Clone)]
struct VirtualKnob {
    pins: KnobPins,
    value: i32,
    dirty: bool,
}

/// Knob driver backed by software counters, driven from the keyboard on the
/// desktop and directly from tests.
#[derive(Debug, Default)]
pub struct VirtualKnobs {
    knobs: Vec<VirtualKnob>,
}

impl VirtualKnobs {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle of the knob whose first line is `pin`.
    pub fn find(&self, pin: u8) -> Option<KnobHandle> {
        self.knobs
            .iter()
            .position(|k| k.pins.a == pin)
            .map(KnobHandle)
    }

    /// Add `ticks` raw encoder ticks.
    pub fn turn(&mut self, handle: KnobHandle, ticks: i32) {
        if let Some(knob) = self.knobs.get_mut(handle.0) {
            knob.value += ticks;
            knob.dirty = true;
        }
    }

    pub fn press(&mut self, handle: KnobHandle) {
        self.set_held(handle, true);
    }

    pub fn release(&mut self, handle: KnobHandle) {
        self.set_held(handle, false);
    }

    /// Force the next read of `handle` to report the current counter even if
    /// it has not moved.
    pub fn touch(&mut self, handle: KnobHandle) {
        if let Some(knob) = self.knobs.get_mut(handle.0) {
            knob.dirty = true;
        }
    }

    fn set_held(&mut self, handle: KnobHandle, held: bool) {
        if let Some(knob) = self.knobs.get_mut(handle.0) {
            if (knob.value.rem_euclid(2) == 1) != held {
                knob.value += 1;
                knob.dirty = true;
            }
        }
    }
}

impl KnobInput for VirtualKnobs {
    fn add(&mut self, pins: KnobPins) -> KnobHandle {
        self.knobs.push(VirtualKnob {
            pins,
            value: pins.initial,
            dirty: false,
        });
        KnobHandle(self.knobs.len() - 1)
    }

    fn read(&mut self, handle: KnobHandle) -> Option<i32> {
        let knob = self.knobs.get_mut(handle.0)?;
        if !knob.dirty {
            return None;
        }
        knob.dirty = false;
        Some(knob.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoder_reports_whole_detents() {
        let mut knobs = VirtualKnobs::new();
        let handle = knobs.add(KnobPins::encoder(20, 21));
        let mut encoder = Encoder::new(handle);

        assert_eq!(encoder.poll(&mut knobs), None);

        knobs.turn(handle, 4);
        assert_eq!(encoder.poll(&mut knobs), Some(2));

        knobs.turn(handle, -2);
        assert_eq!(encoder.poll(&mut knobs), Some(-1));
    }

    #[test]
    fn partial_turns_accumulate() {
        let mut knobs = VirtualKnobs::new();
        let handle = knobs.add(KnobPins::encoder(8, 7));
        let mut encoder = Encoder::new(handle);

        knobs.turn(handle, 1);
        assert_eq!(encoder.poll(&mut knobs), Some(0));
        knobs.turn(handle, 1);
        assert_eq!(encoder.poll(&mut knobs), Some(1));
        knobs.turn(handle, 1);
        assert_eq!(encoder.poll(&mut knobs), Some(0));
    }

    #[test]
    fn two_odd_readings_make_one_press() {
        let mut button = Button::new(KnobHandle(0));
        assert!(button.feed(1));
        assert!(!button.feed(1));
        assert!(!button.feed(3));
    }

    #[test]
    fn press_needs_even_before_odd() {
        let mut knobs = VirtualKnobs::new();
        let handle = knobs.add(KnobPins::button(12));
        let mut button = Button::new(handle);

        knobs.press(handle);
        assert_eq!(button.poll(&mut knobs), Some(true));
        knobs.touch(handle);
        assert_eq!(button.poll(&mut knobs), Some(false));
        knobs.release(handle);
        assert_eq!(button.poll(&mut knobs), Some(false));
        knobs.press(handle);
        assert_eq!(button.poll(&mut knobs), Some(true));
    }

    #[test]
    fn find_by_first_pin() {
        let mut knobs = VirtualKnobs::new();
        let sel = knobs.add(KnobPins::encoder(8, 7));
        let push = knobs.add(KnobPins::button(12));
        assert_eq!(knobs.find(8), Some(sel));
        assert_eq!(knobs.find(12), Some(push));
        assert_eq!(knobs.find(99), None);
    }
}
