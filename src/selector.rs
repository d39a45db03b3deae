use std::time::{Duration, Instant};

/// Ring of selectable sub-panels plus the digit place being edited.
///
/// The ring size can change between polls. The selected place always lies
/// within the place count of the selected index, and is reset to 0 whenever
/// the selection moves, the select button is pressed, or the adjust knob has
/// been idle for longer than the timeout.
#[derive(Debug, Clone)]
pub struct SwitchSelector {
    index: usize,
    ring_size: usize,
    place: usize,
    last_adjust: Option<Instant>,
    idle_timeout: Duration,
}

impl SwitchSelector {
    pub fn new(ring_size: usize, idle_timeout: Duration) -> Self {
        Self {
            index: 0,
            ring_size: ring_size.max(1),
            place: 0,
            last_adjust: None,
            idle_timeout,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn ring_size(&self) -> usize {
        self.ring_size
    }

    pub fn place(&self) -> usize {
        self.place
    }

    /// Apply the ring size for this poll. Growing keeps the selection; a
    /// selection that no longer exists falls back to the first entry.
    pub fn set_ring_size(&mut self, ring_size: usize) {
        self.ring_size = ring_size.max(1);
        if self.index >= self.ring_size {
            self.index = 0;
            self.place = 0;
        }
    }

    /// Move one entry in the direction of `steps`, wrapping at both ends.
    pub fn turn(&mut self, steps: i32) {
        let n = self.ring_size as i64;
        let next = (self.index as i64 + steps.signum() as i64).rem_euclid(n);
        if steps != 0 {
            self.index = next as usize;
            self.place = 0;
        }
    }

    /// The select button was pressed. Returns the index whose action should
    /// run.
    pub fn select(&mut self) -> usize {
        self.place = 0;
        self.index
    }

    /// Any reading from the adjust knob, even a partial turn.
    pub fn touch_adjust(&mut self, now: Instant) {
        self.last_adjust = Some(now);
    }

    /// Adjust button pressed: move to the next place, wrapping to 0.
    pub fn next_place(&mut self, place_count: usize) {
        self.place += 1;
        if self.place >= place_count.max(1) {
            self.place = 0;
        }
    }

    /// Reset the place after the adjust knob has been idle for too long.
    pub fn expire(&mut self, now: Instant) {
        if let Some(last) = self.last_adjust {
            if now.saturating_duration_since(last) > self.idle_timeout {
                self.place = 0;
                self.last_adjust = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(ring_size: usize) -> SwitchSelector {
        SwitchSelector::new(ring_size, Duration::from_secs(5))
    }

    #[test]
    fn turning_wraps_both_ways() {
        let mut sel = selector(6);
        for _ in 0..5 {
            sel.turn(1);
        }
        assert_eq!(sel.index(), 5);
        sel.turn(1);
        assert_eq!(sel.index(), 0);
        sel.turn(-1);
        assert_eq!(sel.index(), 5);
    }

    #[test]
    fn large_turns_move_one_entry() {
        let mut sel = selector(6);
        sel.turn(3);
        assert_eq!(sel.index(), 1);
        sel.turn(0);
        assert_eq!(sel.index(), 1);
    }

    #[test]
    fn growing_ring_keeps_index() {
        let mut sel = selector(6);
        sel.turn(-1);
        assert_eq!(sel.index(), 5);
        sel.set_ring_size(11);
        assert_eq!(sel.index(), 5);
        assert_eq!(sel.ring_size(), 11);
        sel.turn(1);
        assert_eq!(sel.index(), 6);
    }

    #[test]
    fn shrinking_ring_drops_invalid_index() {
        let mut sel = selector(11);
        sel.turn(-1);
        sel.next_place(2);
        assert_eq!((sel.index(), sel.place()), (10, 1));
        sel.set_ring_size(6);
        assert_eq!((sel.index(), sel.place()), (0, 0));
    }

    #[test]
    fn turning_and_selecting_reset_place() {
        let mut sel = selector(6);
        sel.next_place(3);
        sel.next_place(3);
        assert_eq!(sel.place(), 2);
        sel.next_place(3);
        assert_eq!(sel.place(), 0);

        sel.next_place(3);
        sel.turn(1);
        assert_eq!(sel.place(), 0);

        sel.next_place(3);
        assert_eq!(sel.select(), 1);
        assert_eq!(sel.place(), 0);
    }

    #[test]
    fn idle_adjust_knob_resets_place() {
        let start = Instant::now();
        let mut sel = selector(6);
        sel.next_place(4);
        sel.touch_adjust(start);

        sel.expire(start + Duration::from_secs(5));
        assert_eq!(sel.place(), 1);

        sel.expire(start + Duration::from_secs(6));
        assert_eq!(sel.place(), 0);

        // Nothing to expire until the knob is read again
        sel.next_place(4);
        sel.expire(start + Duration::from_secs(60));
        assert_eq!(sel.place(), 1);
    }
}
