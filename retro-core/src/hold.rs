//! Press-and-hold detection and activity tracking.

use crate::time::{elapsed, Millis};

/// Tracks how long a single input has been held down.
///
/// Call [`parse`](Self::parse) on every poll with the current pressed
/// state, then query [`is_held`](Self::is_held).
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HoldDetector {
    pressed_since: Option<Millis>,
}

impl HoldDetector {
    #[must_use]
    pub const fn new() -> Self {
        Self { pressed_since: None }
    }

    /// Record the current input level. A rising edge starts the hold timer,
    /// a falling edge clears it.
    pub fn parse(&mut self, now: Millis, pressed: bool) {
        match (pressed, self.pressed_since) {
            (true, None) => self.pressed_since = Some(now),
            (false, Some(_)) => self.pressed_since = None,
            _ => {}
        }
    }

    /// Pressed for at least `duration` ms.
    #[must_use]
    pub fn is_held(&self, now: Millis, duration: u32) -> bool {
        self.pressed_since
            .is_some_and(|since| elapsed(now, since) >= duration)
    }

    #[must_use]
    pub const fn is_pressed(&self) -> bool {
        self.pressed_since.is_some()
    }

    pub fn clear(&mut self) {
        self.pressed_since = None;
    }
}

/// Timestamp of the last user activity.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ActivityTimer {
    last: Millis,
}

impl ActivityTimer {
    #[must_use]
    pub const fn new(now: Millis) -> Self {
        Self { last: now }
    }

    pub fn touch(&mut self, now: Millis) {
        self.last = now;
    }

    #[must_use]
    pub const fn elapsed(&self, now: Millis) -> u32 {
        elapsed(now, self.last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold_triggers_after_duration() {
        let mut hold = HoldDetector::new();
        hold.parse(1000, true);
        hold.parse(3000, true);
        assert!(!hold.is_held(5999, 5000));
        assert!(hold.is_held(6000, 5000));
    }

    #[test]
    fn test_release_resets_hold() {
        let mut hold = HoldDetector::new();
        hold.parse(0, true);
        hold.parse(4000, false);
        hold.parse(4500, true);
        assert!(!hold.is_held(9000, 5000));
        assert!(hold.is_held(9500, 5000));
    }

    #[test]
    fn test_hold_across_wraparound() {
        let mut hold = HoldDetector::new();
        hold.parse(u32::MAX - 1000, true);
        assert!(hold.is_held(4000, 5000));
    }

    #[test]
    fn test_clear() {
        let mut hold = HoldDetector::new();
        hold.parse(0, true);
        hold.clear();
        assert!(!hold.is_pressed());
        assert!(!hold.is_held(10_000, 1));
    }

    #[test]
    fn test_activity_timer() {
        let mut timer = ActivityTimer::new(100);
        assert_eq!(timer.elapsed(350), 250);
        timer.touch(400);
        assert_eq!(timer.elapsed(400), 0);
    }
}
