//! Status indicator: connection mode and charge state on an RGB LED.

use crate::time::{elapsed, Millis, Schedule};

/// What the indicator should show.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum IndicatorMode {
    #[default]
    Off,
    Ble,
    Usb,
    Searching,
}

/// Status indicator driven by the coordinator.
pub trait Indicator {
    /// Set the display mode. Never blocks.
    fn set_draw_mode(&mut self, mode: IndicatorMode, charging: bool);

    /// Advance any animation. Returns when to call again.
    fn animate(&mut self, _now: Millis) -> Schedule {
        Schedule::Idle
    }
}

/// On/off RGB LED.
pub trait RgbLed {
    fn set_rgb(&mut self, red: bool, green: bool, blue: bool);
}

/// Half period of the searching blink.
pub const SEARCHING_BLINK_MILLIS: u32 = 250 / 2;

/// Draws the indicator mode on an RGB LED.
///
/// - red: charging
/// - blue: BLE connected, blinking while searching
/// - green: USB connected and not charging
pub struct LedAnimator<L> {
    led: L,
    mode: IndicatorMode,
    charging: bool,
    animation_start: Millis,
    restart: bool,
    update_period: u32,
}

impl<L: RgbLed> LedAnimator<L> {
    pub fn new(mut led: L, update_period: u32) -> Self {
        led.set_rgb(false, false, false);
        Self {
            led,
            mode: IndicatorMode::Off,
            charging: false,
            animation_start: 0,
            restart: true,
            update_period,
        }
    }

    #[must_use]
    pub fn mode(&self) -> IndicatorMode {
        self.mode
    }

    pub fn led_mut(&mut self) -> &mut L {
        &mut self.led
    }

    fn draw(&mut self, animation_elapsed: u32) {
        let red = self.charging;
        let (green, blue) = match self.mode {
            IndicatorMode::Off => (false, false),
            IndicatorMode::Ble => (false, true),
            IndicatorMode::Usb => (!red, false),
            IndicatorMode::Searching => (
                false,
                animation_elapsed % (SEARCHING_BLINK_MILLIS * 2) <= SEARCHING_BLINK_MILLIS,
            ),
        };
        self.led.set_rgb(red, green, blue);
    }
}

impl<L: RgbLed> Indicator for LedAnimator<L> {
    fn set_draw_mode(&mut self, mode: IndicatorMode, charging: bool) {
        if mode != self.mode {
            // Restart the animation on the next frame.
            self.restart = true;
        }
        self.mode = mode;
        self.charging = charging;
        if self.restart {
            self.draw(0);
        }
    }

    fn animate(&mut self, now: Millis) -> Schedule {
        if self.restart {
            self.animation_start = now;
            self.restart = false;
        }
        self.draw(elapsed(now, self.animation_start));

        match self.mode {
            IndicatorMode::Searching => Schedule::After(self.update_period),
            IndicatorMode::Off | IndicatorMode::Ble | IndicatorMode::Usb => Schedule::Idle,
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Clone, Default)]
    struct FakeLed(Rc<Cell<(bool, bool, bool)>>);

    impl RgbLed for FakeLed {
        fn set_rgb(&mut self, red: bool, green: bool, blue: bool) {
            self.0.set((red, green, blue));
        }
    }

    #[test]
    fn test_colors_per_mode() {
        let led = FakeLed::default();
        let mut animator = LedAnimator::new(led.clone(), 5);

        animator.set_draw_mode(IndicatorMode::Ble, false);
        animator.animate(0);
        assert_eq!(led.0.get(), (false, false, true));

        animator.set_draw_mode(IndicatorMode::Usb, false);
        animator.animate(10);
        assert_eq!(led.0.get(), (false, true, false));

        // Charging wins over the USB green.
        animator.set_draw_mode(IndicatorMode::Usb, true);
        animator.animate(20);
        assert_eq!(led.0.get(), (true, false, false));

        animator.set_draw_mode(IndicatorMode::Off, true);
        assert_eq!(animator.animate(30), Schedule::Idle);
        assert_eq!(led.0.get(), (true, false, false));
    }

    #[test]
    fn test_searching_blinks_from_mode_change() {
        let led = FakeLed::default();
        let mut animator = LedAnimator::new(led.clone(), 5);

        animator.set_draw_mode(IndicatorMode::Searching, false);
        assert_eq!(led.0.get(), (false, false, true));

        assert_eq!(animator.animate(1000), Schedule::After(5));
        assert_eq!(led.0.get(), (false, false, true));
        animator.animate(1125);
        assert_eq!(led.0.get(), (false, false, true));
        animator.animate(1126);
        assert_eq!(led.0.get(), (false, false, false));
        animator.animate(1250);
        assert_eq!(led.0.get(), (false, false, true));

        // Same mode again doesn't restart the cycle.
        animator.set_draw_mode(IndicatorMode::Searching, false);
        animator.animate(1400);
        assert_eq!(led.0.get(), (false, false, false));
    }
}
