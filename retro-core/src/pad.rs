//! Pin readers for retro controllers wired straight to GPIO.
//!
//! All controller lines are active low with pull-ups: a pressed button
//! shorts its line to ground.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};

use crate::input::{InputError, InputSource};
use crate::sleep::{Sleepable, WakeLevel, WakeSource};
use crate::types::{DPad, PadButtons, PadState};

/// Time for the controller's multiplexer to settle after a select edge.
pub const SELECT_SETTLE_MICROS: u32 = 10;

fn pressed<P: InputPin>(pin: &mut P) -> Result<bool, InputError> {
    pin.is_low().map_err(|_| InputError::Io)
}

/// Atari 2600 / Commodore style joystick: four directions and fire.
pub struct AtariPad<P, W> {
    up: P,
    down: P,
    left: P,
    right: P,
    fire: W,
    state: PadState,
}

impl<P, W> AtariPad<P, W>
where
    P: InputPin,
    W: InputPin + WakeSource,
{
    /// `fire` doubles as the wake line.
    pub fn new(up: P, down: P, left: P, right: P, fire: W) -> Self {
        Self {
            up,
            down,
            left,
            right,
            fire,
            state: PadState::neutral(),
        }
    }
}

impl<P, W> InputSource for AtariPad<P, W>
where
    P: InputPin,
    W: InputPin + WakeSource,
{
    fn read(&mut self) -> Result<(), InputError> {
        let dpad = DPad::from_directions(
            pressed(&mut self.up)?,
            pressed(&mut self.down)?,
            pressed(&mut self.left)?,
            pressed(&mut self.right)?,
        );
        let mut buttons = PadButtons::NONE;
        buttons.set(PadButtons::A, pressed(&mut self.fire)?);

        self.state = PadState {
            buttons,
            dpad,
            // No presence detection on this port.
            connected: true,
            ..PadState::neutral()
        };
        Ok(())
    }

    fn state(&self) -> &PadState {
        &self.state
    }
}

impl<P, W> Sleepable for AtariPad<P, W>
where
    P: InputPin,
    W: InputPin + WakeSource,
{
    fn wake_on_interrupt(&mut self) -> bool {
        self.fire.arm(WakeLevel::Low)
    }

    fn on_wake_up(&mut self) {
        self.fire.disarm();
    }
}

/// Mega Drive / Genesis 3-button controller.
///
/// The pad multiplexes its six data lines with `select`:
///
/// | line        | select high | select low |
/// |-------------|-------------|------------|
/// | up          | Up          | Up         |
/// | down        | Down        | Down       |
/// | info_left   | Left        | low (pad present) |
/// | info_right  | Right       | low (pad present) |
/// | ab          | B           | A          |
/// | start_c     | C           | Start      |
///
/// `start_c` is the wake line. Select is left low while asleep so that
/// Start wakes the device.
pub struct MegaDrivePad<P, W, S, D> {
    up: P,
    down: P,
    info_left: P,
    info_right: P,
    ab: P,
    start_c: W,
    select: S,
    delay: D,
    state: PadState,
}

impl<P, W, S, D> MegaDrivePad<P, W, S, D>
where
    P: InputPin,
    W: InputPin + WakeSource,
    S: OutputPin,
    D: DelayNs,
{
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        up: P,
        down: P,
        info_left: P,
        info_right: P,
        ab: P,
        start_c: W,
        mut select: S,
        delay: D,
    ) -> Self {
        let _ = select.set_high();
        Self {
            up,
            down,
            info_left,
            info_right,
            ab,
            start_c,
            select,
            delay,
            state: PadState::neutral(),
        }
    }

    fn set_select(&mut self, high: bool) -> Result<(), InputError> {
        let result = if high {
            self.select.set_high()
        } else {
            self.select.set_low()
        };
        result.map_err(|_| InputError::Io)?;
        self.delay.delay_us(SELECT_SETTLE_MICROS);
        Ok(())
    }
}

impl<P, W, S, D> InputSource for MegaDrivePad<P, W, S, D>
where
    P: InputPin,
    W: InputPin + WakeSource,
    S: OutputPin,
    D: DelayNs,
{
    fn read(&mut self) -> Result<(), InputError> {
        self.set_select(true)?;
        let up = pressed(&mut self.up)?;
        let down = pressed(&mut self.down)?;
        let left = pressed(&mut self.info_left)?;
        let right = pressed(&mut self.info_right)?;
        let b = pressed(&mut self.ab)?;
        let c = pressed(&mut self.start_c)?;

        self.set_select(false)?;
        let present = pressed(&mut self.info_left)? && pressed(&mut self.info_right)?;
        let a = pressed(&mut self.ab)?;
        let start = pressed(&mut self.start_c)?;

        self.set_select(true)?;

        if !present {
            if self.state.connected {
                info!("MegaDrive: controller removed");
            }
            self.state = PadState::neutral();
            return Ok(());
        }
        if !self.state.connected {
            info!("MegaDrive: controller detected");
        }

        let mut buttons = PadButtons::NONE;
        buttons.set(PadButtons::A, a);
        buttons.set(PadButtons::B, b);
        buttons.set(PadButtons::C, c);
        buttons.set(PadButtons::START, start);

        self.state = PadState {
            buttons,
            dpad: DPad::from_directions(up, down, left, right),
            connected: true,
            ..PadState::neutral()
        };
        Ok(())
    }

    fn state(&self) -> &PadState {
        &self.state
    }
}

impl<P, W, S, D> Sleepable for MegaDrivePad<P, W, S, D>
where
    P: InputPin,
    W: InputPin + WakeSource,
    S: OutputPin,
    D: DelayNs,
{
    fn wake_on_interrupt(&mut self) -> bool {
        if self.set_select(false).is_err() {
            return false;
        }
        self.start_c.arm(WakeLevel::Low)
    }

    fn on_wake_up(&mut self) {
        self.start_c.disarm();
        let _ = self.set_select(true);
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use core::convert::Infallible;
    use std::cell::Cell;
    use std::rc::Rc;

    /// Input line whose level may depend on the select line.
    #[derive(Clone)]
    struct FakePin {
        low_when_select_high: Rc<Cell<bool>>,
        low_when_select_low: Rc<Cell<bool>>,
        select: Rc<Cell<bool>>,
        armed: Rc<Cell<Option<WakeLevel>>>,
    }

    impl FakePin {
        fn new(select: &Rc<Cell<bool>>) -> Self {
            Self {
                low_when_select_high: Rc::new(Cell::new(false)),
                low_when_select_low: Rc::new(Cell::new(false)),
                select: select.clone(),
                armed: Rc::new(Cell::new(None)),
            }
        }

        fn press(&self, high_phase: bool, low_phase: bool) {
            self.low_when_select_high.set(high_phase);
            self.low_when_select_low.set(low_phase);
        }
    }

    impl embedded_hal::digital::ErrorType for FakePin {
        type Error = Infallible;
    }

    impl InputPin for FakePin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            self.is_low().map(|low| !low)
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(if self.select.get() {
                self.low_when_select_high.get()
            } else {
                self.low_when_select_low.get()
            })
        }
    }

    impl WakeSource for FakePin {
        fn arm(&mut self, level: WakeLevel) -> bool {
            self.armed.set(Some(level));
            true
        }

        fn disarm(&mut self) {
            self.armed.set(None);
        }
    }

    struct FakeSelect(Rc<Cell<bool>>);

    impl embedded_hal::digital::ErrorType for FakeSelect {
        type Error = Infallible;
    }

    impl OutputPin for FakeSelect {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.0.set(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.0.set(true);
            Ok(())
        }
    }

    struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    struct Wiring {
        select: Rc<Cell<bool>>,
        up: FakePin,
        down: FakePin,
        left: FakePin,
        right: FakePin,
        ab: FakePin,
        start_c: FakePin,
    }

    impl Wiring {
        fn new() -> Self {
            let select = Rc::new(Cell::new(true));
            Self {
                up: FakePin::new(&select),
                down: FakePin::new(&select),
                left: FakePin::new(&select),
                right: FakePin::new(&select),
                ab: FakePin::new(&select),
                start_c: FakePin::new(&select),
                select,
            }
        }

        /// Pad plugged in, nothing pressed.
        fn plug(&self) {
            self.left.press(false, true);
            self.right.press(false, true);
        }

        fn pad(&self) -> MegaDrivePad<FakePin, FakePin, FakeSelect, NoDelay> {
            MegaDrivePad::new(
                self.up.clone(),
                self.down.clone(),
                self.left.clone(),
                self.right.clone(),
                self.ab.clone(),
                self.start_c.clone(),
                FakeSelect(self.select.clone()),
                NoDelay,
            )
        }
    }

    #[test]
    fn test_megadrive_unplugged_reads_neutral() {
        let wiring = Wiring::new();
        let mut pad = wiring.pad();
        wiring.ab.press(true, true);
        pad.read().unwrap();
        assert!(!pad.is_connected());
        assert_eq!(*pad.state(), PadState::neutral());
    }

    #[test]
    fn test_megadrive_demultiplexes_buttons() {
        let wiring = Wiring::new();
        wiring.plug();
        let mut pad = wiring.pad();

        // B in the high phase, Start in the low phase.
        wiring.ab.press(true, false);
        wiring.start_c.press(false, true);
        wiring.up.press(true, true);
        pad.read().unwrap();

        let state = pad.state();
        assert!(state.connected);
        assert_eq!(state.buttons, PadButtons::B | PadButtons::START);
        assert_eq!(state.dpad, DPad::Up);

        // A and C.
        wiring.ab.press(false, true);
        wiring.start_c.press(true, false);
        wiring.up.press(false, false);
        wiring.right.press(true, true);
        pad.read().unwrap();
        assert_eq!(pad.state().buttons, PadButtons::A | PadButtons::C);
        assert_eq!(pad.state().dpad, DPad::Right);
        assert!(wiring.select.get(), "select returns high after a read");
    }

    #[test]
    fn test_megadrive_wake_on_start() {
        let wiring = Wiring::new();
        let mut pad = wiring.pad();
        assert!(pad.wake_on_interrupt());
        assert!(!wiring.select.get());
        assert_eq!(wiring.start_c.armed.get(), Some(WakeLevel::Low));

        pad.on_wake_up();
        assert!(wiring.select.get());
        assert_eq!(wiring.start_c.armed.get(), None);
    }

    #[test]
    fn test_atari_reads_directions_and_fire() {
        let select = Rc::new(Cell::new(true));
        let up = FakePin::new(&select);
        let down = FakePin::new(&select);
        let left = FakePin::new(&select);
        let right = FakePin::new(&select);
        let fire = FakePin::new(&select);
        let mut pad = AtariPad::new(
            up.clone(),
            down.clone(),
            left.clone(),
            right.clone(),
            fire.clone(),
        );

        down.press(true, true);
        left.press(true, true);
        fire.press(true, true);
        pad.read().unwrap();
        assert!(pad.is_connected());
        assert_eq!(pad.state().dpad, DPad::DownLeft);
        assert_eq!(pad.state().buttons, PadButtons::A);

        assert!(pad.wake_on_interrupt());
        assert_eq!(fire.armed.get(), Some(WakeLevel::Low));
        pad.on_wake_up();
        assert_eq!(fire.armed.get(), None);
    }
}
