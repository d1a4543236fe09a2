//! HID dispatch: input source -> mapper -> selected transport.

use crate::hold::{ActivityTimer, HoldDetector};
use crate::input::InputSource;
use crate::mapping::ReportMapper;
use crate::report::HidReport;
use crate::sleep::Sleepable;
use crate::time::{Millis, Schedule};
use crate::transport::{BleTransport, UsbTransport};
use crate::types::{PadButtons, PadState};

/// Where HID reports go.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Target {
    #[default]
    None,
    Usb,
    Ble,
}

/// HID report producer driven by the coordinator.
pub trait HidDevice: Sleepable {
    /// Read input, map it and send it to `target`. Returns when to poll again.
    fn poll<U: UsbTransport, B: BleTransport>(
        &mut self,
        now: Millis,
        target: Target,
        usb: &mut U,
        ble: &mut B,
    ) -> Schedule;

    /// Milliseconds since the last report change or wake-up.
    fn elapsed_since_activity(&self, now: Millis) -> u32;

    /// The power-down hold gesture is active.
    fn is_power_down_requested(&self, now: Millis) -> bool;

    /// Any input currently pressed.
    fn is_input_held(&self) -> bool;
}

/// Dispatcher timing and gestures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HidConfig {
    /// Poll period while sending over USB.
    pub usb_period_ms: u32,
    /// Poll period while sending over BLE, or with no target.
    pub ble_period_ms: u32,
    /// Button and hold duration that request power-down.
    pub power_down_hold: Option<(PadButtons, u32)>,
}

impl Default for HidConfig {
    fn default() -> Self {
        Self {
            usb_period_ms: crate::config::USB_UPDATE_PERIOD_MILLIS,
            ble_period_ms: crate::config::BLE_UPDATE_PERIOD_MILLIS,
            power_down_hold: Some((
                PadButtons::START,
                crate::config::LONG_PRESS_POWER_OFF_MILLIS,
            )),
        }
    }
}

/// Fixed-period HID dispatcher over an [`InputSource`] and a [`ReportMapper`].
///
/// On input errors the neutral state is mapped and sent, so a lost
/// controller never leaves buttons stuck on the host.
pub struct HidDispatcher<I, M> {
    input: I,
    mapper: M,
    config: HidConfig,
    last_report: HidReport,
    activity: ActivityTimer,
    power_hold: HoldDetector,
    woke_up: bool,
}

impl<I: InputSource, M: ReportMapper> HidDispatcher<I, M> {
    pub fn new(input: I, mapper: M, config: HidConfig, now: Millis) -> Self {
        let last_report = mapper.map(&PadState::neutral());
        Self {
            input,
            mapper,
            config,
            last_report,
            activity: ActivityTimer::new(now),
            power_hold: HoldDetector::new(),
            woke_up: false,
        }
    }

    /// Last report produced.
    pub fn last_report(&self) -> &HidReport {
        &self.last_report
    }

    pub fn input(&self) -> &I {
        &self.input
    }

    pub fn input_mut(&mut self) -> &mut I {
        &mut self.input
    }

    pub fn into_parts(self) -> (I, M) {
        (self.input, self.mapper)
    }
}

impl<I: InputSource, M: ReportMapper> HidDevice for HidDispatcher<I, M> {
    fn poll<U: UsbTransport, B: BleTransport>(
        &mut self,
        now: Millis,
        target: Target,
        usb: &mut U,
        ble: &mut B,
    ) -> Schedule {
        if self.woke_up {
            self.woke_up = false;
            self.activity.touch(now);
        }

        let state = match self.input.read() {
            Ok(()) => *self.input.state(),
            Err(e) => {
                trace!("HID: input error {:?}", e);
                PadState::neutral()
            }
        };

        if let Some((button, _)) = self.config.power_down_hold {
            self.power_hold.parse(now, state.buttons.contains(button));
        }

        let report = self.mapper.map(&state);

        let next = match target {
            Target::Usb => {
                if usb.is_ready() {
                    if let Err(e) = usb.send_report(&report) {
                        trace!("HID: USB send failed {:?}", e);
                    }
                }
                Schedule::After(self.config.usb_period_ms)
            }
            Target::Ble => {
                if let Err(e) = ble.send_report(&report) {
                    trace!("HID: BLE send failed {:?}", e);
                }
                Schedule::After(self.config.ble_period_ms)
            }
            Target::None => Schedule::After(self.config.ble_period_ms),
        };

        if report != self.last_report {
            self.last_report = report;
            self.activity.touch(now);
        }

        next
    }

    fn elapsed_since_activity(&self, now: Millis) -> u32 {
        if self.woke_up {
            return 0;
        }
        self.activity.elapsed(now)
    }

    fn is_power_down_requested(&self, now: Millis) -> bool {
        self.config
            .power_down_hold
            .is_some_and(|(_, duration)| self.power_hold.is_held(now, duration))
    }

    fn is_input_held(&self) -> bool {
        self.input.state().any_pressed()
    }
}

impl<I: InputSource, M: ReportMapper> Sleepable for HidDispatcher<I, M> {
    fn wake_on_interrupt(&mut self) -> bool {
        self.input.wake_on_interrupt()
    }

    fn on_wake_up(&mut self) {
        self.power_hold.clear();
        let _ = self.input.read();
        self.input.on_wake_up();
        self.woke_up = true;
    }
}

#[cfg(test)]
pub(crate) mod tests {
    extern crate std;

    use super::*;
    use crate::input::InputError;
    use crate::mapping::MegaDriveRetroPad;
    use crate::report::{GamepadButtons, GamepadReport};
    use crate::transport::TransportError;
    use crate::types::DPad;
    use std::vec::Vec;

    /// Input source whose state is set directly by the test.
    #[derive(Default)]
    pub(crate) struct ScriptedInput {
        pub state: PadState,
        pub fail: bool,
        pub can_sleep: bool,
        pub armed: bool,
    }

    impl InputSource for ScriptedInput {
        fn read(&mut self) -> Result<(), InputError> {
            if self.fail {
                Err(InputError::Io)
            } else {
                Ok(())
            }
        }

        fn state(&self) -> &PadState {
            &self.state
        }
    }

    impl Sleepable for ScriptedInput {
        fn wake_on_interrupt(&mut self) -> bool {
            self.armed = self.can_sleep;
            self.can_sleep
        }

        fn on_wake_up(&mut self) {
            self.armed = false;
        }
    }

    #[derive(Default)]
    pub(crate) struct MockUsb {
        pub connected: bool,
        pub ready: bool,
        pub sent: Vec<HidReport>,
    }

    impl UsbTransport for MockUsb {
        fn is_connected(&self) -> bool {
            self.connected
        }

        fn is_ready(&self) -> bool {
            self.ready
        }

        fn send_report(&mut self, report: &HidReport) -> Result<(), TransportError> {
            self.sent.push(*report);
            Ok(())
        }
    }

    #[derive(Default)]
    pub(crate) struct MockBle {
        pub connected: bool,
        pub advertising: bool,
        pub starts: usize,
        pub stops: usize,
        pub sent: Vec<HidReport>,
        pub battery: Vec<u8>,
    }

    impl BleTransport for MockBle {
        fn start(&mut self) {
            self.starts += 1;
            self.advertising = !self.connected;
        }

        fn stop(&mut self) {
            self.stops += 1;
            self.advertising = false;
            self.connected = false;
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn is_advertising(&self) -> bool {
            self.advertising
        }

        fn send_report(&mut self, report: &HidReport) -> Result<(), TransportError> {
            if !self.connected {
                return Err(TransportError::NotConnected);
            }
            self.sent.push(*report);
            Ok(())
        }

        fn notify_battery(&mut self, percent: u8) {
            self.battery.push(percent);
        }
    }

    fn dispatcher() -> HidDispatcher<ScriptedInput, MegaDriveRetroPad> {
        HidDispatcher::new(
            ScriptedInput::default(),
            MegaDriveRetroPad,
            HidConfig::default(),
            0,
        )
    }

    fn pressed(buttons: PadButtons) -> PadState {
        PadState {
            buttons,
            connected: true,
            ..PadState::neutral()
        }
    }

    #[test]
    fn test_usb_target_sends_only_when_ready() {
        let mut hid = dispatcher();
        let mut usb = MockUsb::default();
        let mut ble = MockBle::default();

        assert_eq!(hid.poll(0, Target::Usb, &mut usb, &mut ble), Schedule::After(5));
        assert!(usb.sent.is_empty());

        usb.ready = true;
        hid.poll(5, Target::Usb, &mut usb, &mut ble);
        assert_eq!(usb.sent.len(), 1);
        assert!(ble.sent.is_empty());
    }

    #[test]
    fn test_ble_target_and_idle_period() {
        let mut hid = dispatcher();
        let mut usb = MockUsb::default();
        let mut ble = MockBle {
            connected: true,
            ..MockBle::default()
        };

        assert_eq!(hid.poll(0, Target::Ble, &mut usb, &mut ble), Schedule::After(15));
        assert_eq!(ble.sent.len(), 1);
        assert_eq!(hid.poll(15, Target::None, &mut usb, &mut ble), Schedule::After(15));
        assert_eq!(ble.sent.len(), 1);
    }

    #[test]
    fn test_activity_updates_only_on_change() {
        let mut hid = dispatcher();
        let mut usb = MockUsb::default();
        let mut ble = MockBle::default();

        hid.poll(1000, Target::None, &mut usb, &mut ble);
        assert_eq!(hid.elapsed_since_activity(1000), 1000);

        hid.input_mut().state = pressed(PadButtons::B);
        hid.poll(2000, Target::None, &mut usb, &mut ble);
        assert_eq!(hid.elapsed_since_activity(2500), 500);

        // Held, unchanged.
        hid.poll(3000, Target::None, &mut usb, &mut ble);
        assert_eq!(hid.elapsed_since_activity(3000), 1000);
        assert!(hid.is_input_held());
    }

    #[test]
    fn test_input_error_sends_neutral() {
        let mut hid = dispatcher();
        let mut usb = MockUsb {
            connected: true,
            ready: true,
            ..MockUsb::default()
        };
        let mut ble = MockBle::default();

        hid.input_mut().state = pressed(PadButtons::A);
        hid.input_mut().fail = true;
        hid.poll(0, Target::Usb, &mut usb, &mut ble);
        assert_eq!(usb.sent[0], HidReport::Gamepad(GamepadReport::neutral()));
    }

    #[test]
    fn test_power_down_hold() {
        let mut hid = dispatcher();
        let mut usb = MockUsb::default();
        let mut ble = MockBle::default();

        hid.input_mut().state = pressed(PadButtons::START);
        hid.poll(100, Target::None, &mut usb, &mut ble);
        hid.poll(4000, Target::None, &mut usb, &mut ble);
        assert!(!hid.is_power_down_requested(5099));
        assert!(hid.is_power_down_requested(5100));

        // Release before the threshold never triggers.
        let mut hid = dispatcher();
        hid.input_mut().state = pressed(PadButtons::START);
        hid.poll(0, Target::None, &mut usb, &mut ble);
        hid.input_mut().state = PadState::neutral();
        hid.poll(4999, Target::None, &mut usb, &mut ble);
        assert!(!hid.is_power_down_requested(10_000));
    }

    #[test]
    fn test_wake_resets_activity_and_hold() {
        let mut hid = dispatcher();
        let mut usb = MockUsb::default();
        let mut ble = MockBle::default();

        hid.input_mut().state = pressed(PadButtons::START);
        hid.poll(0, Target::None, &mut usb, &mut ble);
        hid.input_mut().can_sleep = true;
        assert!(hid.wake_on_interrupt());
        assert!(hid.input().armed);

        hid.on_wake_up();
        assert!(!hid.input().armed);
        assert_eq!(hid.elapsed_since_activity(600_000), 0);
        assert!(!hid.is_power_down_requested(600_000));

        hid.input_mut().state = PadState::neutral();
        hid.poll(600_000, Target::None, &mut usb, &mut ble);
        assert_eq!(hid.elapsed_since_activity(600_010), 10);
    }

    #[test]
    fn test_mapped_report_reaches_transport() {
        let mut hid = dispatcher();
        let mut usb = MockUsb {
            connected: true,
            ready: true,
            ..MockUsb::default()
        };
        let mut ble = MockBle::default();

        hid.input_mut().state = PadState {
            dpad: DPad::Up,
            ..pressed(PadButtons::C)
        };
        hid.poll(0, Target::Usb, &mut usb, &mut ble);
        match usb.sent[0] {
            HidReport::Gamepad(r) => assert_eq!(r.buttons, GamepadButtons::A),
            HidReport::Keyboard(_) => panic!("expected gamepad report"),
        }
    }
}
