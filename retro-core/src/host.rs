//! Analog pad fed by HID notifications from a paired Bluetooth controller.
//!
//! Parses the 16-byte input report of an Xbox Wireless Controller in
//! BLE mode:
//!
//! ```text
//! 0..2   left X   u16 LE, center 32768
//! 2..4   left Y   u16 LE, center 32767, up is low
//! 4..6   right X
//! 6..8   right Y
//! 8..10  LT       u16 LE, 0..=1023
//! 10..12 RT
//! 12     hat      0 centered, 1 up, clockwise to 8 up-left
//! 13     A B _ X Y _ LB RB
//! 14     _ _ View Menu Xbox LS RS _
//! 15     Share
//! ```

use crate::input::{InputError, InputSource};
use crate::sleep::Sleepable;
use crate::types::{AnalogStick, DPad, PadButtons, PadState};

/// Length of the input report.
pub const XBOX_REPORT_LEN: usize = 16;

const TRIGGER_MAX: u32 = 1023;

const BUTTONS_1: [(u8, PadButtons); 6] = [
    (0, PadButtons::A),
    (1, PadButtons::B),
    (3, PadButtons::X),
    (4, PadButtons::Y),
    (6, PadButtons::L1),
    (7, PadButtons::R1),
];

const BUTTONS_2: [(u8, PadButtons); 5] = [
    (2, PadButtons::SELECT),
    (3, PadButtons::START),
    (4, PadButtons::HOME),
    (5, PadButtons::L3),
    (6, PadButtons::R3),
];

fn u16_le(data: &[u8], at: usize) -> u16 {
    u16::from_le_bytes([data[at], data[at + 1]])
}

fn axis_x(raw: u16) -> i16 {
    (i32::from(raw) - 32768) as i16
}

fn axis_y(raw: u16) -> i16 {
    (32767 - i32::from(raw)) as i16
}

fn trigger(raw: u16) -> u16 {
    ((u32::from(raw).min(TRIGGER_MAX) * u32::from(u16::MAX)) / TRIGGER_MAX) as u16
}

fn bits(byte: u8, table: &[(u8, PadButtons)]) -> PadButtons {
    table
        .iter()
        .filter(|&&(bit, _)| byte & (1 << bit) != 0)
        .fold(PadButtons::NONE, |acc, &(_, button)| acc | button)
}

/// Parse an Xbox input report into a connected pad state.
pub fn parse_xbox_report(data: &[u8]) -> Result<PadState, InputError> {
    if data.len() < XBOX_REPORT_LEN {
        return Err(InputError::Parse);
    }

    let mut buttons = bits(data[13], &BUTTONS_1) | bits(data[14], &BUTTONS_2);
    buttons.set(PadButtons::SHARE, data[15] & 0x01 != 0);

    Ok(PadState {
        buttons,
        dpad: DPad::from_raw(data[12]),
        left_stick: AnalogStick::new(axis_x(u16_le(data, 0)), axis_y(u16_le(data, 2))),
        right_stick: AnalogStick::new(axis_x(u16_le(data, 4)), axis_y(u16_le(data, 6))),
        left_trigger: trigger(u16_le(data, 8)),
        right_trigger: trigger(u16_le(data, 10)),
        connected: true,
    })
}

/// Input source backed by a BLE HID host link.
///
/// The link layer pushes notifications with [`on_report`](Self::on_report)
/// and connection changes with [`set_connected`](Self::set_connected).
/// It can't wake the system, so it always refuses sleep.
#[derive(Default)]
pub struct XboxHostPad {
    state: PadState,
}

impl XboxHostPad {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            state: PadState::neutral(),
        }
    }

    /// Apply an input report. Malformed reports are dropped.
    pub fn on_report(&mut self, data: &[u8]) -> Result<(), InputError> {
        match parse_xbox_report(data) {
            Ok(state) => {
                self.state = state;
                Ok(())
            }
            Err(e) => {
                trace!("Host pad: dropped {} byte report", data.len());
                Err(e)
            }
        }
    }

    pub fn set_connected(&mut self, connected: bool) {
        if !connected {
            self.state = PadState::neutral();
        }
        self.state.connected = connected;
    }
}

impl InputSource for XboxHostPad {
    fn read(&mut self) -> Result<(), InputError> {
        if self.state.connected {
            Ok(())
        } else {
            Err(InputError::Disconnected)
        }
    }

    fn state(&self) -> &PadState {
        &self.state
    }
}

impl Sleepable for XboxHostPad {
    fn wake_on_interrupt(&mut self) -> bool {
        false
    }

    fn on_wake_up(&mut self) {}
}
