//! Fixed controller-to-HID mapping profiles.
//!
//! Each profile is a stateless [`ReportMapper`]: the same [`PadState`]
//! always produces a byte-identical report.

use crate::report::{keycode, GamepadButtons, GamepadReport, Hat, HidReport, KeyboardReport};
use crate::types::{AnalogStick, DPad, PadButtons, PadState};

/// Maps a controller snapshot to a HID report.
pub trait ReportMapper {
    fn map(&self, state: &PadState) -> HidReport;
}

/// Translate the d-pad to the HID hat switch.
#[must_use]
pub const fn dpad_to_hat(dpad: DPad) -> Hat {
    match dpad {
        DPad::None => Hat::Centered,
        DPad::Up => Hat::Up,
        DPad::UpRight => Hat::UpRight,
        DPad::Right => Hat::Right,
        DPad::DownRight => Hat::DownRight,
        DPad::Down => Hat::Down,
        DPad::DownLeft => Hat::DownLeft,
        DPad::Left => Hat::Left,
        DPad::UpLeft => Hat::UpLeft,
    }
}

/// OR together the report buttons of every pressed pad button in `table`.
#[must_use]
pub fn map_buttons(buttons: PadButtons, table: &[(PadButtons, GamepadButtons)]) -> GamepadButtons {
    table
        .iter()
        .filter(|&&(pad, _)| buttons.contains(pad))
        .fold(GamepadButtons::NONE, |acc, &(_, hid)| acc | hid)
}

fn digital_report(state: &PadState, table: &[(PadButtons, GamepadButtons)]) -> HidReport {
    HidReport::Gamepad(GamepadReport {
        hat: dpad_to_hat(state.dpad),
        buttons: map_buttons(state.buttons, table),
        ..GamepadReport::neutral()
    })
}

/// Mega Drive 3-button pad to RetroArch's RetroPad, Genesis Plus GX layout.
#[derive(Clone, Copy, Debug, Default)]
pub struct MegaDriveRetroPad;

impl MegaDriveRetroPad {
    const TABLE: [(PadButtons, GamepadButtons); 4] = [
        (PadButtons::A, GamepadButtons::Y),
        (PadButtons::B, GamepadButtons::B),
        (PadButtons::C, GamepadButtons::A),
        (PadButtons::START, GamepadButtons::START),
    ];
}

impl ReportMapper for MegaDriveRetroPad {
    fn map(&self, state: &PadState) -> HidReport {
        digital_report(state, &Self::TABLE)
    }
}

/// Mega Drive 3-button pad laid out like an 8BitDo M30 in D-input mode.
#[derive(Clone, Copy, Debug, Default)]
pub struct MegaDriveM30;

impl MegaDriveM30 {
    const TABLE: [(PadButtons, GamepadButtons); 4] = [
        (PadButtons::A, GamepadButtons::button(0)),
        (PadButtons::B, GamepadButtons::button(1)),
        (PadButtons::C, GamepadButtons::button(6)),
        (PadButtons::START, GamepadButtons::button(8)),
    ];
}

impl ReportMapper for MegaDriveM30 {
    fn map(&self, state: &PadState) -> HidReport {
        digital_report(state, &Self::TABLE)
    }
}

/// One-button joystick to RetroPad, fire on A.
#[derive(Clone, Copy, Debug, Default)]
pub struct AtariRetroPad;

impl AtariRetroPad {
    const TABLE: [(PadButtons, GamepadButtons); 1] = [(PadButtons::A, GamepadButtons::A)];
}

impl ReportMapper for AtariRetroPad {
    fn map(&self, state: &PadState) -> HidReport {
        digital_report(state, &Self::TABLE)
    }
}

/// One-button joystick as a keyboard: arrow keys and left Ctrl for fire,
/// the classic emulator default.
#[derive(Clone, Copy, Debug, Default)]
pub struct AtariKeyboard;

impl ReportMapper for AtariKeyboard {
    fn map(&self, state: &PadState) -> HidReport {
        let mut report = KeyboardReport::default();
        if state.buttons.contains(PadButtons::A) {
            report.modifier |= keycode::MOD_LEFT_CTRL;
        }
        let dpad = state.dpad;
        for (active, key) in [
            (dpad.up(), keycode::UP),
            (dpad.down(), keycode::DOWN),
            (dpad.left(), keycode::LEFT),
            (dpad.right(), keycode::RIGHT),
        ] {
            if active {
                report.press(key);
            }
        }
        HidReport::Keyboard(report)
    }
}

/// Full analog pad passthrough. Sticks on X/Y and Z/Rz, triggers on Rx/Ry.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnalogPad;

impl AnalogPad {
    const TABLE: [(PadButtons, GamepadButtons); 16] = [
        (PadButtons::A, GamepadButtons::A),
        (PadButtons::B, GamepadButtons::B),
        (PadButtons::C, GamepadButtons::C),
        (PadButtons::X, GamepadButtons::X),
        (PadButtons::Y, GamepadButtons::Y),
        (PadButtons::Z, GamepadButtons::Z),
        (PadButtons::L1, GamepadButtons::TL),
        (PadButtons::R1, GamepadButtons::TR),
        (PadButtons::L2, GamepadButtons::TL2),
        (PadButtons::R2, GamepadButtons::TR2),
        (PadButtons::SELECT, GamepadButtons::SELECT),
        (PadButtons::START, GamepadButtons::START),
        (PadButtons::HOME, GamepadButtons::MODE),
        (PadButtons::L3, GamepadButtons::THUMBL),
        (PadButtons::R3, GamepadButtons::THUMBR),
        (PadButtons::SHARE, GamepadButtons::button(15)),
    ];
}

// Scale i16 to i8 by taking the high byte, keeping -128 out of the
// descriptor's -127..=127 range.
fn stick_axis(value: i16) -> i8 {
    ((value >> 8) as i8).max(-127)
}

// 0..=65535 to -127..=127.
fn trigger_axis(value: u16) -> i8 {
    ((u32::from(value) * 254 / u32::from(u16::MAX)) as i32 - 127) as i8
}

impl ReportMapper for AnalogPad {
    fn map(&self, state: &PadState) -> HidReport {
        let AnalogStick { x, y } = state.left_stick;
        let AnalogStick { x: z, y: rz } = state.right_stick;
        HidReport::Gamepad(GamepadReport {
            x: stick_axis(x),
            y: stick_axis(y),
            z: stick_axis(z),
            rz: stick_axis(rz),
            rx: trigger_axis(state.left_trigger),
            ry: trigger_axis(state.right_trigger),
            hat: dpad_to_hat(state.dpad),
            buttons: map_buttons(state.buttons, &Self::TABLE),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gamepad(report: HidReport) -> GamepadReport {
        match report {
            HidReport::Gamepad(r) => r,
            HidReport::Keyboard(_) => panic!("expected gamepad report"),
        }
    }

    fn pad(buttons: PadButtons, dpad: DPad) -> PadState {
        PadState {
            buttons,
            dpad,
            connected: true,
            ..PadState::neutral()
        }
    }

    #[test]
    fn test_all_dpad_values_map_to_distinct_hats() {
        let expected = [
            Hat::Centered,
            Hat::Up,
            Hat::UpRight,
            Hat::Right,
            Hat::DownRight,
            Hat::Down,
            Hat::DownLeft,
            Hat::Left,
            Hat::UpLeft,
        ];
        for (raw, hat) in expected.iter().enumerate() {
            assert_eq!(dpad_to_hat(DPad::from_raw(raw as u8)), *hat);
        }
    }

    #[test]
    fn test_unknown_dpad_is_centered() {
        assert_eq!(dpad_to_hat(DPad::from_raw(9)), Hat::Centered);
        assert_eq!(dpad_to_hat(DPad::from_raw(200)), Hat::Centered);
    }

    #[test]
    fn test_megadrive_retropad_layout() {
        let state = pad(PadButtons::A | PadButtons::C | PadButtons::START, DPad::Left);
        let report = gamepad(MegaDriveRetroPad.map(&state));
        assert_eq!(
            report.buttons,
            GamepadButtons::Y | GamepadButtons::A | GamepadButtons::START
        );
        assert_eq!(report.hat, Hat::Left);
        assert_eq!((report.x, report.y), (0, 0));
    }

    #[test]
    fn test_megadrive_m30_layout() {
        let state = pad(PadButtons::B | PadButtons::C | PadButtons::START, DPad::None);
        let report = gamepad(MegaDriveM30.map(&state));
        assert_eq!(report.buttons.0, (1 << 1) | (1 << 6) | (1 << 8));
        assert_eq!(report.hat, Hat::Centered);
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let state = pad(PadButtons::A | PadButtons::B, DPad::DownRight);
        let mut a = [0u8; HidReport::MAX_SIZE];
        let mut b = [0u8; HidReport::MAX_SIZE];
        let first = MegaDriveRetroPad.map(&state);
        let second = MegaDriveRetroPad.map(&state);
        assert_eq!(first.encode(&mut a), second.encode(&mut b));
    }

    #[test]
    fn test_atari_keyboard() {
        let state = pad(PadButtons::A, DPad::UpRight);
        match AtariKeyboard.map(&state) {
            HidReport::Keyboard(report) => {
                assert_eq!(report.modifier, keycode::MOD_LEFT_CTRL);
                assert_eq!(report.keycodes, [keycode::UP, keycode::RIGHT, 0, 0, 0, 0]);
            }
            HidReport::Gamepad(_) => panic!("expected keyboard report"),
        }
    }

    #[test]
    fn test_atari_retropad_fire() {
        let report = gamepad(AtariRetroPad.map(&pad(PadButtons::A, DPad::Down)));
        assert_eq!(report.buttons, GamepadButtons::A);
        assert_eq!(report.hat, Hat::Down);
    }

    #[test]
    fn test_analog_pad_axes() {
        let mut state = pad(PadButtons::HOME | PadButtons::L1, DPad::None);
        state.left_stick = AnalogStick::new(-32768, 32767);
        state.right_stick = AnalogStick::new(256, -256);
        state.left_trigger = u16::MAX;
        state.right_trigger = 0;
        let report = gamepad(AnalogPad.map(&state));
        assert_eq!((report.x, report.y), (-127, 127));
        assert_eq!((report.z, report.rz), (1, -1));
        assert_eq!((report.rx, report.ry), (127, -127));
        assert_eq!(report.buttons, GamepadButtons::MODE | GamepadButtons::TL);
    }
}
