//! HID wire reports: gamepad (TinyUSB layout) and boot keyboard.

use core::ops::{BitOr, BitOrAssign};

/// Gamepad hat switch value. `Centered` is outside the descriptor's
/// logical range (1..=8), which hosts read as the null state.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Hat {
    #[default]
    Centered = 0,
    Up = 1,
    UpRight = 2,
    Right = 3,
    DownRight = 4,
    Down = 5,
    DownLeft = 6,
    Left = 7,
    UpLeft = 8,
}

/// Gamepad report button bits (32 buttons).
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GamepadButtons(pub u32);

impl GamepadButtons {
    pub const A: Self = Self(1 << 0);
    pub const B: Self = Self(1 << 1);
    pub const C: Self = Self(1 << 2);
    pub const X: Self = Self(1 << 3);
    pub const Y: Self = Self(1 << 4);
    pub const Z: Self = Self(1 << 5);
    pub const TL: Self = Self(1 << 6);
    pub const TR: Self = Self(1 << 7);
    pub const TL2: Self = Self(1 << 8);
    pub const TR2: Self = Self(1 << 9);
    pub const SELECT: Self = Self(1 << 10);
    pub const START: Self = Self(1 << 11);
    pub const MODE: Self = Self(1 << 12);
    pub const THUMBL: Self = Self(1 << 13);
    pub const THUMBR: Self = Self(1 << 14);

    pub const NONE: Self = Self(0);

    /// Button by raw index (0..=31), for layouts that number buttons.
    #[must_use]
    pub const fn button(index: u8) -> Self {
        Self(1 << (index & 31))
    }

    #[inline]
    #[must_use]
    pub const fn contains(self, button: GamepadButtons) -> bool {
        (self.0 & button.0) == button.0
    }
}

impl BitOr for GamepadButtons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for GamepadButtons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

/// HID gamepad input report.
///
/// Matches [`GAMEPAD_REPORT_DESCRIPTOR`]: six signed axes, hat, then
/// 32 buttons little-endian. Total size: 11 bytes.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct GamepadReport {
    pub x: i8,
    pub y: i8,
    pub z: i8,
    pub rz: i8,
    pub rx: i8,
    pub ry: i8,
    pub hat: Hat,
    pub buttons: GamepadButtons,
}

impl GamepadReport {
    /// Size of the report in bytes.
    pub const SIZE: usize = 11;

    /// Convert the report to bytes.
    #[must_use]
    pub fn as_bytes(&self) -> [u8; Self::SIZE] {
        let b = self.buttons.0.to_le_bytes();
        [
            self.x as u8,
            self.y as u8,
            self.z as u8,
            self.rz as u8,
            self.rx as u8,
            self.ry as u8,
            self.hat as u8,
            b[0],
            b[1],
            b[2],
            b[3],
        ]
    }

    /// Neutral/zero report.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            x: 0,
            y: 0,
            z: 0,
            rz: 0,
            rx: 0,
            ry: 0,
            hat: Hat::Centered,
            buttons: GamepadButtons::NONE,
        }
    }
}

/// Keyboard usage IDs used by the keyboard profiles.
pub mod keycode {
    pub const ENTER: u8 = 0x28;
    pub const ESCAPE: u8 = 0x29;
    pub const SPACE: u8 = 0x2C;
    pub const RIGHT: u8 = 0x4F;
    pub const LEFT: u8 = 0x50;
    pub const DOWN: u8 = 0x51;
    pub const UP: u8 = 0x52;

    pub const MOD_LEFT_CTRL: u8 = 0x01;
    pub const MOD_LEFT_SHIFT: u8 = 0x02;
    pub const MOD_LEFT_ALT: u8 = 0x04;
}

/// HID boot keyboard report: modifier, reserved, six keycodes.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct KeyboardReport {
    pub modifier: u8,
    pub reserved: u8,
    pub keycodes: [u8; 6],
}

impl KeyboardReport {
    pub const SIZE: usize = 8;

    /// Add a key to the first free slot. Keys beyond six are dropped.
    pub fn press(&mut self, keycode: u8) {
        if self.keycodes.contains(&keycode) {
            return;
        }
        if let Some(slot) = self.keycodes.iter_mut().find(|k| **k == 0) {
            *slot = keycode;
        }
    }

    #[must_use]
    pub fn as_bytes(&self) -> [u8; Self::SIZE] {
        let k = &self.keycodes;
        [self.modifier, self.reserved, k[0], k[1], k[2], k[3], k[4], k[5]]
    }
}

/// A report ready for either transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HidReport {
    Gamepad(GamepadReport),
    Keyboard(KeyboardReport),
}

impl HidReport {
    /// Largest encoded report.
    pub const MAX_SIZE: usize = GamepadReport::SIZE;

    /// Encode into `buf`, returning the used prefix.
    pub fn encode<'b>(&self, buf: &'b mut [u8; Self::MAX_SIZE]) -> &'b [u8] {
        match self {
            Self::Gamepad(r) => {
                buf.copy_from_slice(&r.as_bytes());
                &buf[..GamepadReport::SIZE]
            }
            Self::Keyboard(r) => {
                buf[..KeyboardReport::SIZE].copy_from_slice(&r.as_bytes());
                &buf[..KeyboardReport::SIZE]
            }
        }
    }
}

impl From<GamepadReport> for HidReport {
    fn from(report: GamepadReport) -> Self {
        Self::Gamepad(report)
    }
}

impl From<KeyboardReport> for HidReport {
    fn from(report: KeyboardReport) -> Self {
        Self::Keyboard(report)
    }
}

/// HID Gamepad Report Descriptor for [`GamepadReport`].
///
/// Same layout as TinyUSB's `TUD_HID_REPORT_DESC_GAMEPAD`, without report ID:
/// - 6 axes (X, Y, Z, Rz, Rx, Ry), signed 8-bit
/// - hat switch, 8 directions
/// - 32 buttons
pub const GAMEPAD_REPORT_DESCRIPTOR: &[u8] = &[
    0x05, 0x01, // Usage Page (Generic Desktop)
    0x09, 0x05, // Usage (Gamepad)
    0xA1, 0x01, // Collection (Application)
    //
    // --- Axes ---
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x09, 0x30, //   Usage (X)
    0x09, 0x31, //   Usage (Y)
    0x09, 0x32, //   Usage (Z)
    0x09, 0x35, //   Usage (Rz)
    0x09, 0x33, //   Usage (Rx)
    0x09, 0x34, //   Usage (Ry)
    0x15, 0x81, //   Logical Minimum (-127)
    0x25, 0x7F, //   Logical Maximum (127)
    0x95, 0x06, //   Report Count (6)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    // --- Hat ---
    0x05, 0x01, //   Usage Page (Generic Desktop)
    0x09, 0x39, //   Usage (Hat switch)
    0x15, 0x01, //   Logical Minimum (1)
    0x25, 0x08, //   Logical Maximum (8)
    0x35, 0x00, //   Physical Minimum (0)
    0x46, 0x3B, 0x01, //   Physical Maximum (315)
    0x65, 0x14, //   Unit (English Rotation, Degrees)
    0x95, 0x01, //   Report Count (1)
    0x75, 0x08, //   Report Size (8)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    // --- Buttons (32 buttons) ---
    0x05, 0x09, //   Usage Page (Button)
    0x19, 0x01, //   Usage Minimum (Button 1)
    0x29, 0x20, //   Usage Maximum (Button 32)
    0x15, 0x00, //   Logical Minimum (0)
    0x25, 0x01, //   Logical Maximum (1)
    0x95, 0x20, //   Report Count (32)
    0x75, 0x01, //   Report Size (1)
    0x81, 0x02, //   Input (Data, Variable, Absolute)
    //
    0xC0, // End Collection
];
