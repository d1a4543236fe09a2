//! Controller-side types: PadButtons, DPad, AnalogStick, PadState.

use core::ops::{BitAnd, BitAndAssign, BitOr, BitOrAssign, Not};

/// Physical controller buttons as a bitfield.
///
/// Covers the superset of what the supported pads expose: the six face
/// buttons of a Mega Drive 6-button pad, shoulders, sticks and the menu
/// cluster of an analog host pad.
///
/// # Example
///
/// ```
/// use retro_core::PadButtons;
///
/// let buttons = PadButtons::A | PadButtons::START;
/// assert!(buttons.contains(PadButtons::A));
/// assert!(!buttons.contains(PadButtons::B));
/// ```
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PadButtons(pub u16);

impl PadButtons {
    pub const A: Self = Self(1 << 0);
    pub const B: Self = Self(1 << 1);
    pub const C: Self = Self(1 << 2);
    pub const X: Self = Self(1 << 3);
    pub const Y: Self = Self(1 << 4);
    pub const Z: Self = Self(1 << 5);
    pub const L1: Self = Self(1 << 6);
    pub const R1: Self = Self(1 << 7);
    pub const L2: Self = Self(1 << 8);
    pub const R2: Self = Self(1 << 9);
    pub const SELECT: Self = Self(1 << 10);
    pub const START: Self = Self(1 << 11);
    pub const HOME: Self = Self(1 << 12);
    pub const L3: Self = Self(1 << 13); // Left stick press
    pub const R3: Self = Self(1 << 14); // Right stick press
    pub const SHARE: Self = Self(1 << 15);

    /// No buttons pressed.
    pub const NONE: Self = Self(0);

    /// Check if the given button(s) are pressed.
    #[inline]
    #[must_use]
    pub const fn contains(self, button: PadButtons) -> bool {
        (self.0 & button.0) == button.0
    }

    /// Set or clear button(s).
    #[inline]
    pub fn set(&mut self, button: PadButtons, pressed: bool) {
        if pressed {
            self.0 |= button.0;
        } else {
            self.0 &= !button.0;
        }
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u16 {
        self.0
    }

    #[inline]
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl BitOr for PadButtons {
    type Output = Self;

    #[inline]
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl BitOrAssign for PadButtons {
    #[inline]
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for PadButtons {
    type Output = Self;

    #[inline]
    fn bitand(self, rhs: Self) -> Self::Output {
        Self(self.0 & rhs.0)
    }
}

impl BitAndAssign for PadButtons {
    #[inline]
    fn bitand_assign(&mut self, rhs: Self) {
        self.0 &= rhs.0;
    }
}

impl Not for PadButtons {
    type Output = Self;

    #[inline]
    fn not(self) -> Self::Output {
        Self(!self.0)
    }
}

/// Eight-way directional pad plus centered.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DPad {
    #[default]
    None = 0,
    Up = 1,
    UpRight = 2,
    Right = 3,
    DownRight = 4,
    Down = 5,
    DownLeft = 6,
    Left = 7,
    UpLeft = 8,
}

impl DPad {
    /// Decode a raw direction value; anything unrecognised is centered.
    #[must_use]
    pub const fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Up,
            2 => Self::UpRight,
            3 => Self::Right,
            4 => Self::DownRight,
            5 => Self::Down,
            6 => Self::DownLeft,
            7 => Self::Left,
            8 => Self::UpLeft,
            _ => Self::None,
        }
    }

    /// Build from four direction switches. Opposing directions cancel out.
    #[must_use]
    pub const fn from_directions(up: bool, down: bool, left: bool, right: bool) -> Self {
        let vertical = (up as i8) - (down as i8);
        let horizontal = (right as i8) - (left as i8);
        match (vertical, horizontal) {
            (1, 0) => Self::Up,
            (1, 1) => Self::UpRight,
            (0, 1) => Self::Right,
            (-1, 1) => Self::DownRight,
            (-1, 0) => Self::Down,
            (-1, -1) => Self::DownLeft,
            (0, -1) => Self::Left,
            (1, -1) => Self::UpLeft,
            _ => Self::None,
        }
    }

    #[must_use]
    pub const fn up(self) -> bool {
        matches!(self, Self::Up | Self::UpRight | Self::UpLeft)
    }

    #[must_use]
    pub const fn down(self) -> bool {
        matches!(self, Self::Down | Self::DownRight | Self::DownLeft)
    }

    #[must_use]
    pub const fn left(self) -> bool {
        matches!(self, Self::Left | Self::UpLeft | Self::DownLeft)
    }

    #[must_use]
    pub const fn right(self) -> bool {
        matches!(self, Self::Right | Self::UpRight | Self::DownRight)
    }
}

/// Analog stick with X/Y axes.
///
/// Range: [-32768, 32767], Y positive is down (HID convention).
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct AnalogStick {
    pub x: i16,
    pub y: i16,
}

impl AnalogStick {
    #[must_use]
    pub const fn new(x: i16, y: i16) -> Self {
        Self { x, y }
    }

    pub const NEUTRAL: Self = Self { x: 0, y: 0 };
}

/// Snapshot of a controller, as read by an input source.
///
/// Digital pads only fill `buttons` and `dpad`; analog host pads also
/// fill the sticks and triggers (0..=65535).
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PadState {
    pub buttons: PadButtons,
    pub dpad: DPad,
    pub left_stick: AnalogStick,
    pub right_stick: AnalogStick,
    pub left_trigger: u16,
    pub right_trigger: u16,
    /// Controller detected on the port / link.
    pub connected: bool,
}

impl PadState {
    /// Nothing pressed, sticks centered, not connected.
    #[must_use]
    pub const fn neutral() -> Self {
        Self {
            buttons: PadButtons::NONE,
            dpad: DPad::None,
            left_stick: AnalogStick::NEUTRAL,
            right_stick: AnalogStick::NEUTRAL,
            left_trigger: 0,
            right_trigger: 0,
            connected: false,
        }
    }

    /// Any button or direction currently held.
    #[must_use]
    pub const fn any_pressed(&self) -> bool {
        !self.buttons.is_empty() || !matches!(self.dpad, DPad::None)
    }
}
