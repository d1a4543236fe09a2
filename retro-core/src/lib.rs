//! Platform-agnostic core of a retro controller to USB/BLE HID adapter.
//!
//! This crate holds every decision the firmware makes, with hardware
//! reached only through small traits. It runs on the target as `no_std`
//! and on the host for testing.
//!
//! # Overview
//!
//! - [`types`]: Controller snapshot ([`PadState`], [`PadButtons`], [`DPad`])
//! - [`pad`], [`host`]: Input sources (GPIO pads, BLE host pad)
//! - [`mapping`]: Controller-to-HID profiles ([`ReportMapper`])
//! - [`report`]: HID wire reports and descriptor
//! - [`hid`]: Report dispatch to the active transport ([`HidDispatcher`])
//! - [`battery`]: Charge sensing ([`BatteryMonitor`])
//! - [`indicator`]: Status LED ([`LedAnimator`])
//! - [`coordinator`]: USB/BLE/sleep state machine ([`Coordinator`])
//! - [`device`]: Cooperative scheduler tying it together ([`RetroDevice`])
//!
//! # Data flow
//!
//! ```text
//! InputSource ──► ReportMapper ──► HidDispatcher ──► UsbTransport | BleTransport
//!                                       ▲
//! BatteryMonitor ──► Coordinator ───────┘ (target)
//!                        └──► Indicator
//! ```
//!
//! # Example
//!
//! ```rust
//! use retro_core::{DPad, MegaDriveRetroPad, PadButtons, PadState, ReportMapper};
//!
//! let state = PadState {
//!     buttons: PadButtons::C | PadButtons::START,
//!     dpad: DPad::UpLeft,
//!     connected: true,
//!     ..PadState::neutral()
//! };
//! let report = MegaDriveRetroPad.map(&state);
//! let mut buf = [0u8; retro_core::HidReport::MAX_SIZE];
//! assert_eq!(report.encode(&mut buf)[6], 8); // hat: up-left
//! ```
//!
//! # Features
//!
//! - **`std`**: Enable standard library support (for host testing)
//! - **`defmt`**: defmt formatting and logging (for embedded targets)
//! - **`log`**: `log` facade logging (for host tools)
//!
//! # No-std Support
//!
//! This crate is `#![no_std]` by default and uses no heap allocations.

#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(feature = "std")]
extern crate std;

// Must come first so the logging macros are visible in every module.
mod fmt;

pub mod average;
pub mod battery;
pub mod config;
pub mod coordinator;
pub mod device;
pub mod hid;
pub mod hold;
pub mod host;
pub mod indicator;
pub mod input;
pub mod mapping;
pub mod pad;
pub mod report;
pub mod sleep;
pub mod time;
pub mod transport;
pub mod types;

// Re-export main types at crate root
pub use average::RollingAverage;
pub use battery::{
    charge_level_percent, BatteryCalibration, BatteryError, BatteryManager, BatteryMonitor,
    BatteryProbe, BatteryState, ChargeDetect,
};
pub use coordinator::{Coordinator, CoordinatorConfig, CoordinatorState, StartError};
pub use device::{RetroDevice, TaskTimer};
pub use hid::{HidConfig, HidDevice, HidDispatcher, Target};
pub use hold::{ActivityTimer, HoldDetector};
pub use host::{parse_xbox_report, XboxHostPad};
pub use indicator::{Indicator, IndicatorMode, LedAnimator, RgbLed};
pub use input::{InputError, InputSource};
pub use mapping::{
    dpad_to_hat, AnalogPad, AtariKeyboard, AtariRetroPad, MegaDriveM30, MegaDriveRetroPad,
    ReportMapper,
};
pub use pad::{AtariPad, MegaDrivePad};
pub use report::{GamepadButtons, GamepadReport, Hat, HidReport, KeyboardReport};
pub use sleep::{LowPower, Sleepable, WakeLevel, WakeSource};
pub use time::{elapsed, Millis, Schedule};
pub use transport::{BleTransport, TransportError, UsbTransport};
pub use types::{AnalogStick, DPad, PadButtons, PadState};
