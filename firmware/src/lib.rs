//! Retro controller to USB/BLE HID adapter for the Seeed XIAO nRF52840.
//!
//! Board bindings for the traits in `retro-core`: USB HID over embassy-usb,
//! BLE HID over the S140 SoftDevice, BQ25100 battery probe on the SAADC,
//! onboard RGB LED, controller pins with GPIO SENSE wake, system off.

#![no_std]

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;

pub use retro_core;

pub mod ble;
pub mod board;
pub mod config;
pub mod power;
pub mod profile;
pub mod usb;

pub use ble::{BleLink, Server};
pub use board::{Led, Port, SaadcProbe, SensePin};
pub use power::SystemOff;
pub use usb::UsbLink;

/// Raised on USB or BLE connect/disconnect so the main loop re-runs the
/// coordinator without waiting for its next tick.
pub static TRANSPORT_EVENT: Signal<CriticalSectionRawMutex, ()> = Signal::new();
