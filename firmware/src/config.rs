//! Board constants for the Seeed XIAO nRF52840.

use retro_core::BatteryCalibration;

/// pid.codes test VID/PID.
pub const USB_VID: u16 = 0x1209;
pub const USB_PID: u16 = 0x0001;
pub const USB_MANUFACTURER: &str = "RetroBle";
pub const USB_PRODUCT: &str = "RetroBle Adapter";
pub const USB_SERIAL_NUMBER: &str = "001";
pub const USB_POLL_MS: u8 = 2;

/// GAP device name, also the complete local name in the advertisement.
pub const BLE_NAME: &str = "RetroBle";

/// GAP appearance: HID gamepad (0x03C4) or HID keyboard (0x03C1).
#[cfg(not(feature = "pad-atari-keyboard"))]
pub const BLE_APPEARANCE: u16 = 0x03C4;
#[cfg(feature = "pad-atari-keyboard")]
pub const BLE_APPEARANCE: u16 = 0x03C1;

/// Advertising interval in 0.625 ms units (100 ms).
pub const BLE_ADV_INTERVAL: u32 = 160;

/// BQ25100 charger with the VBAT divider on P0.31.
///
/// SAADC: internal 0.6 V reference, gain 1/5, 12 bit.
pub const BATTERY_CALIBRATION: BatteryCalibration = BatteryCalibration {
    r1: 1000,
    r2: 510,
    v_min: 3600,
    v_max: 4000,
    v_max_charging: 4200,
    adc_reference: 3000,
    adc_max: 4095,
};

/// Settle time after enabling the divider, before sampling.
pub const ADC_SETTLE_MICROS: u64 = 5;

/// ~CHG is pulled low by the charger while charging.
pub const CHARGE_ACTIVE_LOW: bool = true;

/// Onboard RGB LED is active low.
pub const LED_ON_LOW: bool = true;
