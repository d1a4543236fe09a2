//! Timing constants.

/// Coordinator re-evaluation period while connected or advertising.
pub const BATTERY_UPDATE_PERIOD_MILLIS: u32 = 200;

/// Give up advertising and sleep after this long without a connection.
pub const ADVERTISE_NO_ACTIVITY_TIMEOUT_MILLIS: u32 = 60_000;

/// Sleep after this long connected over BLE without input activity.
pub const CONNECTED_NO_ACTIVITY_TIMEOUT_MILLIS: u32 = 300_000;

/// HID poll period while sending over USB.
pub const USB_UPDATE_PERIOD_MILLIS: u32 = 5;

/// HID poll period while sending over BLE (and while idle).
pub const BLE_UPDATE_PERIOD_MILLIS: u32 = 15;

/// Hold duration of the power-down gesture.
pub const LONG_PRESS_POWER_OFF_MILLIS: u32 = 5_000;

/// Battery sampling period.
pub const BATTERY_SAMPLE_PERIOD_MILLIS: u32 = 100;

/// Battery rolling-average history length.
pub const BATTERY_HISTORY_SIZE: usize = 50;

/// Frame period of the LED animation.
pub const LED_UPDATE_PERIOD_MILLIS: u32 = 5;
