//! USB and BLE transport traits and error types.

use crate::report::HidReport;

/// Error type for transport operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TransportError {
    /// USB/radio I/O error.
    Io,
    /// Not enumerated / not ready for reports.
    NotReady,
    /// No BLE central connected.
    NotConnected,
    /// Report dropped (previous one still in flight).
    Dropped,
}

/// USB HID device as seen by the coordinator.
///
/// All calls return immediately. A failed send is retried with the next
/// poll, never queued.
pub trait UsbTransport {
    /// Cable attached and the host configured the device.
    fn is_connected(&self) -> bool;

    /// Ready to accept a report.
    fn is_ready(&self) -> bool;

    fn send_report(&mut self, report: &HidReport) -> Result<(), TransportError>;
}

/// BLE HID peripheral as seen by the coordinator.
pub trait BleTransport {
    /// Start advertising (no-op when already advertising or connected).
    fn start(&mut self);

    /// Stop advertising and drop any connection.
    fn stop(&mut self);

    fn is_connected(&self) -> bool;

    fn is_advertising(&self) -> bool;

    /// Fire-and-forget report notification.
    fn send_report(&mut self, report: &HidReport) -> Result<(), TransportError>;

    /// Publish the battery level, in percent.
    fn notify_battery(&mut self, percent: u8);
}
