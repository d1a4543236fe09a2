//! USB HID output: the embassy-usb device, its writer task and the
//! non-blocking [`UsbLink`] handle the coordinator drives.

use defmt::{info, warn};
use embassy_nrf::peripherals;
use embassy_nrf::usb::vbus_detect::SoftwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_usb::class::hid::{
    Config as HidClassConfig, HidBootProtocol, HidSubclass, HidWriter, ReportId, RequestHandler,
    State,
};
use embassy_usb::control::OutResponse;
use embassy_usb::{Builder, Config as UsbConfig, Handler, UsbDevice};
use portable_atomic::{AtomicBool, Ordering};
use retro_core::{HidReport, TransportError, UsbTransport};
use static_cell::StaticCell;

use crate::config;
use crate::TRANSPORT_EVENT;

pub type UsbDriver = Driver<'static, peripherals::USBD, &'static SoftwareVbusDetect>;

/// Largest report either profile sends.
pub const REPORT_LEN: usize = HidReport::MAX_SIZE;

pub type UsbHidWriter = HidWriter<'static, UsbDriver, REPORT_LEN>;

static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
static HID_STATE: StaticCell<State> = StaticCell::new();
static DEVICE_HANDLER: StaticCell<DeviceStateHandler> = StaticCell::new();
static REQUEST_HANDLER: StaticCell<PadRequestHandler> = StaticCell::new();

static CONFIGURED: AtomicBool = AtomicBool::new(false);
static SUSPENDED: AtomicBool = AtomicBool::new(false);

/// Report handed from the coordinator to the writer task.
/// "Latest value wins": a report not yet written is replaced, never queued.
static REPORT_SIGNAL: Signal<CriticalSectionRawMutex, HidReport> = Signal::new();

#[cfg(not(feature = "pad-atari-keyboard"))]
pub(crate) fn report_descriptor() -> &'static [u8] {
    retro_core::report::GAMEPAD_REPORT_DESCRIPTOR
}

#[cfg(feature = "pad-atari-keyboard")]
pub(crate) fn report_descriptor() -> &'static [u8] {
    use usbd_hid::descriptor::{KeyboardReport, SerializedDescriptor};
    KeyboardReport::desc()
}

#[cfg(not(feature = "pad-atari-keyboard"))]
const BOOT: (HidSubclass, HidBootProtocol) = (HidSubclass::No, HidBootProtocol::None);
#[cfg(feature = "pad-atari-keyboard")]
const BOOT: (HidSubclass, HidBootProtocol) = (HidSubclass::Boot, HidBootProtocol::Keyboard);

/// Tracks enumeration so the coordinator can poll it without awaiting.
struct DeviceStateHandler;

impl Handler for DeviceStateHandler {
    fn enabled(&mut self, enabled: bool) {
        if !enabled {
            CONFIGURED.store(false, Ordering::Relaxed);
            TRANSPORT_EVENT.signal(());
        }
    }

    fn reset(&mut self) {
        CONFIGURED.store(false, Ordering::Relaxed);
    }

    fn configured(&mut self, configured: bool) {
        info!("USB configured: {}", configured);
        CONFIGURED.store(configured, Ordering::Relaxed);
        TRANSPORT_EVENT.signal(());
    }

    fn suspended(&mut self, suspended: bool) {
        SUSPENDED.store(suspended, Ordering::Relaxed);
    }
}

/// No output or feature reports.
struct PadRequestHandler;

impl RequestHandler for PadRequestHandler {
    fn get_report(&mut self, _id: ReportId, _buf: &mut [u8]) -> Option<usize> {
        None
    }

    fn set_report(&mut self, _id: ReportId, _data: &[u8]) -> OutResponse {
        OutResponse::Accepted
    }

    fn set_idle_ms(&mut self, _id: Option<ReportId>, _duration_ms: u32) {}

    fn get_idle_ms(&mut self, _id: Option<ReportId>) -> Option<u32> {
        None
    }
}

/// Build the USB device with one HID interface.
///
/// Must be called exactly once.
pub fn init(driver: UsbDriver) -> (UsbDevice<'static, UsbDriver>, UsbHidWriter) {
    let mut usb_config = UsbConfig::new(config::USB_VID, config::USB_PID);
    usb_config.manufacturer = Some(config::USB_MANUFACTURER);
    usb_config.product = Some(config::USB_PRODUCT);
    usb_config.serial_number = Some(config::USB_SERIAL_NUMBER);
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;

    let mut builder = Builder::new(
        driver,
        usb_config,
        CONFIG_DESCRIPTOR.init([0; 256]),
        BOS_DESCRIPTOR.init([0; 256]),
        MSOS_DESCRIPTOR.init([0; 256]),
        CONTROL_BUF.init([0; 64]),
    );
    builder.handler(DEVICE_HANDLER.init(DeviceStateHandler));

    let (hid_subclass, hid_boot_protocol) = BOOT;
    let hid_config = HidClassConfig {
        report_descriptor: report_descriptor(),
        request_handler: Some(REQUEST_HANDLER.init(PadRequestHandler)),
        poll_ms: config::USB_POLL_MS,
        max_packet_size: 16,
        hid_subclass,
        hid_boot_protocol,
    };
    let writer = HidWriter::new(&mut builder, HID_STATE.init(State::new()), hid_config);

    (builder.build(), writer)
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
pub async fn usb_task(mut device: UsbDevice<'static, UsbDriver>) {
    device.run().await;
}

/// Writes the latest report whenever one is signalled.
#[embassy_executor::task]
pub async fn hid_writer_task(mut writer: UsbHidWriter) {
    let mut buf = [0u8; REPORT_LEN];
    loop {
        writer.ready().await;
        let report = REPORT_SIGNAL.wait().await;
        if let Err(e) = writer.write(report.encode(&mut buf)).await {
            warn!("USB write failed: {:?}", e);
        }
    }
}

/// Coordinator side of the USB HID device.
pub struct UsbLink;

impl UsbTransport for UsbLink {
    fn is_connected(&self) -> bool {
        CONFIGURED.load(Ordering::Relaxed)
    }

    fn is_ready(&self) -> bool {
        self.is_connected() && !SUSPENDED.load(Ordering::Relaxed)
    }

    fn send_report(&mut self, report: &HidReport) -> Result<(), TransportError> {
        if !self.is_ready() {
            return Err(TransportError::NotReady);
        }
        REPORT_SIGNAL.signal(*report);
        Ok(())
    }
}
