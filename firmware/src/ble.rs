//! BLE HID peripheral on the S140 SoftDevice: GATT server (HID over GATT
//! plus battery service), advertising/connection task and the
//! non-blocking [`BleLink`] handle the coordinator drives.

use core::cell::RefCell;
use core::mem;

use defmt::{debug, info, warn};
use embassy_futures::select::{select, Either};
use embassy_nrf::usb::vbus_detect::SoftwareVbusDetect;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::signal::Signal;
use embassy_time::Timer;
use nrf_softdevice::ble::advertisement_builder::{
    AdvertisementDataType, Flag, LegacyAdvertisementBuilder, LegacyAdvertisementPayload,
    ServiceList, ServiceUuid16,
};
use nrf_softdevice::ble::gatt_server::builder::ServiceBuilder;
use nrf_softdevice::ble::gatt_server::characteristic::{Attribute, Metadata, Properties};
use nrf_softdevice::ble::gatt_server::{self, NotifyValueError, RegisterError, Service, WriteOp};
use nrf_softdevice::ble::{peripheral, Connection, Uuid};
use nrf_softdevice::{raw, Config, SocEvent, Softdevice};
use portable_atomic::{AtomicBool, Ordering};
use retro_core::{BleTransport, HidReport, TransportError};

use crate::config::{BLE_ADV_INTERVAL, BLE_APPEARANCE, BLE_NAME};
use crate::TRANSPORT_EVENT;

const HID_SERVICE: Uuid = Uuid::new_16(0x1812);
const HID_INFORMATION: Uuid = Uuid::new_16(0x2a4a);
const REPORT_MAP: Uuid = Uuid::new_16(0x2a4b);
const HID_CONTROL_POINT: Uuid = Uuid::new_16(0x2a4c);
const REPORT: Uuid = Uuid::new_16(0x2a4d);
const PROTOCOL_MODE: Uuid = Uuid::new_16(0x2a4e);
const REPORT_REFERENCE: Uuid = Uuid::new_16(0x2908);

/// Input report length for the selected profile.
#[cfg(not(feature = "pad-atari-keyboard"))]
const INPUT_REPORT_LEN: usize = retro_core::GamepadReport::SIZE;
#[cfg(feature = "pad-atari-keyboard")]
const INPUT_REPORT_LEN: usize = retro_core::KeyboardReport::SIZE;

/// Advertising wanted by the coordinator.
static ENABLED: AtomicBool = AtomicBool::new(false);
static CONNECTED: AtomicBool = AtomicBool::new(false);
/// Wakes the BLE task when `ENABLED` changes.
static COMMAND: Signal<CriticalSectionRawMutex, ()> = Signal::new();
static CONNECTION: Mutex<CriticalSectionRawMutex, RefCell<Option<Connection>>> =
    Mutex::new(RefCell::new(None));

/// SoftDevice configuration: one peripheral link, no central role.
pub fn softdevice_config() -> Config {
    Config {
        clock: Some(raw::nrf_clock_lf_cfg_t {
            source: raw::NRF_CLOCK_LF_SRC_RC as u8,
            rc_ctiv: 16,
            rc_temp_ctiv: 2,
            accuracy: raw::NRF_CLOCK_LF_ACCURACY_500_PPM as u8,
        }),
        conn_gap: Some(raw::ble_gap_conn_cfg_t {
            conn_count: 1,
            event_length: 24,
        }),
        conn_gatt: Some(raw::ble_gatt_conn_cfg_t { att_mtu: 128 }),
        gatts_attr_tab_size: Some(raw::ble_gatts_cfg_attr_tab_size_t {
            attr_tab_size: raw::BLE_GATTS_ATTR_TAB_SIZE_DEFAULT,
        }),
        gap_role_count: Some(raw::ble_gap_cfg_role_count_t {
            adv_set_count: 1,
            periph_role_count: 1,
            central_role_count: 0,
            central_sec_count: 0,
            _bitfield_1: raw::ble_gap_cfg_role_count_t::new_bitfield_1(0),
        }),
        gap_device_name: Some(raw::ble_gap_cfg_device_name_t {
            p_value: BLE_NAME.as_ptr() as _,
            current_len: BLE_NAME.len() as u16,
            max_len: BLE_NAME.len() as u16,
            // SAFETY: all-zero is "no write access".
            write_perm: unsafe { mem::zeroed() },
            _bitfield_1: raw::ble_gap_cfg_device_name_t::new_bitfield_1(
                raw::BLE_GATTS_VLOC_STACK as u8,
            ),
        }),
        conn_gatts: Some(raw::ble_gatts_conn_cfg_t {
            hvn_tx_queue_size: 4,
        }),
        ..Default::default()
    }
}

/// Runs the SoftDevice event loop and feeds USB power events to the
/// software VBUS detector (the SoftDevice owns POWER).
#[embassy_executor::task]
pub async fn softdevice_task(sd: &'static Softdevice, vbus: &'static SoftwareVbusDetect) -> ! {
    // SAFETY: SoftDevice is enabled; these only toggle event reporting.
    unsafe {
        raw::sd_power_dcdc_mode_set(raw::NRF_POWER_DCDC_MODES_NRF_POWER_DCDC_ENABLE as u8);
        raw::sd_power_usbpwrrdy_enable(1);
        raw::sd_power_usbdetected_enable(1);
        raw::sd_power_usbremoved_enable(1);
    }

    let mut usb_reg: u32 = 0;
    // SAFETY: writes a single status word.
    unsafe { raw::sd_power_usbregstatus_get(&mut usb_reg) };
    if usb_reg & 1 == 1 {
        vbus.detected(true);
    }

    sd.run_with_callback(|event: SocEvent| match event {
        SocEvent::PowerUsbRemoved => {
            debug!("VBUS removed");
            vbus.detected(false);
            TRANSPORT_EVENT.signal(());
        }
        SocEvent::PowerUsbDetected => {
            debug!("VBUS detected");
            vbus.detected(true);
        }
        SocEvent::PowerUsbPowerReady => vbus.ready(),
        _ => {}
    })
    .await
}

#[nrf_softdevice::gatt_service(uuid = "180f")]
pub struct BatteryService {
    #[characteristic(uuid = "2a19", read, notify)]
    battery_level: u8,
}

/// HID over GATT with a single input report (no report ID).
pub struct HidService {
    input_report: u16,
    input_report_cccd: u16,
    control_point: u16,
}

impl HidService {
    fn new(sd: &mut Softdevice) -> Result<Self, RegisterError> {
        let mut service = ServiceBuilder::new(sd, HID_SERVICE)?;

        service
            .add_characteristic(
                HID_INFORMATION,
                // bcdHID 1.11, no country, normally connectable
                Attribute::new([0x11u8, 0x01, 0x00, 0x02]),
                Metadata::new(Properties::new().read()),
            )?
            .build();

        service
            .add_characteristic(
                REPORT_MAP,
                Attribute::new(crate::usb::report_descriptor()),
                Metadata::new(Properties::new().read()),
            )?
            .build();

        let control_point = service
            .add_characteristic(
                HID_CONTROL_POINT,
                Attribute::new([0u8]),
                Metadata::new(Properties::new().write_without_response()),
            )?
            .build();

        // Report protocol only.
        service
            .add_characteristic(
                PROTOCOL_MODE,
                Attribute::new([1u8]),
                Metadata::new(Properties::new().read().write_without_response()),
            )?
            .build();

        let mut input = service.add_characteristic(
            REPORT,
            Attribute::new([0u8; INPUT_REPORT_LEN]),
            Metadata::new(Properties::new().read().notify()),
        )?;
        // Report ID 0, input report.
        input.add_descriptor(REPORT_REFERENCE, Attribute::new([0u8, 1u8]))?;
        let input = input.build();

        service.build();

        Ok(Self {
            input_report: input.value_handle,
            input_report_cccd: input.cccd_handle,
            control_point: control_point.value_handle,
        })
    }

    fn on_write(&self, handle: u16, data: &[u8]) {
        if handle == self.input_report_cccd {
            debug!("HID report notifications: {:?}", data);
        } else if handle == self.control_point {
            // 0 = suspend, 1 = exit suspend
            debug!("HID control point: {:?}", data);
        }
    }
}

pub struct Server {
    bas: BatteryService,
    hid: HidService,
}

impl Server {
    pub fn new(sd: &mut Softdevice) -> Result<Self, RegisterError> {
        let bas = BatteryService::new(sd)?;
        let hid = HidService::new(sd)?;
        Ok(Self { bas, hid })
    }
}

impl gatt_server::Server for Server {
    type Event = ();

    fn on_write(
        &self,
        _conn: &Connection,
        handle: u16,
        _op: WriteOp,
        _offset: usize,
        data: &[u8],
    ) -> Option<Self::Event> {
        self.hid.on_write(handle, data);
        self.bas.on_write(handle, data);
        None
    }
}

fn advertisement_data() -> LegacyAdvertisementPayload {
    LegacyAdvertisementBuilder::new()
        .flags(&[Flag::GeneralDiscovery, Flag::LE_Only])
        .services_16(
            ServiceList::Incomplete,
            &[
                ServiceUuid16::BATTERY,
                ServiceUuid16::HUMAN_INTERFACE_DEVICE,
            ],
        )
        .full_name(BLE_NAME)
        .raw(AdvertisementDataType::APPEARANCE, &BLE_APPEARANCE.to_le_bytes())
        .build()
}

static SCAN_DATA: LegacyAdvertisementPayload = LegacyAdvertisementBuilder::new()
    .services_16(
        ServiceList::Complete,
        &[
            ServiceUuid16::BATTERY,
            ServiceUuid16::HUMAN_INTERFACE_DEVICE,
        ],
    )
    .build();

async fn wait_enabled() {
    while !ENABLED.load(Ordering::Relaxed) {
        COMMAND.wait().await;
    }
}

async fn wait_disabled() {
    while ENABLED.load(Ordering::Relaxed) {
        COMMAND.wait().await;
    }
}

fn set_connection(conn: Option<Connection>) {
    let connected = conn.is_some();
    CONNECTION.lock(|c| c.replace(conn));
    CONNECTED.store(connected, Ordering::Relaxed);
    TRANSPORT_EVENT.signal(());
}

/// Advertises while enabled, then serves one connection at a time.
#[embassy_executor::task]
pub async fn ble_task(sd: &'static Softdevice, server: &'static Server) {
    let adv_data = advertisement_data();
    let mut config = peripheral::Config::default();
    config.interval = BLE_ADV_INTERVAL;

    loop {
        wait_enabled().await;

        let adv = peripheral::ConnectableAdvertisement::ScannableUndirected {
            adv_data: &adv_data,
            scan_data: &SCAN_DATA,
        };
        info!("BLE advertising");
        let advertised = select(
            peripheral::advertise_connectable(sd, adv, &config),
            wait_disabled(),
        )
        .await;

        let conn = match advertised {
            Either::First(Ok(conn)) => conn,
            Either::First(Err(e)) => {
                warn!("BLE advertise failed: {:?}", e);
                Timer::after_millis(100).await;
                continue;
            }
            Either::Second(()) => {
                info!("BLE advertising stopped");
                continue;
            }
        };

        info!("BLE connected");
        set_connection(Some(conn.clone()));

        let served = select(gatt_server::run(&conn, server, |_| {}), wait_disabled()).await;
        if let Either::Second(()) = served {
            if let Err(e) = conn.disconnect() {
                warn!("BLE disconnect failed: {:?}", e);
            }
        }

        info!("BLE disconnected");
        set_connection(None);
    }
}

/// Coordinator side of the BLE peripheral.
pub struct BleLink {
    server: &'static Server,
}

impl BleLink {
    pub fn new(server: &'static Server) -> Self {
        Self { server }
    }
}

impl BleTransport for BleLink {
    fn start(&mut self) {
        if !ENABLED.swap(true, Ordering::Relaxed) {
            COMMAND.signal(());
        }
    }

    fn stop(&mut self) {
        if ENABLED.swap(false, Ordering::Relaxed) {
            COMMAND.signal(());
        }
    }

    fn is_connected(&self) -> bool {
        CONNECTED.load(Ordering::Relaxed)
    }

    /// Enabled and not connected. The BLE task may not have started the
    /// advertising set yet, and retries it after a failure.
    fn is_advertising(&self) -> bool {
        ENABLED.load(Ordering::Relaxed) && !CONNECTED.load(Ordering::Relaxed)
    }

    fn send_report(&mut self, report: &HidReport) -> Result<(), TransportError> {
        let mut buf = [0u8; HidReport::MAX_SIZE];
        let bytes = report.encode(&mut buf);
        let handle = self.server.hid.input_report;
        CONNECTION.lock(|c| match c.borrow().as_ref() {
            Some(conn) => gatt_server::notify_value(conn, handle, bytes).map_err(|e| match e {
                NotifyValueError::Disconnected => TransportError::NotConnected,
                // Usually the notification queue is full.
                NotifyValueError::Raw(_) => TransportError::Dropped,
            }),
            None => Err(TransportError::NotConnected),
        })
    }

    fn notify_battery(&mut self, percent: u8) {
        let bas = &self.server.bas;
        let notified = CONNECTION.lock(|c| {
            c.borrow()
                .as_ref()
                .is_some_and(|conn| bas.battery_level_notify(conn, &percent).is_ok())
        });
        // Without notification (no connection or CCCD off) the value is
        // still readable.
        if !notified {
            if let Err(e) = bas.battery_level_set(&percent) {
                warn!("battery level set failed: {:?}", e);
            }
        }
    }
}
