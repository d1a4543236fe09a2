#![no_std]
#![no_main]

use defmt::{error, info, unwrap};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_nrf::gpio::{Flex, Input, Output, OutputDrive, Pull};
use embassy_nrf::interrupt::{self, InterruptExt, Priority};
use embassy_nrf::usb::vbus_detect::SoftwareVbusDetect;
use embassy_nrf::usb::Driver;
use embassy_nrf::{bind_interrupts, peripherals, saadc};
use embassy_time::{Instant, Timer};
use nrf_softdevice::Softdevice;
use retro_ble::board::LED_OFF;
use retro_ble::config::{BATTERY_CALIBRATION, CHARGE_ACTIVE_LOW};
use retro_ble::profile::{Pad, MAPPER};
use retro_ble::{
    ble, usb, BleLink, Led, Port, SaadcProbe, SensePin, Server, SystemOff, UsbLink,
    TRANSPORT_EVENT,
};
use retro_core::config::{
    BATTERY_HISTORY_SIZE, BATTERY_SAMPLE_PERIOD_MILLIS, LED_UPDATE_PERIOD_MILLIS,
};
use retro_core::{
    BatteryMonitor, ChargeDetect, Coordinator, CoordinatorConfig, HidConfig, HidDispatcher,
    LedAnimator, Millis, RetroDevice,
};
use static_cell::StaticCell;

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    USBD => embassy_nrf::usb::InterruptHandler<peripherals::USBD>;
    SAADC => saadc::InterruptHandler;
});

static VBUS: StaticCell<SoftwareVbusDetect> = StaticCell::new();
static SERVER: StaticCell<Server> = StaticCell::new();

/// Wrapping millisecond clock shared with the core.
fn now_millis() -> Millis {
    Instant::now().as_millis() as Millis
}

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("RetroBle starting...");

    // The SoftDevice reserves priorities 0, 1 and 4.
    let mut nrf_config = embassy_nrf::config::Config::default();
    nrf_config.gpiote_interrupt_priority = Priority::P2;
    nrf_config.time_interrupt_priority = Priority::P2;
    let p = embassy_nrf::init(nrf_config);
    interrupt::USBD.set_priority(Priority::P2);
    interrupt::SAADC.set_priority(Priority::P3);

    // --- SoftDevice + GATT server ---
    let sd = Softdevice::enable(&ble::softdevice_config());
    let server: &'static Server = SERVER.init(unwrap!(Server::new(sd)));
    let sd: &'static Softdevice = sd;

    let vbus: &'static SoftwareVbusDetect = VBUS.init(SoftwareVbusDetect::new(false, false));
    spawner.spawn(ble::softdevice_task(sd, vbus).unwrap());
    spawner.spawn(ble::ble_task(sd, server).unwrap());

    // --- USB ---
    let (usb_device, hid_writer) = usb::init(Driver::new(p.USBD, Irqs, vbus));
    spawner.spawn(usb::usb_task(usb_device).unwrap());
    spawner.spawn(usb::hid_writer_task(hid_writer).unwrap());

    // --- Battery: VBAT divider on P0.31, enable on P0.14, ~CHG on P0.17 ---
    let mut channel = saadc::ChannelConfig::single_ended(p.P0_31);
    channel.gain = saadc::Gain::GAIN1_5;
    channel.reference = saadc::Reference::INTERNAL;
    let adc = saadc::Saadc::new(p.SAADC, Irqs, saadc::Config::default(), [channel]);
    adc.calibrate().await;
    let probe = SaadcProbe::new(adc, Flex::new(p.P0_14));
    let charging = SensePin::new(Input::new(p.P0_17, Pull::Up), Port::P0, 17);
    let bms = BatteryMonitor::<_, _, BATTERY_HISTORY_SIZE>::new(
        ChargeDetect::new(charging, CHARGE_ACTIVE_LOW),
        probe,
        BATTERY_CALIBRATION,
        BATTERY_SAMPLE_PERIOD_MILLIS,
    );

    // --- RGB LED ---
    let led = Led::new(
        Output::new(p.P0_26, LED_OFF, OutputDrive::Standard),
        Output::new(p.P0_30, LED_OFF, OutputDrive::Standard),
        Output::new(p.P0_06, LED_OFF, OutputDrive::Standard),
    );

    // --- Controller ---
    // Mega Drive: D6 up, D5 down, D4 left/info, D3 right/info, D1 A/B,
    // D0 Start/C (wake), D2 select.
    #[cfg(any(feature = "pad-megadrive", feature = "pad-megadrive-m30"))]
    let pad: Pad = retro_core::MegaDrivePad::new(
        Input::new(p.P1_11, Pull::Up),
        Input::new(p.P0_05, Pull::Up),
        Input::new(p.P0_04, Pull::Up),
        Input::new(p.P0_29, Pull::Up),
        Input::new(p.P0_03, Pull::Up),
        SensePin::new(Input::new(p.P0_02, Pull::Up), Port::P0, 2),
        Output::new(p.P0_28, embassy_nrf::gpio::Level::High, OutputDrive::Standard),
        embassy_time::Delay,
    );

    // Atari: D1 up, D2 down, D3 left, D0 right, D4 fire (wake).
    #[cfg(any(feature = "pad-atari", feature = "pad-atari-keyboard"))]
    let pad: Pad = retro_core::AtariPad::new(
        Input::new(p.P0_03, Pull::Up),
        Input::new(p.P0_28, Pull::Up),
        Input::new(p.P0_29, Pull::Up),
        Input::new(p.P0_02, Pull::Up),
        SensePin::new(Input::new(p.P0_04, Pull::Up), Port::P0, 4),
    );

    let hid = HidDispatcher::new(pad, MAPPER, HidConfig::default(), now_millis());

    let coordinator = Coordinator::new(
        UsbLink,
        BleLink::new(server),
        LedAnimator::new(led, LED_UPDATE_PERIOD_MILLIS),
        hid,
        bms,
        SystemOff,
        CoordinatorConfig::default(),
    );
    let mut device = RetroDevice::new(coordinator);

    if let Err(e) = device.start(now_millis()) {
        error!("start failed: {:?}", e);
        return;
    }
    info!("RetroBle initialized");

    loop {
        let next = device.poll(now_millis());
        let woke = match next {
            Some(delay) => {
                select(Timer::after_millis(u64::from(delay)), TRANSPORT_EVENT.wait()).await
            }
            None => Either::Second(TRANSPORT_EVENT.wait().await),
        };
        if let Either::Second(()) = woke {
            device.on_transport_event(now_millis());
        }
    }
}
