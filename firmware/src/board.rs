//! GPIO, SAADC and LED bindings for the retro-core traits.

use core::convert::Infallible;

use defmt::{debug, warn};
use embassy_nrf::gpio::{Flex, Input, Level, Output, OutputDrive, Pull};
use embassy_nrf::pac;
use embassy_nrf::saadc::Saadc;
use embassy_time::{block_for, Duration};
use embedded_hal::digital::{ErrorType, InputPin};
use retro_core::{BatteryProbe, RgbLed, WakeLevel, WakeSource};

use crate::config::{ADC_SETTLE_MICROS, LED_ON_LOW};

/// GPIO port of a pin, for the SENSE configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, defmt::Format)]
pub enum Port {
    P0,
    P1,
}

impl Port {
    fn regs(self) -> pac::gpio::Gpio {
        match self {
            Port::P0 => pac::P0,
            Port::P1 => pac::P1,
        }
    }
}

/// Pulled-up input that can wake the chip from system off through the
/// GPIO DETECT signal.
pub struct SensePin<'d> {
    input: Input<'d>,
    port: Port,
    pin: usize,
}

impl<'d> SensePin<'d> {
    pub fn new(input: Input<'d>, port: Port, pin: u8) -> Self {
        Self {
            input,
            port,
            pin: usize::from(pin),
        }
    }

    fn set_sense(&self, sense: pac::gpio::vals::Sense) {
        self.port
            .regs()
            .pin_cnf(self.pin)
            .modify(|w| w.set_sense(sense));
    }
}

impl ErrorType for SensePin<'_> {
    type Error = Infallible;
}

impl InputPin for SensePin<'_> {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.input.is_high())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(self.input.is_low())
    }
}

impl WakeSource for SensePin<'_> {
    fn arm(&mut self, level: WakeLevel) -> bool {
        let (sense, already) = match level {
            WakeLevel::High => (pac::gpio::vals::Sense::HIGH, self.input.is_high()),
            WakeLevel::Low => (pac::gpio::vals::Sense::LOW, self.input.is_low()),
        };
        if already {
            // DETECT would fire straight away.
            debug!("P{}.{:02} already {:?}", self.port as u8, self.pin, level);
            return false;
        }
        self.set_sense(sense);
        true
    }

    fn disarm(&mut self) {
        self.set_sense(pac::gpio::vals::Sense::DISABLED);
    }
}

/// VBAT divider behind an enable switch, sampled on one SAADC channel.
///
/// The switch is enabled by driving the enable line low and released by
/// floating it.
pub struct SaadcProbe<'d> {
    saadc: Saadc<'d, 1>,
    enable: Flex<'d>,
}

impl<'d> SaadcProbe<'d> {
    pub fn new(saadc: Saadc<'d, 1>, mut enable: Flex<'d>) -> Self {
        enable.set_as_input(Pull::None);
        Self { saadc, enable }
    }
}

impl BatteryProbe for SaadcProbe<'_> {
    fn enable(&mut self) {
        self.enable.set_low();
        self.enable.set_as_output(OutputDrive::Standard);
        block_for(Duration::from_micros(ADC_SETTLE_MICROS));
    }

    fn disable(&mut self) {
        self.enable.set_as_input(Pull::None);
    }

    fn read_adc(&mut self) -> Option<u16> {
        let mut buf = [0i16; 1];
        embassy_futures::block_on(self.saadc.sample(&mut buf));
        // Single ended conversions can dip slightly below zero.
        match u16::try_from(buf[0]) {
            Ok(raw) => Some(raw),
            Err(_) => {
                warn!("negative battery sample {}", buf[0]);
                None
            }
        }
    }
}

/// Onboard RGB LED, one GPIO per colour.
pub struct Led<'d> {
    red: Output<'d>,
    green: Output<'d>,
    blue: Output<'d>,
}

impl<'d> Led<'d> {
    pub fn new(red: Output<'d>, green: Output<'d>, blue: Output<'d>) -> Self {
        Self { red, green, blue }
    }
}

const fn led_level(on: bool) -> Level {
    if on != LED_ON_LOW {
        Level::High
    } else {
        Level::Low
    }
}

impl RgbLed for Led<'_> {
    fn set_rgb(&mut self, red: bool, green: bool, blue: bool) {
        self.red.set_level(led_level(red));
        self.green.set_level(led_level(green));
        self.blue.set_level(led_level(blue));
    }
}

/// Output level that leaves an active-low LED dark.
pub const LED_OFF: Level = led_level(false);
