//! System off through the SoftDevice.

use defmt::{error, info};
use retro_core::LowPower;

/// nRF52840 system off. Wakes through GPIO DETECT (armed sense pins) or
/// VBUS, both of which reset the chip.
pub struct SystemOff;

impl LowPower for SystemOff {
    fn enter_low_power(&mut self) {
        info!("entering system off");
        // SAFETY: the SoftDevice is enabled; this call only returns on error.
        let ret = unsafe { nrf_softdevice::raw::sd_power_system_off() };
        // Under a debugger the chip emulates system off and keeps running.
        error!("system off failed: {}", ret);
    }
}
