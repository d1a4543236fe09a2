//! Battery monitoring for a single-cell charger with a switched voltage divider.
//!
//! The monitor samples a charge-detect line and a divided battery voltage.
//! Voltages go through a [`RollingAverage`] and are mapped to a `0..=255`
//! charge level over one of two windows: `[v_min, v_max]` on battery, or
//! `[v_min, v_max_charging]` while charging (the charger lifts the cell
//! voltage, so the on-battery window would read full too early).

use embedded_hal::digital::InputPin;

use crate::average::RollingAverage;
use crate::sleep::{Sleepable, WakeLevel, WakeSource};
use crate::time::Schedule;

/// Full charge level.
pub const CHARGE_LEVEL_MAX: u8 = u8::MAX;

/// Derived battery state.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryState {
    /// Charge level, `0..=255`.
    pub charge_level: u8,
    pub charging: bool,
}

impl BatteryState {
    #[must_use]
    pub const fn percent(&self) -> u8 {
        charge_level_percent(self.charge_level)
    }
}

/// Charge level as a percentage, `0..=100`.
#[must_use]
pub const fn charge_level_percent(level: u8) -> u8 {
    if level < CHARGE_LEVEL_MAX {
        ((level as u16 * 100) / CHARGE_LEVEL_MAX as u16) as u8
    } else {
        100
    }
}

/// Error type for battery monitor operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BatteryError {
    /// Calibration window or divider is unusable.
    Calibration,
}

/// Divider, ADC and voltage window calibration. Voltages in mV.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BatteryCalibration {
    /// Divider high side resistance.
    pub r1: u16,
    /// Divider low side resistance (the ADC measures across this one).
    pub r2: u16,
    pub v_min: u16,
    pub v_max: u16,
    pub v_max_charging: u16,
    /// ADC full-scale reference voltage.
    pub adc_reference: u16,
    /// ADC raw value at full scale.
    pub adc_max: u16,
}

impl BatteryCalibration {
    /// Check the calibration describes a usable window and divider.
    pub fn validate(&self) -> Result<(), BatteryError> {
        if self.v_min >= self.v_max
            || self.v_max > self.v_max_charging
            || self.r2 == 0
            || self.adc_max == 0
        {
            return Err(BatteryError::Calibration);
        }
        Ok(())
    }

    /// Battery voltage in mV from a raw ADC reading across `r2`.
    #[must_use]
    pub fn millivolts_from_adc(&self, raw: u16) -> u16 {
        let num = u64::from(raw)
            * u64::from(self.adc_reference)
            * (u64::from(self.r1) + u64::from(self.r2));
        let den = u64::from(self.adc_max) * u64::from(self.r2);
        if den == 0 {
            return 0;
        }
        (num / den).min(u64::from(u16::MAX)) as u16
    }

    /// Map a voltage to a charge level using the window for `charging`.
    ///
    /// While charging the level stays below 255 until the voltage reaches
    /// `v_max_charging`.
    #[must_use]
    pub fn charge_level(&self, millivolts: u16, charging: bool) -> u8 {
        let v_top = if charging { self.v_max_charging } else { self.v_max };
        if v_top <= self.v_min {
            return if millivolts >= v_top { CHARGE_LEVEL_MAX } else { 0 };
        }
        if millivolts >= v_top {
            return CHARGE_LEVEL_MAX;
        }
        let clipped = millivolts.max(self.v_min);
        let level = (u32::from(clipped - self.v_min) * u32::from(CHARGE_LEVEL_MAX))
            / u32::from(v_top - self.v_min);
        let level = level as u8;
        if charging {
            level.min(CHARGE_LEVEL_MAX - 1)
        } else {
            level
        }
    }
}

/// Charge-detect line, typically the charger's open-drain status output.
pub struct ChargeDetect<P> {
    pin: P,
    active_low: bool,
}

impl<P: InputPin + WakeSource> ChargeDetect<P> {
    pub fn new(pin: P, active_low: bool) -> Self {
        Self { pin, active_low }
    }

    /// Current charging state. An unreadable pin reads as not charging.
    pub fn is_charging(&mut self) -> bool {
        if self.active_low {
            self.pin.is_low().unwrap_or(false)
        } else {
            self.pin.is_high().unwrap_or(false)
        }
    }

    /// Pin level that corresponds to `charging`.
    fn level_for(&self, charging: bool) -> WakeLevel {
        if charging == self.active_low {
            WakeLevel::Low
        } else {
            WakeLevel::High
        }
    }

    fn arm_for(&mut self, charging: bool) -> bool {
        let level = self.level_for(charging);
        self.pin.arm(level)
    }

    fn disarm(&mut self) {
        self.pin.disarm();
    }

    pub fn pin_mut(&mut self) -> &mut P {
        &mut self.pin
    }
}

/// Switched battery voltage divider on an ADC channel.
pub trait BatteryProbe {
    /// Energize the divider.
    fn enable(&mut self);

    /// De-energize the divider (high impedance).
    fn disable(&mut self);

    /// Raw ADC reading across the divider, after the probe has settled.
    fn read_adc(&mut self) -> Option<u16>;
}

/// Battery manager as seen by the coordinator.
pub trait BatteryManager: Sleepable {
    /// Enable periodic sampling.
    fn start(&mut self) -> Result<(), BatteryError>;

    /// Disable sampling and de-energize the probe.
    fn stop(&mut self);

    fn is_running(&self) -> bool;

    /// Take one sample. Returns when the next sample is due.
    fn sample(&mut self) -> Schedule;

    /// Current derived state.
    fn battery_state(&self) -> BatteryState;
}

/// Rolling-average battery monitor with `N` samples of history.
///
/// The probe is pulsed around each reading on battery and held enabled
/// while charging. On a charge state flip the history is reset to a fresh
/// reading, so the level never blends samples from the two windows.
pub struct BatteryMonitor<P, B, const N: usize> {
    detect: ChargeDetect<P>,
    probe: B,
    calibration: BatteryCalibration,
    period_ms: u32,
    average: RollingAverage<N>,
    charging: bool,
    running: bool,
}

impl<P, B, const N: usize> BatteryMonitor<P, B, N>
where
    P: InputPin + WakeSource,
    B: BatteryProbe,
{
    pub fn new(
        detect: ChargeDetect<P>,
        probe: B,
        calibration: BatteryCalibration,
        period_ms: u32,
    ) -> Self {
        Self {
            detect,
            probe,
            calibration,
            period_ms,
            average: RollingAverage::new(0),
            charging: false,
            running: false,
        }
    }

    /// Filtered battery voltage in mV.
    #[must_use]
    pub fn average_millivolts(&self) -> u16 {
        self.average.average()
    }

    pub fn calibration(&self) -> &BatteryCalibration {
        &self.calibration
    }

    pub fn probe_mut(&mut self) -> &mut B {
        &mut self.probe
    }

    pub fn detect_mut(&mut self) -> &mut ChargeDetect<P> {
        &mut self.detect
    }

    fn read_millivolts(&mut self) -> u16 {
        let raw = if self.charging {
            self.probe.read_adc()
        } else {
            self.probe.enable();
            let raw = self.probe.read_adc();
            self.probe.disable();
            raw
        };
        raw.map_or(0, |raw| self.calibration.millivolts_from_adc(raw))
    }

    fn apply_probe_mode(&mut self) {
        if self.charging {
            self.probe.enable();
        } else {
            self.probe.disable();
        }
    }

    fn resync(&mut self, charging: bool) {
        self.charging = charging;
        self.apply_probe_mode();
        let mv = self.read_millivolts();
        self.average.clear(mv);
    }
}

impl<P, B, const N: usize> BatteryManager for BatteryMonitor<P, B, N>
where
    P: InputPin + WakeSource,
    B: BatteryProbe,
{
    fn start(&mut self) -> Result<(), BatteryError> {
        if let Err(e) = self.calibration.validate() {
            error!("Battery: invalid calibration");
            return Err(e);
        }
        let charging = self.detect.is_charging();
        self.resync(charging);
        self.running = true;
        info!(
            "Battery: started, {} mV, charging={}",
            self.average.average(),
            self.charging
        );
        Ok(())
    }

    fn stop(&mut self) {
        self.probe.disable();
        self.running = false;
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn sample(&mut self) -> Schedule {
        if !self.running {
            return Schedule::Idle;
        }

        let charging = self.detect.is_charging();
        if charging != self.charging {
            self.resync(charging);
            debug!("Battery: charging={}, reset to {} mV", charging, self.average.average());
        } else {
            let mv = self.read_millivolts();
            self.average.step(mv);
        }

        Schedule::After(self.period_ms)
    }

    fn battery_state(&self) -> BatteryState {
        BatteryState {
            charge_level: self.calibration.charge_level(self.average.average(), self.charging),
            charging: self.charging,
        }
    }
}

impl<P, B, const N: usize> Sleepable for BatteryMonitor<P, B, N>
where
    P: InputPin + WakeSource,
    B: BatteryProbe,
{
    fn wake_on_interrupt(&mut self) -> bool {
        if self.detect.is_charging() != self.charging {
            // Charge state changed since the last sample, nothing to wait for.
            return false;
        }
        self.detect.arm_for(!self.charging)
    }

    fn on_wake_up(&mut self) {
        self.detect.disarm();
        if self.running {
            self.apply_probe_mode();
        }
    }
}

#[cfg(test)]
mod tests {
    extern crate std;

    use super::*;
    use core::convert::Infallible;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::vec::Vec;

    const CAL: BatteryCalibration = BatteryCalibration {
        r1: 1000,
        r2: 510,
        v_min: 3600,
        v_max: 4000,
        v_max_charging: 4200,
        adc_reference: 3000,
        adc_max: 4095,
    };

    #[derive(Clone, Default)]
    struct FakeChargePin {
        low: Rc<Cell<bool>>,
        armed: Rc<Cell<Option<WakeLevel>>>,
    }

    impl embedded_hal::digital::ErrorType for FakeChargePin {
        type Error = Infallible;
    }

    impl InputPin for FakeChargePin {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.low.get())
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(self.low.get())
        }
    }

    impl WakeSource for FakeChargePin {
        fn arm(&mut self, level: WakeLevel) -> bool {
            self.armed.set(Some(level));
            true
        }

        fn disarm(&mut self) {
            self.armed.set(None);
        }
    }

    #[derive(Clone, Default)]
    struct FakeProbe {
        millivolts: Rc<Cell<u16>>,
        enabled: Rc<Cell<bool>>,
        log: Rc<RefCell<Vec<&'static str>>>,
    }

    impl BatteryProbe for FakeProbe {
        fn enable(&mut self) {
            self.enabled.set(true);
            self.log.borrow_mut().push("enable");
        }

        fn disable(&mut self) {
            self.enabled.set(false);
            self.log.borrow_mut().push("disable");
        }

        fn read_adc(&mut self) -> Option<u16> {
            self.log.borrow_mut().push("read");
            if !self.enabled.get() {
                return None;
            }
            Some(self.millivolts.get())
        }
    }

    // Raw ADC value equals millivolts.
    const UNITY: BatteryCalibration = BatteryCalibration {
        r1: 0,
        r2: 1,
        adc_reference: 4095,
        adc_max: 4095,
        ..CAL
    };

    fn monitor(
        pin: &FakeChargePin,
        probe: &FakeProbe,
        cal: BatteryCalibration,
    ) -> BatteryMonitor<FakeChargePin, FakeProbe, 4> {
        BatteryMonitor::new(ChargeDetect::new(pin.clone(), true), probe.clone(), cal, 100)
    }

    #[test]
    fn test_charge_level_window_endpoints() {
        assert_eq!(CAL.charge_level(3600, false), 0);
        assert_eq!(CAL.charge_level(3000, false), 0);
        assert_eq!(CAL.charge_level(4000, false), 255);
        assert_eq!(CAL.charge_level(4100, false), 255);
        assert_eq!(CAL.charge_level(3800, false), 127);
    }

    #[test]
    fn test_charge_level_monotonic() {
        let mut last = 0;
        for mv in (3400..4300).step_by(7) {
            let level = CAL.charge_level(mv, false);
            assert!(level >= last);
            last = level;
        }
    }

    #[test]
    fn test_charging_level_capped_below_full() {
        assert_eq!(CAL.charge_level(4000, true), 170);
        assert_eq!(CAL.charge_level(4199, true), 254);
        assert_eq!(CAL.charge_level(4200, true), 255);
    }

    #[test]
    fn test_percent() {
        assert_eq!(charge_level_percent(0), 0);
        assert_eq!(charge_level_percent(127), 49);
        assert_eq!(charge_level_percent(254), 99);
        assert_eq!(charge_level_percent(255), 100);
    }

    #[test]
    fn test_millivolts_from_adc() {
        // Full scale across r2 of a 1000/510 divider at 3.0 V reference.
        assert_eq!(CAL.millivolts_from_adc(4095), 8882);
        // A 4.0 V cell reads about 1845 at 12 bits.
        assert_eq!(CAL.millivolts_from_adc(1845), 4001);
        assert_eq!(CAL.millivolts_from_adc(0), 0);
    }

    #[test]
    fn test_start_rejects_bad_calibration() {
        let pin = FakeChargePin::default();
        let probe = FakeProbe::default();
        let mut bad = UNITY;
        bad.v_max = bad.v_min;
        let mut bms = monitor(&pin, &probe, bad);
        assert_eq!(bms.start(), Err(BatteryError::Calibration));
        assert!(!bms.is_running());
        assert_eq!(bms.sample(), Schedule::Idle);
    }

    #[test]
    fn test_constant_voltage_level() {
        let pin = FakeChargePin::default();
        let probe = FakeProbe::default();
        probe.millivolts.set(3800);
        let mut bms = monitor(&pin, &probe, UNITY);
        bms.start().unwrap();
        for _ in 0..10 {
            assert_eq!(bms.sample(), Schedule::After(100));
        }
        let state = bms.battery_state();
        assert!(!state.charging);
        assert_eq!(bms.average_millivolts(), 3800);
        assert_eq!(state.charge_level, 127);
    }

    #[test]
    fn test_probe_pulsed_on_battery() {
        let pin = FakeChargePin::default();
        let probe = FakeProbe::default();
        probe.millivolts.set(3700);
        let mut bms = monitor(&pin, &probe, UNITY);
        bms.start().unwrap();
        probe.log.borrow_mut().clear();
        bms.sample();
        assert_eq!(*probe.log.borrow(), ["enable", "read", "disable"]);
        assert!(!probe.enabled.get());
    }

    #[test]
    fn test_charge_flip_resets_average_and_holds_probe() {
        let pin = FakeChargePin::default();
        let probe = FakeProbe::default();
        probe.millivolts.set(3700);
        let mut bms = monitor(&pin, &probe, UNITY);
        bms.start().unwrap();

        probe.millivolts.set(4100);
        pin.low.set(true);
        bms.sample();
        assert!(bms.battery_state().charging);
        assert_eq!(bms.average_millivolts(), 4100);
        assert!(probe.enabled.get());

        probe.log.borrow_mut().clear();
        bms.sample();
        assert_eq!(*probe.log.borrow(), ["read"]);
    }

    #[test]
    fn test_unreadable_voltage_clamps_to_zero() {
        struct DeadProbe;
        impl BatteryProbe for DeadProbe {
            fn enable(&mut self) {}
            fn disable(&mut self) {}
            fn read_adc(&mut self) -> Option<u16> {
                None
            }
        }

        let pin = FakeChargePin::default();
        let mut bms: BatteryMonitor<_, _, 4> =
            BatteryMonitor::new(ChargeDetect::new(pin, true), DeadProbe, UNITY, 100);
        bms.start().unwrap();
        bms.sample();
        assert_eq!(bms.battery_state().charge_level, 0);
    }

    #[test]
    fn test_wake_arms_opposite_edge() {
        let pin = FakeChargePin::default();
        let probe = FakeProbe::default();
        probe.millivolts.set(3700);
        let mut bms = monitor(&pin, &probe, UNITY);
        bms.start().unwrap();

        // On battery: wake when ~CHG goes low.
        assert!(bms.wake_on_interrupt());
        assert_eq!(pin.armed.get(), Some(WakeLevel::Low));
        bms.on_wake_up();
        assert_eq!(pin.armed.get(), None);

        pin.low.set(true);
        bms.sample();
        assert!(bms.wake_on_interrupt());
        assert_eq!(pin.armed.get(), Some(WakeLevel::High));
    }

    #[test]
    fn test_wake_refused_when_state_changed() {
        let pin = FakeChargePin::default();
        let probe = FakeProbe::default();
        let mut bms = monitor(&pin, &probe, UNITY);
        bms.start().unwrap();

        pin.low.set(true);
        assert!(!bms.wake_on_interrupt());
        assert_eq!(pin.armed.get(), None);
    }
}
