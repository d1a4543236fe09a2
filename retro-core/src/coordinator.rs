//! USB/BLE connection and power state machine.
//!
//! The [`Coordinator`] decides which transport receives HID reports, when
//! to advertise, and when the whole device may go to sleep. It owns its
//! collaborators and only talks to hardware through their traits.
//!
//! ```text
//! Booting ──► Waking ──usb──► UsbConnected ──unplug──► Sleep
//!               │                                        ▲ │
//!               └──────► BleAdvertise ──timeout──────────┘ │
//!                            │                           ▲ │
//!                            └──► BleConnected ──idle────┘ │
//!                                      │                 ▲ │
//!                                      └──► PowerDown ───┘ │
//!               ▲                                          │
//!               └──────────────────────────────────────────┘
//! ```
//!
//! USB takes precedence: from any awake state, a USB connection moves to
//! `UsbConnected` on the next tick.

use crate::battery::{BatteryError, BatteryManager, BatteryState};
use crate::config;
use crate::hid::{HidDevice, Target};
use crate::indicator::{Indicator, IndicatorMode};
use crate::sleep::LowPower;
use crate::time::{elapsed, Millis, Schedule};
use crate::transport::{BleTransport, UsbTransport};

/// Coordinator state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CoordinatorState {
    Booting,
    Waking,
    BleAdvertise,
    BleConnected,
    UsbConnected,
    PowerDown,
    Sleep,
}

/// Coordinator timeouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CoordinatorConfig {
    /// Re-evaluation period in steady states.
    pub battery_update_period_ms: u32,
    pub advertise_timeout_ms: u32,
    pub connected_timeout_ms: u32,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            battery_update_period_ms: config::BATTERY_UPDATE_PERIOD_MILLIS,
            advertise_timeout_ms: config::ADVERTISE_NO_ACTIVITY_TIMEOUT_MILLIS,
            connected_timeout_ms: config::CONNECTED_NO_ACTIVITY_TIMEOUT_MILLIS,
        }
    }
}

/// Error type for coordinator start-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StartError {
    /// Battery monitor rejected its configuration.
    Battery(BatteryError),
}

impl From<BatteryError> for StartError {
    fn from(err: BatteryError) -> Self {
        StartError::Battery(err)
    }
}

/// Connection and power state machine.
///
/// - `U`: USB transport
/// - `B`: BLE transport
/// - `L`: status indicator
/// - `H`: HID device
/// - `M`: battery manager
/// - `P`: board low-power control
pub struct Coordinator<U, B, L, H, M, P> {
    usb: U,
    ble: B,
    indicator: L,
    hid: H,
    bms: M,
    power: P,
    config: CoordinatorConfig,
    state: CoordinatorState,
    target: Target,
    battery: BatteryState,
    ble_start: Millis,
    running: bool,
    hid_request: bool,
}

impl<U, B, L, H, M, P> Coordinator<U, B, L, H, M, P>
where
    U: UsbTransport,
    B: BleTransport,
    L: Indicator,
    H: HidDevice,
    M: BatteryManager,
    P: LowPower,
{
    pub fn new(
        usb: U,
        ble: B,
        indicator: L,
        hid: H,
        bms: M,
        power: P,
        config: CoordinatorConfig,
    ) -> Self {
        Self {
            usb,
            ble,
            indicator,
            hid,
            bms,
            power,
            config,
            state: CoordinatorState::Booting,
            target: Target::None,
            battery: BatteryState::default(),
            ble_start: 0,
            running: false,
            hid_request: false,
        }
    }

    /// Start the battery monitor and arm the state machine from `Booting`.
    ///
    /// On error the coordinator stays stopped and [`tick`](Self::tick)
    /// returns [`Schedule::Idle`].
    pub fn start(&mut self) -> Result<(), StartError> {
        self.bms.start()?;
        self.state = CoordinatorState::Booting;
        self.running = true;
        info!("Coordinator: started");
        Ok(())
    }

    /// Stop everything and release the transports.
    pub fn stop(&mut self) {
        self.ble.stop();
        self.bms.stop();
        self.set_target(Target::None);
        self.indicator
            .set_draw_mode(IndicatorMode::Off, self.battery.charging);
        self.running = false;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn state(&self) -> CoordinatorState {
        self.state
    }

    #[must_use]
    pub fn target(&self) -> Target {
        self.target
    }

    /// Battery state as of the last refresh.
    #[must_use]
    pub fn battery_state(&self) -> BatteryState {
        self.battery
    }

    /// True once after every target change; the HID task should run now.
    pub fn take_hid_request(&mut self) -> bool {
        core::mem::take(&mut self.hid_request)
    }

    /// Run one HID dispatch against the current target.
    pub fn poll_hid(&mut self, now: Millis) -> Schedule {
        self.hid.poll(now, self.target, &mut self.usb, &mut self.ble)
    }

    /// Take one battery sample.
    pub fn poll_battery(&mut self) -> Schedule {
        self.bms.sample()
    }

    fn set_target(&mut self, target: Target) {
        if self.target != target {
            debug!("Coordinator: target {:?} -> {:?}", self.target, target);
            self.target = target;
            self.hid_request = true;
        }
    }

    fn transition(&mut self, next: CoordinatorState) {
        if self.state != next {
            info!("Coordinator: {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn refresh_battery(&mut self) {
        self.battery = self.bms.battery_state();
    }

    fn draw(&mut self, mode: IndicatorMode) {
        self.indicator.set_draw_mode(mode, self.battery.charging);
    }

    fn to_usb(&mut self) -> Schedule {
        self.set_target(Target::Usb);
        self.ble.stop();
        self.transition(CoordinatorState::UsbConnected);
        Schedule::Now
    }

    fn to_sleep(&mut self) -> Schedule {
        self.transition(CoordinatorState::Sleep);
        Schedule::Now
    }

    /// Evaluate the state machine once. Returns when to evaluate again.
    pub fn tick(&mut self, now: Millis) -> Schedule {
        if !self.running {
            return Schedule::Idle;
        }

        let period = self.config.battery_update_period_ms;

        match self.state {
            CoordinatorState::Booting => {
                self.battery.charging = false;
                self.draw(IndicatorMode::Off);
                self.transition(CoordinatorState::Waking);
                Schedule::Now
            }
            CoordinatorState::Waking => {
                self.refresh_battery();
                self.draw(IndicatorMode::Off);
                if self.usb.is_connected() {
                    self.to_usb()
                } else {
                    self.set_target(Target::None);
                    self.ble.start();
                    self.ble_start = now;
                    self.transition(CoordinatorState::BleAdvertise);
                    Schedule::Now
                }
            }
            CoordinatorState::BleAdvertise => {
                if self.usb.is_connected() {
                    self.to_usb()
                } else if self.ble.is_connected() {
                    self.draw(IndicatorMode::Ble);
                    self.set_target(Target::Ble);
                    self.ble_start = now;
                    self.transition(CoordinatorState::BleConnected);
                    Schedule::Now
                } else if self.ble.is_advertising()
                    && elapsed(now, self.ble_start) < self.config.advertise_timeout_ms
                {
                    self.refresh_battery();
                    self.draw(IndicatorMode::Searching);
                    Schedule::After(period)
                } else {
                    info!("Coordinator: advertising timed out");
                    self.to_sleep()
                }
            }
            CoordinatorState::BleConnected => {
                if self.usb.is_connected() {
                    self.to_usb()
                } else if !self.ble.is_connected() {
                    self.set_target(Target::None);
                    self.to_sleep()
                } else if self.hid.is_power_down_requested(now) {
                    self.ble.stop();
                    self.draw(IndicatorMode::Off);
                    self.set_target(Target::None);
                    self.transition(CoordinatorState::PowerDown);
                    Schedule::Now
                } else if self.is_connection_idle(now) {
                    info!("Coordinator: no activity, going to sleep");
                    self.to_sleep()
                } else {
                    self.refresh_battery();
                    self.draw(IndicatorMode::Ble);
                    self.ble.notify_battery(self.battery.percent());
                    Schedule::After(period)
                }
            }
            CoordinatorState::UsbConnected => {
                if self.usb.is_connected() {
                    self.refresh_battery();
                    self.draw(IndicatorMode::Usb);
                    Schedule::After(period)
                } else {
                    self.set_target(Target::None);
                    self.to_sleep()
                }
            }
            CoordinatorState::PowerDown => {
                if self.usb.is_connected() {
                    self.to_usb()
                } else if !self.hid.is_power_down_requested(now) {
                    self.to_sleep()
                } else {
                    Schedule::After(period)
                }
            }
            CoordinatorState::Sleep => {
                self.enter_sleep();
                self.transition(CoordinatorState::Waking);
                Schedule::Now
            }
        }
    }

    /// Connected long enough, no input for the timeout, nothing held.
    fn is_connection_idle(&self, now: Millis) -> bool {
        let timeout = self.config.connected_timeout_ms;
        elapsed(now, self.ble_start) > timeout
            && self.hid.elapsed_since_activity(now) >= timeout
            && !self.hid.is_input_held()
    }

    fn enter_sleep(&mut self) {
        self.ble.stop();

        // Last battery update before sleep.
        self.bms.sample();
        self.refresh_battery();

        self.set_target(Target::None);
        self.draw(IndicatorMode::Off);

        if self.hid.wake_on_interrupt() && self.bms.wake_on_interrupt() {
            info!("Coordinator: entering low power");
            self.power.enter_low_power();
            info!("Coordinator: woke up");
        } else {
            warn!("Coordinator: sleep not possible, restarting");
        }

        // Just woke up, or never slept.
        self.hid.on_wake_up();
        self.bms.on_wake_up();
    }

    pub fn usb(&self) -> &U {
        &self.usb
    }

    pub fn usb_mut(&mut self) -> &mut U {
        &mut self.usb
    }

    pub fn ble(&self) -> &B {
        &self.ble
    }

    pub fn ble_mut(&mut self) -> &mut B {
        &mut self.ble
    }

    pub fn indicator(&self) -> &L {
        &self.indicator
    }

    pub fn indicator_mut(&mut self) -> &mut L {
        &mut self.indicator
    }

    pub fn hid(&self) -> &H {
        &self.hid
    }

    pub fn hid_mut(&mut self) -> &mut H {
        &mut self.hid
    }

    pub fn bms(&self) -> &M {
        &self.bms
    }

    pub fn bms_mut(&mut self) -> &mut M {
        &mut self.bms
    }

    pub fn power_mut(&mut self) -> &mut P {
        &mut self.power
    }
}
