//! Cooperative scheduler for the coordinator and its periodic tasks.

use crate::battery::BatteryManager;
use crate::coordinator::{Coordinator, StartError};
use crate::hid::HidDevice;
use crate::indicator::Indicator;
use crate::sleep::LowPower;
use crate::time::{Millis, Schedule};
use crate::transport::{BleTransport, UsbTransport};

/// Due time of one polled task.
#[derive(Clone, Copy, Default, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskTimer {
    due: Option<Millis>,
}

impl TaskTimer {
    /// Make the task due immediately.
    pub fn start(&mut self, now: Millis) {
        self.due = Some(now);
    }

    /// Apply what the task asked for after running at `now`.
    pub fn schedule(&mut self, now: Millis, next: Schedule) {
        self.due = next.delay().map(|ms| now.wrapping_add(ms));
    }

    #[must_use]
    pub fn is_due(&self, now: Millis) -> bool {
        self.due
            .is_some_and(|due| now.wrapping_sub(due) as i32 >= 0)
    }

    /// Milliseconds until due, `Some(0)` if overdue, `None` if idle.
    #[must_use]
    pub fn remaining(&self, now: Millis) -> Option<u32> {
        self.due
            .map(|due| (due.wrapping_sub(now) as i32).max(0) as u32)
    }
}

fn sooner(a: Option<u32>, b: Option<u32>) -> Option<u32> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// The whole device: a [`Coordinator`] plus the timers of the tasks it
/// drives (battery sampler, state machine, HID dispatch, indicator).
///
/// Call [`poll`](Self::poll) from the main loop with the current time, then
/// wait for the returned delay or for a transport event, whichever comes
/// first.
pub struct RetroDevice<U, B, L, H, M, P> {
    coordinator: Coordinator<U, B, L, H, M, P>,
    battery_task: TaskTimer,
    coordinator_task: TaskTimer,
    hid_task: TaskTimer,
    indicator_task: TaskTimer,
}

impl<U, B, L, H, M, P> RetroDevice<U, B, L, H, M, P>
where
    U: UsbTransport,
    B: BleTransport,
    L: Indicator,
    H: HidDevice,
    M: BatteryManager,
    P: LowPower,
{
    pub fn new(coordinator: Coordinator<U, B, L, H, M, P>) -> Self {
        Self {
            coordinator,
            battery_task: TaskTimer::default(),
            coordinator_task: TaskTimer::default(),
            hid_task: TaskTimer::default(),
            indicator_task: TaskTimer::default(),
        }
    }

    /// Start the coordinator and make every task due.
    pub fn start(&mut self, now: Millis) -> Result<(), StartError> {
        self.coordinator.start()?;
        self.battery_task.start(now);
        self.coordinator_task.start(now);
        self.hid_task.start(now);
        self.indicator_task.start(now);
        Ok(())
    }

    /// A transport connected or disconnected: re-evaluate right away.
    pub fn on_transport_event(&mut self, now: Millis) {
        self.coordinator_task.start(now);
    }

    /// Run every due task once. Returns the delay until the next one, or
    /// `None` when all tasks are idle.
    pub fn poll(&mut self, now: Millis) -> Option<u32> {
        if self.battery_task.is_due(now) {
            let next = self.coordinator.poll_battery();
            self.battery_task.schedule(now, next);
        }

        if self.coordinator_task.is_due(now) {
            let next = self.coordinator.tick(now);
            self.coordinator_task.schedule(now, next);
            // The tick may have changed the draw mode.
            self.indicator_task.start(now);
        }

        if self.coordinator.take_hid_request() {
            self.hid_task.start(now);
        }

        if self.hid_task.is_due(now) {
            let next = self.coordinator.poll_hid(now);
            self.hid_task.schedule(now, next);
        }

        if self.indicator_task.is_due(now) {
            let next = self.coordinator.indicator_mut().animate(now);
            self.indicator_task.schedule(now, next);
        }

        [
            &self.battery_task,
            &self.coordinator_task,
            &self.hid_task,
            &self.indicator_task,
        ]
        .iter()
        .fold(None, |acc, task| sooner(acc, task.remaining(now)))
    }

    pub fn coordinator(&self) -> &Coordinator<U, B, L, H, M, P> {
        &self.coordinator
    }

    pub fn coordinator_mut(&mut self) -> &mut Coordinator<U, B, L, H, M, P> {
        &mut self.coordinator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::tests::coordinator;
    use crate::coordinator::CoordinatorState;

    #[test]
    fn test_task_timer() {
        let mut timer = TaskTimer::default();
        assert!(!timer.is_due(0));
        assert_eq!(timer.remaining(0), None);

        timer.schedule(100, Schedule::After(50));
        assert!(!timer.is_due(149));
        assert!(timer.is_due(150));
        assert_eq!(timer.remaining(120), Some(30));
        assert_eq!(timer.remaining(200), Some(0));

        timer.schedule(u32::MAX - 10, Schedule::After(20));
        assert!(!timer.is_due(u32::MAX));
        assert!(timer.is_due(9));

        timer.schedule(0, Schedule::Idle);
        assert!(!timer.is_due(1000));
    }

    #[test]
    fn test_poll_runs_boot_sequence() {
        let mut device = RetroDevice::new(coordinator());
        device.start(0).unwrap();

        // Booting -> Waking, coordinator asks to run again now.
        assert_eq!(device.poll(0), Some(0));
        assert_eq!(device.coordinator().state(), CoordinatorState::Waking);
        assert_eq!(device.coordinator().bms().samples, 1);
        assert_eq!(device.coordinator().hid().polls, 1);
        assert!(device.coordinator().indicator().frames >= 1);

        device.poll(0);
        assert_eq!(device.coordinator().state(), CoordinatorState::BleAdvertise);

        // Steady advertising: next work is the battery sampler at 100 ms.
        let next = device.poll(1);
        assert_eq!(device.coordinator().state(), CoordinatorState::BleAdvertise);
        assert_eq!(next, Some(14));
    }

    #[test]
    fn test_transport_event_forces_tick() {
        let mut device = RetroDevice::new(coordinator());
        device.start(0).unwrap();
        device.poll(0);
        device.poll(0);
        device.poll(1);
        assert_eq!(device.coordinator().state(), CoordinatorState::BleAdvertise);

        device.coordinator_mut().ble_mut().connected = true;
        device.on_transport_event(10);
        device.poll(10);
        assert_eq!(device.coordinator().state(), CoordinatorState::BleConnected);
        // Target change pulled the HID task forward from 15 ms.
        assert_eq!(device.coordinator().hid().polls, 2);
        assert_eq!(device.coordinator().hid().last_target, crate::hid::Target::Ble);
    }

    #[test]
    fn test_start_error_leaves_tasks_idle() {
        let mut c = coordinator();
        c.bms_mut().fail_start = true;
        let mut device = RetroDevice::new(c);
        assert!(device.start(0).is_err());
        assert_eq!(device.poll(0), None);
    }
}
