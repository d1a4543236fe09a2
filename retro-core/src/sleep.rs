//! Sleep and wake capabilities shared by the input, battery and board layers.

/// A peripheral that takes part in system sleep.
pub trait Sleepable {
    /// Arm this peripheral's wake condition before system sleep.
    ///
    /// Returns `false` when sleeping is not possible right now (no wake
    /// source, or the wake condition is already met). The caller must then
    /// skip low power; [`on_wake_up`](Self::on_wake_up) is called either way.
    fn wake_on_interrupt(&mut self) -> bool;

    /// Disarm the wake condition and restore normal operation.
    fn on_wake_up(&mut self);
}

/// Pin level that should wake the system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum WakeLevel {
    High,
    Low,
}

/// A single wake-capable line (GPIO sense, external interrupt).
pub trait WakeSource {
    /// Arm wake on `level`. Returns `false` if the line can't wake the system.
    fn arm(&mut self, level: WakeLevel) -> bool;

    /// Disarm the wake condition.
    fn disarm(&mut self);
}

/// Board-level low-power entry.
pub trait LowPower {
    /// Enter the deepest sleep the board supports.
    ///
    /// Returns once the system has woken up. Boards whose sleep ends in a
    /// reset never return.
    fn enter_low_power(&mut self);
}
