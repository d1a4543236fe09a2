//! Input source trait and error types.

use crate::sleep::Sleepable;
use crate::types::PadState;

/// Error type for input operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InputError {
    /// Pin or bus read failed.
    Io,
    /// Malformed host report.
    Parse,
    /// Controller unplugged or link lost.
    Disconnected,
}

/// Polled controller input.
///
/// Implementations are synchronous and bounded-time: a read samples the
/// hardware (or the last received host report) and returns immediately.
/// Every input source takes part in system sleep.
pub trait InputSource: Sleepable {
    /// Refresh the state snapshot.
    fn read(&mut self) -> Result<(), InputError>;

    /// Last snapshot taken by [`read`](Self::read).
    fn state(&self) -> &PadState;

    /// Controller present.
    fn is_connected(&self) -> bool {
        self.state().connected
    }
}
