//! Millisecond time base and task scheduling hints.

/// Milliseconds since boot. Wraps after ~49.7 days.
pub type Millis = u32;

/// Milliseconds elapsed from `since` to `now`, correct across one wraparound.
#[inline]
#[must_use]
pub const fn elapsed(now: Millis, since: Millis) -> u32 {
    now.wrapping_sub(since)
}

/// What a polled task wants next.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Schedule {
    /// Run again on the next scheduler pass.
    Now,
    /// Run again after this many milliseconds.
    After(u32),
    /// Don't run until something re-enables the task.
    Idle,
}

impl Schedule {
    /// Delay in milliseconds, or `None` when idle.
    #[inline]
    #[must_use]
    pub const fn delay(self) -> Option<u32> {
        match self {
            Self::Now => Some(0),
            Self::After(ms) => Some(ms),
            Self::Idle => None,
        }
    }

    /// The sooner of two schedules.
    #[must_use]
    pub fn earliest(self, other: Self) -> Self {
        match (self.delay(), other.delay()) {
            (Some(a), Some(b)) if b < a => other,
            (Some(_), _) => self,
            (None, _) => other,
        }
    }
}
