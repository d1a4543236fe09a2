//! Fixed-size rolling average over `u16` samples.

/// Ring buffer of the last `N` samples.
///
/// There is no warm-up phase: after [`clear`](Self::clear) every slot holds
/// the reset value, so the average moves gradually as samples arrive.
#[derive(Clone, Debug)]
pub struct RollingAverage<const N: usize> {
    history: [u16; N],
    cursor: usize,
}

impl<const N: usize> RollingAverage<N> {
    const NON_EMPTY: () = assert!(N >= 1, "RollingAverage needs at least one slot");

    /// Create a buffer filled with `reset_value`.
    #[must_use]
    pub const fn new(reset_value: u16) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::NON_EMPTY;
        Self {
            history: [reset_value; N],
            cursor: 0,
        }
    }

    /// Fill every slot with `reset_value` and rewind the cursor.
    pub fn clear(&mut self, reset_value: u16) {
        self.history = [reset_value; N];
        self.cursor = 0;
    }

    /// Overwrite the oldest slot with `value`.
    pub fn step(&mut self, value: u16) {
        self.history[self.cursor] = value;
        self.cursor = (self.cursor + 1) % N;
    }

    /// Truncated mean of all slots.
    #[must_use]
    pub fn average(&self) -> u16 {
        let sum: u32 = self.history.iter().map(|&v| u32::from(v)).sum();
        (sum / N as u32) as u16
    }
}

impl<const N: usize> Default for RollingAverage<N> {
    fn default() -> Self {
        Self::new(0)
    }
}
