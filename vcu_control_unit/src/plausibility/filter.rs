//! Fixed-window moving average over raw ADC codes.
//!
//! The window is seeded from the first live sample (never from zero) and
//! can be restarted from a new live sample, but never reset to empty.

use heapless::HistoryBuffer;

#[derive(Debug, Clone)]
pub struct MovingAverage<const N: usize> {
    window: HistoryBuffer<u16, N>,
}

impl<const N: usize> MovingAverage<N> {
    pub const fn new() -> Self {
        Self {
            window: HistoryBuffer::new(),
        }
    }

    /// Add a sample and return the new average.
    pub fn push(&mut self, raw: u16) -> u16 {
        if self.window.len() == 0 {
            self.window.clear_with(raw);
        } else {
            self.window.write(raw);
        }
        self.average()
    }

    /// Refill the whole window with `live`.
    pub fn restart(&mut self, live: u16) {
        self.window.clear_with(live);
    }

    /// Average of the window, 0 before the first sample.
    pub fn average(&self) -> u16 {
        let samples = self.window.as_slice();
        if samples.is_empty() {
            return 0;
        }
        let sum: u32 = samples.iter().map(|&s| u32::from(s)).sum();
        (sum / samples.len() as u32) as u16
    }

    pub fn is_seeded(&self) -> bool {
        self.window.len() > 0
    }
}

impl<const N: usize> Default for MovingAverage<N> {
    fn default() -> Self {
        Self::new()
    }
}
