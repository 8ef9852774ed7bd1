//! Bounded FIFO buffer for recent load samples.

use std::collections::VecDeque;

/// Maximum number of retained samples.
pub const SAMPLE_HISTORY_SIZE: usize = 10;

pub(crate) struct CpuLoadHistory {
    samples: VecDeque<f64>,
    cap: usize,
}

impl CpuLoadHistory {
    pub(crate) fn new(cap: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(cap),
            cap,
        }
    }

    // Evicts the oldest sample once at capacity
    pub(crate) fn push(&mut self, v: f64) {
        if self.samples.len() == self.cap {
            self.samples.pop_front();
        }
        self.samples.push_back(v);
    }

    /// Owned copy, oldest first.
    pub(crate) fn snapshot(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }
}
