//! Batching of byte-progress updates.

use std::time::{Duration, Instant};

/// Accumulates byte counts and releases them at most once per interval.
///
/// Streaming a large file yields thousands of small chunks; redrawing the
/// bar for each one is wasted work.
pub struct ProgressThrottle {
    last_emit: Option<Instant>,
    min_interval: Duration,
    pending: u64,
}

impl ProgressThrottle {
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            last_emit: None,
            min_interval,
            pending: 0,
        }
    }

    /// Add `bytes`; returns the batch to report when the interval elapsed.
    pub fn record(&mut self, bytes: u64) -> Option<u64> {
        self.pending += bytes;
        let now = Instant::now();
        match self.last_emit {
            Some(last) if now.duration_since(last) < self.min_interval => None,
            _ => {
                self.last_emit = Some(now);
                Some(std::mem::take(&mut self.pending))
            }
        }
    }

    /// Whatever has not been reported yet.
    pub const fn flush(&mut self) -> u64 {
        let pending = self.pending;
        self.pending = 0;
        pending
    }
}

impl Default for ProgressThrottle {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}
