//! Data-ready watchdog
//!
//! Tracks how long an acquisition loop has been waiting for its sensor to
//! report fresh data. With no timeout configured it only keeps statistics
//! and the loop waits indefinitely.

/// Result of accounting for one poll interval
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogStatus {
    /// Still within the allowed wait
    Waiting,
    /// The sensor has not been ready for longer than the timeout
    Expired { waited_us: u64 },
}

/// Watchdog for one sensor's data-ready poll
#[derive(Debug, Clone)]
pub struct ReadyWatchdog {
    /// Allowed wait in microseconds, `None` for unbounded
    timeout_us: Option<u64>,
    /// Wait accumulated since the last sample
    waited_us: u64,
    /// Longest wait seen this session
    longest_us: u64,
}

impl ReadyWatchdog {
    /// Create a watchdog
    ///
    /// # Arguments
    /// - `timeout_ms`: Maximum wait for data-ready, or None to wait forever
    pub fn new(timeout_ms: Option<u32>) -> Self {
        Self {
            timeout_us: timeout_ms.map(|ms| ms as u64 * 1000),
            waited_us: 0,
            longest_us: 0,
        }
    }

    /// Account for a poll interval spent waiting
    pub fn record_wait(&mut self, delta_us: u32) -> WatchdogStatus {
        self.waited_us = self.waited_us.saturating_add(delta_us as u64);
        self.longest_us = self.longest_us.max(self.waited_us);

        match self.timeout_us {
            Some(timeout) if self.waited_us > timeout => WatchdogStatus::Expired {
                waited_us: self.waited_us,
            },
            _ => WatchdogStatus::Waiting,
        }
    }

    /// A sample arrived
    pub fn feed(&mut self) {
        self.waited_us = 0;
    }

    /// Current wait in microseconds
    pub fn waited_us(&self) -> u64 {
        self.waited_us
    }

    /// Longest wait seen so far, in microseconds
    pub fn longest_wait_us(&self) -> u64 {
        self.longest_us
    }

    /// Whether a timeout is armed
    pub fn is_bounded(&self) -> bool {
        self.timeout_us.is_some()
    }
}

impl Default for ReadyWatchdog {
    fn default() -> Self {
        Self::new(None)
    }
}
