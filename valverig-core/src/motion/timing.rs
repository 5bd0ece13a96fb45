//! Step pulse timing

/// Nanoseconds in one minute
const NS_PER_MINUTE: u64 = 60_000_000_000;

/// Pulse timing derived from motor speed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepTiming {
    /// Full step period in nanoseconds
    pub period_ns: u32,
}

impl StepTiming {
    /// Timing for `rpm` at `steps_per_revolution`
    ///
    /// Returns `None` if either is zero.
    pub fn from_rpm(steps_per_revolution: u32, rpm: u32) -> Option<Self> {
        let steps_per_minute = steps_per_revolution as u64 * rpm as u64;
        if steps_per_minute == 0 {
            return None;
        }
        let period = (NS_PER_MINUTE / steps_per_minute).clamp(2, u32::MAX as u64);
        Some(Self {
            period_ns: period as u32,
        })
    }

    /// Time the step line is held at each level
    pub fn half_period_ns(&self) -> u32 {
        self.period_ns / 2
    }

    /// Wait between checks while the valve is on target
    pub fn idle_ns(&self) -> u32 {
        self.period_ns.saturating_mul(2)
    }
}
