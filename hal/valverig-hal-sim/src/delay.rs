//! Virtual-time delay

use embassy_futures::yield_now;
use embedded_hal_async::delay::DelayNs;

/// Delay that records requested time and yields once instead of sleeping
///
/// Loops under test still hit a suspension point on every wait, so
/// `join`ed futures interleave the way they would on the executor.
#[derive(Debug, Clone, Default)]
pub struct SimDelay {
    elapsed_ns: u64,
    waits: u64,
}

impl SimDelay {
    /// Fresh delay at time zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Total virtual time waited
    pub fn elapsed_ns(&self) -> u64 {
        self.elapsed_ns
    }

    /// Total virtual time waited, in whole milliseconds
    pub fn elapsed_ms(&self) -> u64 {
        self.elapsed_ns / 1_000_000
    }

    /// Number of waits
    pub fn waits(&self) -> u64 {
        self.waits
    }
}

impl DelayNs for SimDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.elapsed_ns += ns as u64;
        self.waits += 1;
        yield_now().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    #[test]
    fn test_records_time() {
        let mut delay = SimDelay::new();
        block_on(async {
            delay.delay_ms(50).await;
            delay.delay_us(250).await;
        });
        assert_eq!(delay.elapsed_ns(), 50_250_000);
        assert_eq!(delay.elapsed_ms(), 50);
        assert_eq!(delay.waits(), 2);
    }
}
