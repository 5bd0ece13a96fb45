//! Simulated GPIO
//!
//! Provides recording output lines and a line allocator that catches two
//! functions configured onto the same pin.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use thiserror::Error;
use valverig_hal::OutputPin;

/// Line already claimed by another function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("GPIO line {0} is already in use")]
pub struct PinConflict(pub u8);

/// GPIO allocator to track line usage
pub struct PinAllocator {
    /// Bitmask of allocated lines (up to 64)
    allocated: u64,
}

impl Default for PinAllocator {
    fn default() -> Self {
        Self::new()
    }
}

impl PinAllocator {
    /// Create a new allocator
    pub fn new() -> Self {
        Self { allocated: 0 }
    }

    /// Claim a line
    pub fn allocate(&mut self, line: u8) -> Result<(), PinConflict> {
        if line >= 64 {
            return Err(PinConflict(line));
        }
        let mask = 1 << line;
        if self.allocated & mask != 0 {
            return Err(PinConflict(line));
        }
        self.allocated |= mask;
        Ok(())
    }

    /// Release a line
    pub fn release(&mut self, line: u8) {
        if line < 64 {
            self.allocated &= !(1 << line);
        }
    }

    /// Check if a line is allocated
    pub fn is_allocated(&self, line: u8) -> bool {
        line < 64 && self.allocated & (1 << line) != 0
    }
}

#[derive(Debug, Default)]
struct LineState {
    high: AtomicBool,
    rising: AtomicU32,
    falling: AtomicU32,
}

/// Output line that counts edges
///
/// Clones observe the same line, so a test can keep one while the driver
/// owns the other.
#[derive(Debug, Clone)]
pub struct SimPin {
    name: &'static str,
    line: u8,
    state: Arc<LineState>,
}

impl SimPin {
    /// New line, initially low
    pub fn new(name: &'static str, line: u8) -> Self {
        Self {
            name,
            line,
            state: Arc::new(LineState::default()),
        }
    }

    /// GPIO line number
    pub fn line(&self) -> u8 {
        self.line
    }

    /// Low-to-high transitions so far
    pub fn rising_edges(&self) -> u32 {
        self.state.rising.load(Ordering::Relaxed)
    }

    /// High-to-low transitions so far
    pub fn falling_edges(&self) -> u32 {
        self.state.falling.load(Ordering::Relaxed)
    }
}

impl OutputPin for SimPin {
    fn set_high(&mut self) {
        if !self.state.high.swap(true, Ordering::Relaxed) {
            self.state.rising.fetch_add(1, Ordering::Relaxed);
            log::trace!("{} (GPIO{}) high", self.name, self.line);
        }
    }

    fn set_low(&mut self) {
        if self.state.high.swap(false, Ordering::Relaxed) {
            self.state.falling.fetch_add(1, Ordering::Relaxed);
            log::trace!("{} (GPIO{}) low", self.name, self.line);
        }
    }

    fn is_set_high(&self) -> bool {
        self.state.high.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocator_rejects_reuse() {
        let mut pins = PinAllocator::new();
        pins.allocate(15).unwrap();
        assert_eq!(pins.allocate(15), Err(PinConflict(15)));
        pins.release(15);
        assert!(!pins.is_allocated(15));
        pins.allocate(15).unwrap();
        assert_eq!(pins.allocate(64), Err(PinConflict(64)));
    }

    #[test]
    fn test_edges_counted_once_per_transition() {
        let mut pin = SimPin::new("step", 15);
        let probe = pin.clone();

        pin.set_high();
        pin.set_high();
        pin.set_low();
        pin.set_low();
        pin.set_state(true);

        assert_eq!(probe.rising_edges(), 2);
        assert_eq!(probe.falling_edges(), 1);
        assert!(probe.is_set_high());
    }
}
