//! Process-wide cooperative shutdown flag

use portable_atomic::{AtomicBool, Ordering};

/// Shared terminate signal
///
/// Raised once by the quit sequence. Every task loop checks it once per
/// iteration and returns when it is set. It is never lowered.
#[derive(Debug, Default)]
pub struct TerminateSignal {
    raised: AtomicBool,
}

impl TerminateSignal {
    /// New, not raised
    pub const fn new() -> Self {
        Self {
            raised: AtomicBool::new(false),
        }
    }

    /// Ask every task to stop
    pub fn raise(&self) {
        self.raised.store(true, Ordering::Release);
    }

    /// Whether shutdown has been requested
    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raise_is_sticky() {
        let signal = TerminateSignal::new();
        assert!(!signal.is_raised());
        signal.raise();
        signal.raise();
        assert!(signal.is_raised());
    }
}
