//! Safety monitoring
//!
//! Detects a stalled sensor so the acquisition loop can escalate instead
//! of waiting forever.

pub mod watchdog;

pub use watchdog::{ReadyWatchdog, WatchdogStatus};
