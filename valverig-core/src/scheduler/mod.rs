//! Cooperative task coordination
//!
//! Tasks share nothing but atomics: the terminate flag, the valve state
//! and the completion set. None of them ever blocks another.

pub mod tasks;
pub mod terminate;

pub use tasks::{TaskId, TaskTracker};
pub use terminate::TerminateSignal;
