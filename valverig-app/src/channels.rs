//! Inter-task communication
//!
//! Statics shared by the tasks. The operator console is read on a plain
//! OS thread (stdin blocks); lines cross into the executor through
//! [`CONSOLE_LINES`].

use core::sync::atomic::AtomicBool;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use valverig_core::scheduler::{TaskTracker, TerminateSignal};
use valverig_hal::Line;

use crate::storage::{CsvRowWriter, LogSlot};

/// Channel capacity for console lines
pub const CONSOLE_CHANNEL_SIZE: usize = 4;

/// Console input; `None` marks end of input
pub type ConsoleInput = Option<Line>;

/// Console lines channel type
pub type ConsoleChannel = Channel<CriticalSectionRawMutex, ConsoleInput, CONSOLE_CHANNEL_SIZE>;

/// Lines typed by the operator
pub static CONSOLE_LINES: ConsoleChannel = Channel::new();

/// Raised once the valve is parked; every task winds down
pub static TERMINATE: TerminateSignal = TerminateSignal::new();

/// Tasks that must finish before the log is closed
pub static TASKS: TaskTracker = TaskTracker::new();

/// The session's measurement log
pub static SESSION_LOG: LogSlot<CsvRowWriter> = LogSlot::new();

/// Set when a task stopped on an error; the process exits non-zero
pub static DEGRADED: AtomicBool = AtomicBool::new(false);
