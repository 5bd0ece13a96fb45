//! Task identities and completion tracking
//!
//! The supervisor may only finalise the log once every producer has seen
//! the terminate signal and returned. Each task marks itself finished on
//! exit; the supervisor waits for the full set.

use core::fmt;

use portable_atomic::{AtomicU8, Ordering};

use crate::datalog::DeviceId;

/// A cooperatively scheduled task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskId {
    /// Valve motion cycle
    Motor,
    /// Sample loop for one sensor
    Acquisition(DeviceId),
    /// Operator command reader
    Console,
}

impl TaskId {
    fn bit(self) -> u8 {
        match self {
            TaskId::Motor => 1 << 0,
            TaskId::Console => 1 << 1,
            TaskId::Acquisition(device) => 1 << (2 + device.index()),
        }
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskId::Motor => write!(f, "motor"),
            TaskId::Console => write!(f, "console"),
            TaskId::Acquisition(device) => write!(f, "acquisition[{}]", device.index()),
        }
    }
}

/// Set of tasks that were started and have not yet finished
#[derive(Debug, Default)]
pub struct TaskTracker {
    running: AtomicU8,
}

impl TaskTracker {
    /// Empty tracker
    pub const fn new() -> Self {
        Self {
            running: AtomicU8::new(0),
        }
    }

    /// Record that a task was spawned
    pub fn started(&self, task: TaskId) {
        self.running.fetch_or(task.bit(), Ordering::AcqRel);
    }

    /// Record that a task returned
    pub fn finished(&self, task: TaskId) {
        self.running.fetch_and(!task.bit(), Ordering::AcqRel);
    }

    /// Whether `task` is still running
    pub fn is_running(&self, task: TaskId) -> bool {
        self.running.load(Ordering::Acquire) & task.bit() != 0
    }

    /// Number of tasks still running
    pub fn running_count(&self) -> u32 {
        self.running.load(Ordering::Acquire).count_ones()
    }

    /// True once every started task has finished
    pub fn all_finished(&self) -> bool {
        self.running.load(Ordering::Acquire) == 0
    }
}
