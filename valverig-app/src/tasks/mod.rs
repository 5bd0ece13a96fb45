//! Embassy async tasks
//!
//! Each task runs independently and communicates through the statics in
//! [`crate::channels`].

pub mod acquisition;
pub mod controller;
pub mod stepper;
pub mod supervisor;

pub use acquisition::acquisition_task;
pub use controller::controller_task;
pub use stepper::stepper_task;
pub use supervisor::supervisor_task;
