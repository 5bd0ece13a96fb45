//! Valve motor task
//!
//! The only task that drives the step, direction and enable lines. Follows
//! the shared target in positioning mode and runs calibration jogs handed
//! over by the console.

use embassy_time::Delay;
use log::info;

use valverig_core::motion::ValveState;
use valverig_core::scheduler::TaskId;

use crate::boards::Valve;
use crate::channels::{TASKS, TERMINATE};

/// Motion loop until terminate; the drive is left disabled
#[embassy_executor::task]
pub async fn stepper_task(mut valve: Valve, state: &'static ValveState) {
    info!(
        "Valve task started (max position {} steps, {} rpm)",
        state.max_position(),
        state.rpm()
    );

    let mut delay = Delay;
    let steps = valve.run(state, &TERMINATE, &mut delay).await;

    info!("Valve task stopped after {} positioning steps", steps);
    TASKS.finished(TaskId::Motor);
}
