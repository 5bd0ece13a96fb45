//! Operator console task
//!
//! Reads command lines, hands them to the [`Controller`] and prints the
//! outcome. End of input is treated as a request to park and quit.

use embassy_time::Delay;
use log::info;

use valverig_core::motion::ValveState;
use valverig_core::operator::USAGE;
use valverig_core::scheduler::TaskId;
use valverig_hal::LineSource;

use crate::channels::{TASKS, TERMINATE};
use crate::console::ChannelLineSource;
use crate::controller::Controller;

/// Console loop until the valve is parked
#[embassy_executor::task]
pub async fn controller_task(mut source: ChannelLineSource, valve: &'static ValveState) {
    info!("Console task started");

    let controller = Controller::new(valve, &TERMINATE);
    let mut delay = Delay;
    println!("{}", USAGE);

    loop {
        let (reply, closed) = match source.read_line().await {
            Ok(Some(line)) => (controller.handle_line(&line, &mut delay).await, false),
            Ok(None) => {
                info!("Console input closed, parking valve");
                (controller.shutdown(&mut delay).await, true)
            }
            Err(e) => match e {},
        };

        println!("{}", reply);
        if reply.is_final() || closed || TERMINATE.is_raised() {
            break;
        }
    }

    TASKS.finished(TaskId::Console);
}
