//! Sensor acquisition task
//!
//! One instance per configured sensor. Samples go to the shared session
//! log; the first one fixes the sensor's time offset.

use core::sync::atomic::Ordering;

use embassy_time::Delay;
use log::{error, info};

use valverig_core::config::AcquisitionConfig;
use valverig_core::motion::ValveState;
use valverig_core::scheduler::TaskId;
use valverig_drivers::sensor::acquire;

use crate::boards::Sensor;
use crate::channels::{DEGRADED, SESSION_LOG, TASKS, TERMINATE};
use crate::storage::SharedLog;

/// Sample loop for one sensor
///
/// With `valve` set, every row also carries the valve position.
#[embassy_executor::task(pool_size = 2)]
pub async fn acquisition_task(
    mut sensor: Sensor,
    config: AcquisitionConfig,
    valve: Option<&'static ValveState>,
) {
    let device = sensor.id();
    info!("Acquisition task {} started", device);

    let mut sink = match valve {
        Some(valve) => SharedLog::with_valve(&SESSION_LOG, valve),
        None => SharedLog::new(&SESSION_LOG),
    };
    let mut delay = Delay;

    match acquire(&mut sensor, &mut delay, &mut sink, &TERMINATE, &config).await {
        Ok(stats) => info!(
            "Sensor {}: {} samples, {} idle polls, longest data-ready wait {} µs",
            device, stats.samples, stats.idle_polls, stats.longest_wait_us
        ),
        Err(e) => {
            error!("Sensor {}: acquisition stopped: {}", device, e);
            DEGRADED.store(true, Ordering::Relaxed);
        }
    }

    TASKS.finished(TaskId::Acquisition(device));
}
