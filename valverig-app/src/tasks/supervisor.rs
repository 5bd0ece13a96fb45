//! Session supervisor
//!
//! Waits for the terminate signal and for every producer to return, then
//! closes the measurement log and ends the process.

use core::sync::atomic::Ordering;
use std::path::PathBuf;

use embassy_time::Timer;
use log::{error, info, warn};

use crate::channels::{DEGRADED, SESSION_LOG, TASKS, TERMINATE};
use crate::error::AppError;

/// Poll period while tasks are still running
const SUPERVISOR_POLL_MS: u64 = 50;

#[embassy_executor::task]
pub async fn supervisor_task(log_path: PathBuf) {
    while !TERMINATE.is_raised() {
        Timer::after_millis(SUPERVISOR_POLL_MS).await;
    }
    info!(
        "Terminate raised after {} rows, waiting for {} task(s)",
        SESSION_LOG.rows_written(),
        TASKS.running_count()
    );

    while !TASKS.all_finished() {
        Timer::after_millis(SUPERVISOR_POLL_MS).await;
    }
    info!("All tasks finished");

    let code = match close_log() {
        Ok(rows) => {
            println!("Measurement log: {} ({} rows)", log_path.display(), rows);
            if DEGRADED.load(Ordering::Relaxed) {
                warn!("Session ended with a sensor failure");
                1
            } else {
                0
            }
        }
        Err(e) => {
            error!("{}", e);
            1
        }
    };

    std::process::exit(code);
}

fn close_log() -> Result<u64, AppError> {
    let sink = SESSION_LOG
        .take()
        .ok_or_else(|| AppError::Log("no open session log".into()))?;
    let rows = sink.rows_written();
    let writer = sink.end().map_err(|e| AppError::Log(e.to_string()))?;
    writer.into_inner()?;
    info!("Measurement log closed after {} rows", rows);
    Ok(rows)
}
