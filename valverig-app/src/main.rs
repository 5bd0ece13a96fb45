//! valverig - Valve Test Rig Controller
//!
//! Positions a stepper-driven valve from operator commands while two
//! BMI160 IMUs are sampled onto one shared timeline in a CSV log.
//!
//! Start-up is sequential: load the rig config, set up the board, bring
//! up each sensor, open the log. After that the motor, acquisition,
//! console and supervisor tasks share one cooperative executor.

use std::path::PathBuf;

use chrono::Local;
use clap::Parser;
use embassy_executor::Spawner;
use embassy_time::Delay;
use log::{error, info, warn};
use static_cell::StaticCell;

use valverig_core::datalog::LogSink;
use valverig_core::motion::ValveState;
use valverig_core::registers::SENSOR_TIME_WRAP_S;
use valverig_core::scheduler::TaskId;

mod boards;
mod bringup;
mod channels;
mod config;
mod console;
mod controller;
mod error;
mod storage;
mod tasks;

use crate::boards::SimBoard;
use crate::bringup::bring_up;
use crate::channels::{CONSOLE_LINES, SESSION_LOG, TASKS};
use crate::console::{spawn_stdin_reader, ChannelLineSource};
use crate::error::AppError;
use crate::storage::CsvRowWriter;

/// Shared valve state (must live forever for task references)
static VALVE_STATE: StaticCell<ValveState> = StaticCell::new();

/// Valve test rig controller
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Rig configuration file; the built-in rig.toml is used if missing
    #[arg(short, long, default_value = "rig.toml")]
    config: PathBuf,

    /// Write the measurement log here instead of the configured directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Record the valve position on every log row
    #[arg(long)]
    valve_snapshots: bool,

    /// Skip offset compensation during sensor bring-up
    #[arg(long)]
    skip_foc: bool,

    /// Debug logging (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp_millis()
        .init();
}

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let args = Args::parse();
    init_logging(args.verbose);
    info!("valverig {} starting", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(spawner, args).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run(spawner: Spawner, args: Args) -> Result<(), AppError> {
    let mut config = config::load(Some(args.config.as_path()))?;
    if args.valve_snapshots {
        config.log.valve_snapshots = true;
    }

    let board = SimBoard::new(&config)?;
    info!("Board ready: valve and {} sensor(s)", board.sensors.len());

    spawn_stdin_reader(&CONSOLE_LINES).map_err(AppError::Console)?;
    let mut console = ChannelLineSource::new(&CONSOLE_LINES);

    let mut sensors = board.sensors;
    let mut delay = Delay;
    for (sensor_config, sensor) in sensors.iter_mut() {
        let outcome = bring_up(sensor, sensor_config, &mut console, &mut delay, !args.skip_foc).await?;
        if outcome.degraded {
            warn!(
                "Sensor {} error register still set after {} attempts",
                sensor_config.id, outcome.attempts
            );
        }
    }

    let directory = args
        .log_dir
        .unwrap_or_else(|| PathBuf::from(config.log.directory.as_str()));
    let (writer, log_path) = CsvRowWriter::create(&directory, &Local::now())?;
    let mut sink = LogSink::new(writer);
    if config.log.unwrap_sensor_time {
        sink = sink.with_time_wrap(SENSOR_TIME_WRAP_S);
    }
    sink.start().map_err(|e| AppError::Log(e.to_string()))?;
    SESSION_LOG.install(sink);
    info!("Logging to {}", log_path.display());

    let valve_config = &config.valve;
    let valve_state: &'static ValveState = VALVE_STATE.init(ValveState::new(
        valve_config.geometry().max_position(),
        u32::from(valve_config.rpm),
    ));
    let snapshots = config.log.valve_snapshots.then_some(valve_state);

    TASKS.started(TaskId::Motor);
    spawner.spawn(tasks::stepper_task(board.valve, valve_state))?;

    for (_, sensor) in sensors {
        TASKS.started(TaskId::Acquisition(sensor.id()));
        spawner.spawn(tasks::acquisition_task(sensor, config.acquisition, snapshots))?;
    }

    TASKS.started(TaskId::Console);
    spawner.spawn(tasks::controller_task(console, valve_state))?;

    spawner.spawn(tasks::supervisor_task(log_path))?;
    info!("All tasks spawned");

    Ok(())
}
