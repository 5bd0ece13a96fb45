//! Events that trigger mode transitions

/// Events that can change the valve mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Operator asked for manual calibration
    EnterCalibration,
    /// Operator left calibration; position is re-zeroed
    ExitCalibration,
    /// Valve parked at zero, all tasks must stop
    Terminate,
}
