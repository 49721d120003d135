use serde::Serialize;

use crate::hardware::{CalibrationStatus, EulerAngles};

/// The two controlled rotational degrees of freedom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DishAxis {
    Azimuth,
    Elevation,
}

impl DishAxis {
    pub fn name(&self) -> &'static str {
        match self {
            DishAxis::Azimuth => "azimuth",
            DishAxis::Elevation => "elevation",
        }
    }
}

/// Control-state snapshot of one axis.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AxisStatus {
    /// Target position in steps, interpreted modulo steps_per_rev.
    pub goal: f64,
    /// Commanded velocity in steps per second.
    pub velocity: f64,
    /// Last controller output in steps per second squared.
    pub acceleration: f64,
    pub feedback_enabled: bool,
}

/// Snapshot returned to the status query and emitted by the telemetry task.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct DishStatus {
    pub orientation: Option<EulerAngles>,
    pub calibration: Option<CalibrationStatus>,
    pub azimuth: AxisStatus,
    pub elevation: AxisStatus,
}

/// Latest telemetry snapshot, shared between the monitor task and the
/// command service.
#[derive(Debug, Default)]
pub struct SharedState {
    pub status: Option<DishStatus>,
}
