use std::{sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    controller::motor_axis::{AxisError, MotorAxis},
    hardware::OrientationSensor,
    models::{DishAxis, DishStatus},
};

/// Step rate used for all scripted calibration moves, steps per second.
const CALIBRATION_VELOCITY: u32 = 400;

/// Relative (azimuth, elevation) degrees for the six static calibration
/// poses. The gyroscope calibrates while still; the accelerometer needs a
/// handful of distinct stable orientations. The offsets sum to zero so the
/// dish ends where it started, and the elevation leg of every pose is the
/// longer move, so awaiting it covers the azimuth leg too.
const CALIBRATION_POSES: [(f64, f64); 6] = [
    (0.0, 0.0),
    (20.0, 15.0),
    (-20.0, 15.0),
    (-20.0, -15.0),
    (20.0, -15.0),
    (0.0, 0.0),
];

/// Relative (azimuth, elevation) degrees of the figure-8 smoothing sweep
/// run after the static poses, again summing to zero with the elevation
/// leg dominant.
const FIGURE_EIGHT_MOVES: [(f64, f64); 8] = [
    (3.0, 4.0),
    (-3.0, -4.0),
    (-3.0, 4.0),
    (3.0, -4.0),
    (3.0, 4.0),
    (-3.0, -4.0),
    (-3.0, 4.0),
    (3.0, -4.0),
];

/// The axis pair plus the shared orientation sensor.
///
/// Thin orchestration: every operation fans out to the two [`MotorAxis`]
/// instances; the shutdown paths catch per-axis failures so one failing
/// axis never keeps the other moving.
pub struct DishController {
    azimuth: MotorAxis,
    elevation: MotorAxis,
    sensor: Arc<dyn OrientationSensor>,
}

impl DishController {
    pub fn new(azimuth: MotorAxis, elevation: MotorAxis, sensor: Arc<dyn OrientationSensor>) -> Self {
        Self {
            azimuth,
            elevation,
            sensor,
        }
    }

    pub fn azimuth(&self) -> &MotorAxis {
        &self.azimuth
    }

    pub fn elevation(&self) -> &MotorAxis {
        &self.elevation
    }

    fn axis(&self, which: DishAxis) -> &MotorAxis {
        match which {
            DishAxis::Azimuth => &self.azimuth,
            DishAxis::Elevation => &self.elevation,
        }
    }

    /// Point the dish: both goals replaced, picked up by the next tick of
    /// each axis's feedback loop.
    pub fn set_target(&self, azimuth_degrees: f64, elevation_degrees: f64) -> Result<(), AxisError> {
        info!(azimuth_degrees, elevation_degrees, "new target");
        self.azimuth.set_target(azimuth_degrees)?;
        self.elevation.set_target(elevation_degrees)
    }

    pub fn tune(&self, p: f64, i: f64, d: f64, which: DishAxis) -> Result<(), AxisError> {
        self.axis(which).tune(p, i, d)
    }

    /// Start feedback on both axes together; if the second axis refuses,
    /// the first is stopped again so one axis never chases a goal alone.
    pub async fn start_feedback(&self) -> Result<(), AxisError> {
        self.azimuth.start_feedback().await?;
        if let Err(e) = self.elevation.start_feedback().await {
            self.azimuth.stop_feedback().await;
            return Err(e);
        }
        Ok(())
    }

    pub async fn stop_feedback(&self) {
        self.azimuth.stop_feedback().await;
        self.elevation.stop_feedback().await;
    }

    /// Flip feedback for the pair; returns the new state.
    pub async fn toggle_feedback(&self) -> Result<bool, AxisError> {
        if self.azimuth.is_feedback_enabled() || self.elevation.is_feedback_enabled() {
            self.stop_feedback().await;
            Ok(false)
        } else {
            self.start_feedback().await?;
            Ok(true)
        }
    }

    /// Reset both axes' accumulated controller state and re-reference their
    /// goals to wherever the dish currently points.
    pub async fn zero(&self) -> Result<(), AxisError> {
        self.azimuth.zero().await?;
        self.elevation.zero().await
    }

    /// Stop all actuation, tolerant of axes that are already stopped.
    pub async fn stop(&self) {
        for axis in [&self.azimuth, &self.elevation] {
            if let Err(e) = axis.stop().await {
                warn!(axis = axis.name(), "failed to stop axis: {e}");
            }
        }
    }

    /// Disable both axes. Safe to call twice and safe when construction
    /// only partially succeeded; per-axis failures are logged so the
    /// companion axis still gets its chance to stop.
    pub async fn disable(&self) {
        for axis in [&self.azimuth, &self.elevation] {
            if let Err(e) = axis.disable().await {
                warn!(axis = axis.name(), "failed to disable axis: {e}");
            }
        }
    }

    pub async fn status(&self) -> DishStatus {
        DishStatus {
            orientation: self.sensor.read().await,
            calibration: self.sensor.calibration_status().await,
            azimuth: self.azimuth.snapshot(),
            elevation: self.elevation.snapshot(),
        }
    }

    /// Run the scripted calibration sequence: six static dwells, then the
    /// figure-8 sweep.
    ///
    /// Within each pose the slower, geared-down elevation move blocks while
    /// the azimuth move runs in the background, so both axes finish close
    /// together without a multi-axis synchronization primitive. The
    /// sequence is not gracefully interruptible mid-way — stopping leaves
    /// the dish wherever the last move ended.
    pub async fn calibrate(&self, dwell: Duration) -> Result<(), AxisError> {
        info!(dwell_secs = dwell.as_secs_f64(), "starting calibration sequence");

        // Manual moves need the actuators; feedback gives them up first.
        self.stop_feedback().await;

        for (pose, (az_deg, el_deg)) in CALIBRATION_POSES.iter().enumerate() {
            debug!(pose = pose + 1, az_deg, el_deg, "moving to calibration pose");
            self.azimuth
                .enqueue_step(self.azimuth.steps_for_degrees(*az_deg), CALIBRATION_VELOCITY)?;
            self.elevation
                .step_blocking(
                    self.elevation.steps_for_degrees(*el_deg),
                    CALIBRATION_VELOCITY,
                )
                .await?;
            sleep(dwell).await;
        }

        for (az_deg, el_deg) in FIGURE_EIGHT_MOVES {
            self.azimuth
                .enqueue_step(self.azimuth.steps_for_degrees(az_deg), CALIBRATION_VELOCITY)?;
            self.elevation
                .step_blocking(
                    self.elevation.steps_for_degrees(el_deg),
                    CALIBRATION_VELOCITY,
                )
                .await?;
        }

        match self.sensor.calibration_status().await {
            Some(status) => info!(?status, "calibration sequence finished"),
            None => warn!("calibration sequence finished, but the sensor reports no status"),
        }
        Ok(())
    }
}
