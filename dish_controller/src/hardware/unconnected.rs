//! Explicit stand-in for a sensor that is not wired up.
//!
//! Deployments without the orientation sensor get the fail-safe path
//! (feedback refuses to run) instead of an attribute-probing guess about
//! what is connected.

use async_trait::async_trait;

use crate::hardware::{CalibrationStatus, EulerAngles, OrientationSensor};

pub struct UnconnectedSensor;

#[async_trait]
impl OrientationSensor for UnconnectedSensor {
    async fn read(&self) -> Option<EulerAngles> {
        None
    }

    async fn calibration_status(&self) -> Option<CalibrationStatus> {
        None
    }
}
