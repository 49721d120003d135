use std::sync::Arc;

use crate::{
    config::{AxisConfig, DishConfig},
    controller::{
        dish::DishController,
        motor_axis::{AxisSettings, MotorAxis, PositionSource},
        pid::PidGains,
    },
    hardware::{
        AxisOutputs, OrientationSensor,
        gpio::{GpioOutput, SoftPulse},
    },
    models::DishAxis,
};

pub mod dish;
pub mod feedback;
pub mod motor_axis;
pub mod pid;
pub mod state_monitor;

fn create_axis(
    which: DishAxis,
    axis_config: &AxisConfig,
    config: &DishConfig,
    sensor: Arc<dyn OrientationSensor>,
) -> anyhow::Result<MotorAxis> {
    let outputs = AxisOutputs::new(
        Box::new(SoftPulse::new(axis_config.step_pin)?),
        Box::new(GpioOutput::new(axis_config.dir_pin)?),
        Box::new(GpioOutput::new(axis_config.enable_pin)?),
    )?;

    let settings = AxisSettings {
        resolution: axis_config.resolution,
        gear_ratio: axis_config.gear_ratio,
        max_velocity: axis_config.max_velocity,
        max_acceleration: axis_config.max_acceleration,
        gains: PidGains {
            kp: axis_config.kp,
            ki: axis_config.ki,
            kd: axis_config.kd,
        },
        control_period: config.control_period(),
    };

    Ok(MotorAxis::new(
        which.name(),
        settings,
        outputs,
        PositionSource::new(sensor, which),
    )?)
}

/// Wire both axes to their GPIO lines and the shared sensor.
///
/// Fails if either axis's pins cannot be claimed — the daemon refuses to
/// run on half-initialized hardware.
pub fn create_controller(
    config: &DishConfig,
    sensor: Arc<dyn OrientationSensor>,
) -> anyhow::Result<DishController> {
    let azimuth = create_axis(DishAxis::Azimuth, &config.azimuth, config, sensor.clone())?;
    let elevation = create_axis(DishAxis::Elevation, &config.elevation, config, sensor.clone())?;

    Ok(DishController::new(azimuth, elevation, sensor))
}
