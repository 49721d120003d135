use async_trait::async_trait;
use serde::Serialize;

pub mod gpio;
pub mod unconnected;

/// Lowest frequency accepted as a sustained pulse output; anything below is
/// treated as stopped.
pub const MIN_PULSE_HZ: f64 = 1.0;

/// Rotation sense of an axis, as seen looking at the driven shaft.
///
/// Positive distances and velocities are clockwise; the direction line is
/// driven high for clockwise motion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Clockwise,
    CounterClockwise,
}

impl Direction {
    pub fn flip(self) -> Self {
        match self {
            Direction::Clockwise => Direction::CounterClockwise,
            Direction::CounterClockwise => Direction::Clockwise,
        }
    }

    /// Direction of travel for a signed velocity or step count.
    pub fn from_sign(value: f64) -> Self {
        if value < 0.0 {
            Direction::CounterClockwise
        } else {
            Direction::Clockwise
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HardwareError {
    #[error("digital output unavailable: {0}")]
    DigitalOutput(String),

    #[error("pulse channel unavailable: {0}")]
    PulseChannel(String),

    #[error("pulse frequency {0} Hz is not a valid sustained output")]
    InvalidFrequency(f64),
}

/// A single digital output line (direction or enable pin of a driver).
pub trait DigitalOutput: Send {
    fn set_high(&mut self) -> Result<(), HardwareError>;
    fn set_low(&mut self) -> Result<(), HardwareError>;
}

/// Variable-frequency pulse channel feeding the driver's step input.
///
/// Frequency encodes speed; duty cycle is fixed at 50%. Frequencies below
/// 1 Hz are not a valid sustained output — callers treat sub-1 Hz as
/// stopped and implementations may reject it.
pub trait PulseOutput: Send {
    fn set_frequency(&mut self, hz: f64) -> Result<(), HardwareError>;
    fn start(&mut self) -> Result<(), HardwareError>;
    fn stop(&mut self) -> Result<(), HardwareError>;
}

/// Absolute orientation in degrees, each component normalized to [0, 360).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EulerAngles {
    pub yaw: f64,
    pub roll: f64,
    pub pitch: f64,
}

/// Per-subsystem calibration quality reported by the orientation sensor,
/// 0 (uncalibrated) to 3 (fully calibrated).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalibrationStatus {
    pub system: u8,
    pub gyroscope: u8,
    pub accelerometer: u8,
    pub magnetometer: u8,
}

impl CalibrationStatus {
    pub fn is_calibrated(&self) -> bool {
        self.system >= 3
    }
}

/// The shared absolute orientation sensor.
///
/// The sensor may be absent or fail transiently; both surface as `None` and
/// the control loop treats that as "no position".
#[async_trait]
pub trait OrientationSensor: Send + Sync {
    async fn read(&self) -> Option<EulerAngles>;
    async fn calibration_status(&self) -> Option<CalibrationStatus>;
}

/// The three output lines bound to one axis's motor driver.
///
/// Constructed in a safe state: pulses stopped, driver disabled.
pub struct AxisOutputs {
    pulse: Box<dyn PulseOutput>,
    direction: Box<dyn DigitalOutput>,
    enable: Box<dyn DigitalOutput>,
}

impl AxisOutputs {
    pub fn new(
        pulse: Box<dyn PulseOutput>,
        direction: Box<dyn DigitalOutput>,
        enable: Box<dyn DigitalOutput>,
    ) -> Result<Self, HardwareError> {
        let mut outputs = Self {
            pulse,
            direction,
            enable,
        };
        outputs.release()?;
        Ok(outputs)
    }

    /// Drive the motor: direction line, enable line, pulse frequency.
    pub fn drive(&mut self, direction: Direction, hz: f64) -> Result<(), HardwareError> {
        match direction {
            Direction::Clockwise => self.direction.set_high()?,
            Direction::CounterClockwise => self.direction.set_low()?,
        }
        self.enable.set_high()?;
        self.pulse.set_frequency(hz)?;
        self.pulse.start()
    }

    /// Stop pulsing but keep the driver energized (holding torque).
    pub fn halt(&mut self) -> Result<(), HardwareError> {
        self.pulse.stop()
    }

    /// Stop pulsing and release the driver outputs entirely.
    pub fn release(&mut self) -> Result<(), HardwareError> {
        self.pulse.stop()?;
        self.enable.set_low()?;
        self.direction.set_low()
    }
}
