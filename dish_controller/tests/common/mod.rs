#![allow(dead_code)]

use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use dish_controller::{
    controller::{
        motor_axis::{AxisSettings, MotorAxis, PositionSource},
        pid::PidGains,
    },
    hardware::{
        AxisOutputs, CalibrationStatus, DigitalOutput, EulerAngles, HardwareError,
        OrientationSensor, PulseOutput,
    },
    models::DishAxis,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PulseEvent {
    Frequency(f64),
    Start,
    Stop,
}

/// Pulse channel spy recording every call for later assertions.
pub struct SpyPulse {
    pub events: Arc<Mutex<Vec<PulseEvent>>>,
}

impl PulseOutput for SpyPulse {
    fn set_frequency(&mut self, hz: f64) -> Result<(), HardwareError> {
        self.events.lock().unwrap().push(PulseEvent::Frequency(hz));
        Ok(())
    }

    fn start(&mut self) -> Result<(), HardwareError> {
        self.events.lock().unwrap().push(PulseEvent::Start);
        Ok(())
    }

    fn stop(&mut self) -> Result<(), HardwareError> {
        self.events.lock().unwrap().push(PulseEvent::Stop);
        Ok(())
    }
}

/// Digital line spy exposing its current level.
pub struct SpyOutput {
    pub high: Arc<AtomicBool>,
}

impl DigitalOutput for SpyOutput {
    fn set_high(&mut self) -> Result<(), HardwareError> {
        self.high.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), HardwareError> {
        self.high.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Orientation sensor returning whatever the test scripted.
pub struct FakeSensor {
    angles: Mutex<Option<EulerAngles>>,
}

impl FakeSensor {
    pub fn fixed(yaw: f64, pitch: f64) -> Arc<Self> {
        Arc::new(Self {
            angles: Mutex::new(Some(EulerAngles {
                yaw,
                roll: 0.0,
                pitch,
            })),
        })
    }

    pub fn unavailable() -> Arc<Self> {
        Arc::new(Self {
            angles: Mutex::new(None),
        })
    }

    pub fn set(&self, angles: Option<EulerAngles>) {
        *self.angles.lock().unwrap() = angles;
    }
}

#[async_trait]
impl OrientationSensor for FakeSensor {
    async fn read(&self) -> Option<EulerAngles> {
        *self.angles.lock().unwrap()
    }

    async fn calibration_status(&self) -> Option<CalibrationStatus> {
        self.angles.lock().unwrap().map(|_| CalibrationStatus {
            system: 3,
            gyroscope: 3,
            accelerometer: 3,
            magnetometer: 3,
        })
    }
}

/// A motor axis wired to spy hardware.
pub struct AxisHarness {
    pub axis: MotorAxis,
    pub pulse_events: Arc<Mutex<Vec<PulseEvent>>>,
    pub direction_high: Arc<AtomicBool>,
    pub enable_high: Arc<AtomicBool>,
    pub sensor: Arc<FakeSensor>,
}

impl AxisHarness {
    pub fn pulse_starts(&self) -> usize {
        self.pulse_events
            .lock()
            .unwrap()
            .iter()
            .filter(|e| matches!(e, PulseEvent::Start))
            .count()
    }

    pub fn last_frequency(&self) -> Option<f64> {
        self.pulse_events
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find_map(|e| match e {
                PulseEvent::Frequency(hz) => Some(*hz),
                _ => None,
            })
    }

    pub fn last_event(&self) -> Option<PulseEvent> {
        self.pulse_events.lock().unwrap().last().copied()
    }

    pub fn clear_events(&self) {
        self.pulse_events.lock().unwrap().clear();
    }
}

pub fn default_settings() -> AxisSettings {
    AxisSettings {
        resolution: 3200,
        gear_ratio: 1.0,
        max_velocity: 2000.0,
        max_acceleration: 1000.0,
        gains: PidGains {
            kp: 1.0,
            ki: 0.0,
            kd: 0.0,
        },
        control_period: Duration::from_millis(10),
    }
}

pub fn build_axis(
    which: DishAxis,
    settings: AxisSettings,
    sensor: Arc<FakeSensor>,
) -> AxisHarness {
    let pulse_events = Arc::new(Mutex::new(Vec::new()));
    let direction_high = Arc::new(AtomicBool::new(false));
    let enable_high = Arc::new(AtomicBool::new(false));

    let outputs = AxisOutputs::new(
        Box::new(SpyPulse {
            events: pulse_events.clone(),
        }),
        Box::new(SpyOutput {
            high: direction_high.clone(),
        }),
        Box::new(SpyOutput {
            high: enable_high.clone(),
        }),
    )
    .expect("spy outputs never fail");

    let axis = MotorAxis::new(
        which.name(),
        settings,
        outputs,
        PositionSource::new(sensor.clone(), which),
    )
    .expect("axis geometry is valid");

    AxisHarness {
        axis,
        pulse_events,
        direction_high,
        enable_high,
        sensor,
    }
}
