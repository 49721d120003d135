use std::{
    sync::{
        Arc,
        Mutex as StdMutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::{sync::Mutex, task::JoinHandle};
use tracing::{debug, info, warn};
use utilities::periodic::PeriodicTask;

use crate::{
    command_executor::{StepExecutor, command_sender::AxisCommandSender},
    controller::{
        feedback::FeedbackLoop,
        pid::{PidGains, PidState},
    },
    hardware::{AxisOutputs, HardwareError, OrientationSensor},
    models::{AxisStatus, DishAxis},
};

#[derive(Debug, thiserror::Error)]
pub enum AxisError {
    #[error("axis is disabled")]
    Disabled,

    #[error(
        "invalid axis geometry: resolution {resolution} with gear ratio {gear_ratio} \
         gives a non-positive steps-per-revolution"
    )]
    InvalidGeometry { resolution: u32, gear_ratio: f64 },

    #[error(transparent)]
    Hardware(#[from] HardwareError),
}

/// Geometry, limits and loop timing of one axis, fixed at construction.
#[derive(Debug, Clone, Copy)]
pub struct AxisSettings {
    /// Steps per motor revolution at full microstepping.
    pub resolution: u32,
    /// Motor revolutions per output-shaft revolution.
    pub gear_ratio: f64,
    /// Symmetric velocity clamp, steps per second.
    pub max_velocity: f64,
    /// Symmetric acceleration clamp, steps per second squared.
    pub max_acceleration: f64,
    pub gains: PidGains,
    pub control_period: Duration,
}

/// Mutable control state shared between callers and the control tick.
///
/// Writers take the lock briefly and never across an await point;
/// last-writer-wins, picked up on the next tick.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ControlState {
    pub goal: f64,
    pub velocity: f64,
    pub acceleration: f64,
    pub gains: PidGains,
    pub pid: PidState,
}

/// Supplies one axis's absolute angle from the shared orientation sensor.
pub struct PositionSource {
    sensor: Arc<dyn OrientationSensor>,
    axis: DishAxis,
}

impl PositionSource {
    pub fn new(sensor: Arc<dyn OrientationSensor>, axis: DishAxis) -> Self {
        Self { sensor, axis }
    }

    /// Current absolute angle in degrees; `None` when the sensor is
    /// unavailable or the read failed.
    pub async fn angle(&self) -> Option<f64> {
        let euler = self.sensor.read().await?;
        Some(match self.axis {
            DishAxis::Azimuth => euler.yaw,
            DishAxis::Elevation => euler.pitch,
        })
    }
}

/// Signed shortest angular error, in steps, from `position` to `goal`.
///
/// The result lies in `(-steps_per_rev / 2, steps_per_rev / 2]`. An exact
/// half-turn resolves to the positive bound — the comparison is strict, so
/// the tie-break cannot flip sign under floating-point noise. Positive
/// means the goal lies clockwise of the current position, and the
/// controller always drives along the shorter arc, so crossing the 0°/360°
/// boundary never shows up as a full-turn error.
pub fn angular_distance(goal: f64, position: f64, steps_per_rev: f64) -> f64 {
    let raw = (goal - position).rem_euclid(steps_per_rev);
    if raw > steps_per_rev / 2.0 {
        raw - steps_per_rev
    } else {
        raw
    }
}

/// One motorized axis: pulse/direction/enable outputs, unit conversion,
/// the serialized command queue and the PID feedback loop.
pub struct MotorAxis {
    name: &'static str,
    steps_per_rev: f64,
    settings: AxisSettings,

    outputs: Arc<Mutex<AxisOutputs>>,
    control: Arc<StdMutex<ControlState>>,
    feedback_enabled: Arc<AtomicBool>,
    disabled: AtomicBool,
    position_source: Arc<PositionSource>,

    command_sender: AxisCommandSender,
    worker: Mutex<Option<JoinHandle<()>>>,
    feedback_task: Mutex<Option<PeriodicTask>>,
}

impl MotorAxis {
    /// Bind an axis to its outputs and start its queue worker.
    ///
    /// The outputs were put into a safe state by [`AxisOutputs::new`];
    /// geometry is validated here so a half-initialized axis never exists.
    pub fn new(
        name: &'static str,
        settings: AxisSettings,
        outputs: AxisOutputs,
        position_source: PositionSource,
    ) -> Result<Self, AxisError> {
        let steps_per_rev = settings.resolution as f64 * settings.gear_ratio;
        if !(steps_per_rev > 0.0) || !steps_per_rev.is_finite() {
            return Err(AxisError::InvalidGeometry {
                resolution: settings.resolution,
                gear_ratio: settings.gear_ratio,
            });
        }

        info!(
            axis = name,
            steps_per_rev, "creating motor axis"
        );

        let outputs = Arc::new(Mutex::new(outputs));
        let feedback_enabled = Arc::new(AtomicBool::new(false));

        let executor = StepExecutor::new(name, outputs.clone(), feedback_enabled.clone());
        let command_sender = executor.sender();
        let worker = tokio::spawn(executor.run());

        let control = Arc::new(StdMutex::new(ControlState {
            goal: 0.0,
            velocity: 0.0,
            acceleration: 0.0,
            gains: settings.gains,
            pid: PidState::default(),
        }));

        Ok(Self {
            name,
            steps_per_rev,
            settings,
            outputs,
            control,
            feedback_enabled,
            disabled: AtomicBool::new(false),
            position_source: Arc::new(position_source),
            command_sender,
            worker: Mutex::new(Some(worker)),
            feedback_task: Mutex::new(None),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn steps_per_rev(&self) -> f64 {
        self.steps_per_rev
    }

    pub fn is_feedback_enabled(&self) -> bool {
        self.feedback_enabled.load(Ordering::SeqCst)
    }

    /// Step equivalent of an angle on the output shaft.
    pub fn steps_for_degrees(&self, degrees: f64) -> i32 {
        (degrees / 360.0 * self.steps_per_rev).round() as i32
    }

    fn ensure_enabled(&self) -> Result<(), AxisError> {
        if self.disabled.load(Ordering::SeqCst) {
            Err(AxisError::Disabled)
        } else {
            Ok(())
        }
    }

    /// Fire-and-forget manual move; returns as soon as the command is
    /// queued.
    pub fn enqueue_step(&self, step_count: i32, velocity: u32) -> Result<(), AxisError> {
        self.ensure_enabled()?;
        self.command_sender.enqueue(step_count, velocity)
    }

    /// Manual move that waits for the queue worker to finish it.
    pub async fn step_blocking(&self, step_count: i32, velocity: u32) -> Result<(), AxisError> {
        self.ensure_enabled()?;
        self.command_sender.step_blocking(step_count, velocity).await
    }

    /// Replace the goal with the step equivalent of `angle` degrees.
    /// Picked up on the next distance evaluation.
    pub fn set_target(&self, angle: f64) -> Result<(), AxisError> {
        self.ensure_enabled()?;
        let goal = angle / 360.0 * self.steps_per_rev;
        debug!(axis = self.name, angle, goal, "setting target");
        self.control.lock().unwrap().goal = goal;
        Ok(())
    }

    /// Update the controller gains; takes effect on the next tick.
    pub fn tune(&self, p: f64, i: f64, d: f64) -> Result<(), AxisError> {
        self.ensure_enabled()?;
        info!(axis = self.name, p, i, d, "tuning gains");
        self.control.lock().unwrap().gains = PidGains { kp: p, ki: i, kd: d };
        Ok(())
    }

    /// Signed shortest angular error from the sensed position to the goal,
    /// in steps. `None` when the position source has no reading.
    pub async fn distance(&self) -> Option<f64> {
        let angle = self.position_source.angle().await?;
        let position = angle / 360.0 * self.steps_per_rev;
        let goal = self.control.lock().unwrap().goal;
        Some(angular_distance(goal, position, self.steps_per_rev))
    }

    /// Start the feedback loop. A no-op when it is already running.
    pub async fn start_feedback(&self) -> Result<(), AxisError> {
        self.ensure_enabled()?;

        if self.feedback_enabled.swap(true, Ordering::SeqCst) {
            debug!(axis = self.name, "feedback already running");
            return Ok(());
        }

        let mut slot = self.feedback_task.lock().await;
        let feedback = FeedbackLoop::new(
            self.name,
            self.steps_per_rev,
            self.settings.max_velocity,
            self.settings.max_acceleration,
            self.control.clone(),
            self.feedback_enabled.clone(),
            self.outputs.clone(),
            self.position_source.clone(),
        );
        *slot = Some(PeriodicTask::spawn(self.settings.control_period, feedback));

        info!(axis = self.name, "feedback control started");
        Ok(())
    }

    /// Clear the feedback flag and wait for the loop to observe it and
    /// exit. The next tick is the only cancellation point — a tick in
    /// flight finishes normally. Safe to call when already idle.
    pub async fn stop_feedback(&self) {
        if !self.feedback_enabled.swap(false, Ordering::SeqCst) {
            debug!(axis = self.name, "feedback already stopped");
        }

        if let Some(task) = self.feedback_task.lock().await.take() {
            task.join().await;
            info!(axis = self.name, "feedback control stopped");
        }
    }

    /// Reset the accumulated controller state and re-reference the goal to
    /// the current position, so the axis holds where it is.
    pub async fn zero(&self) -> Result<(), AxisError> {
        self.ensure_enabled()?;

        let position = match self.position_source.angle().await {
            Some(angle) => Some(angle / 360.0 * self.steps_per_rev),
            None => {
                warn!(axis = self.name, "no position reading, keeping current goal");
                None
            }
        };

        let mut control = self.control.lock().unwrap();
        control.pid.reset();
        control.velocity = 0.0;
        control.acceleration = 0.0;
        if let Some(position) = position {
            control.goal = position;
        }
        Ok(())
    }

    /// Stop all actuation on this axis but leave it usable.
    pub async fn stop(&self) -> Result<(), AxisError> {
        self.ensure_enabled()?;
        self.stop_feedback().await;
        let mut outputs = self.outputs.lock().await;
        outputs.halt()?;
        Ok(())
    }

    /// Shut the axis down for good: feedback cancelled, queued work
    /// abandoned, pulses stopped, outputs released. Safe to call twice and
    /// safe on an axis that was never started; afterwards every operation
    /// fails with [`AxisError::Disabled`].
    pub async fn disable(&self) -> Result<(), AxisError> {
        if self.disabled.swap(true, Ordering::SeqCst) {
            debug!(axis = self.name, "axis already disabled");
            return Ok(());
        }
        info!(axis = self.name, "disabling axis");

        self.feedback_enabled.store(false, Ordering::SeqCst);
        if let Some(task) = self.feedback_task.lock().await.take() {
            task.cancel();
        }

        self.command_sender.shutdown();
        if let Some(worker) = self.worker.lock().await.take() {
            worker.abort();
            let _ = worker.await;
        }

        let mut outputs = self.outputs.lock().await;
        outputs.release()?;
        Ok(())
    }

    pub fn snapshot(&self) -> AxisStatus {
        let control = self.control.lock().unwrap();
        AxisStatus {
            goal: control.goal,
            velocity: control.velocity,
            acceleration: control.acceleration,
            feedback_enabled: self.is_feedback_enabled(),
        }
    }
}

impl Drop for MotorAxis {
    fn drop(&mut self) {
        // An axis dropped without an explicit disable (e.g. its sibling
        // failed to construct) still winds down its tasks.
        self.feedback_enabled.store(false, Ordering::SeqCst);
        self.command_sender.shutdown();
    }
}
