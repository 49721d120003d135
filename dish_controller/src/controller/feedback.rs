use std::{
    ops::ControlFlow,
    sync::{
        Arc,
        Mutex as StdMutex,
        atomic::{AtomicBool, Ordering},
    },
};

use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, warn};
use utilities::periodic::Tick;

use crate::{
    controller::{
        motor_axis::{ControlState, PositionSource, angular_distance},
        pid::pid_compute,
    },
    hardware::{AxisOutputs, Direction, MIN_PULSE_HZ},
};

/// What one control tick wants from the pulse channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum PulseCommand {
    /// Sub-1 Hz velocity is treated as stationary: stop pulsing.
    Hold,
    Drive { direction: Direction, frequency: f64 },
}

/// Advance the control state by one tick and decide the pulse command.
///
/// Kept free of hardware and clocks so the arithmetic is testable on its
/// own: PID output clamped to ±max_acceleration, velocity integrated from
/// it and clamped to ±max_velocity.
pub(crate) fn control_step(
    control: &mut ControlState,
    position: f64,
    dt: f64,
    steps_per_rev: f64,
    max_velocity: f64,
    max_acceleration: f64,
) -> PulseCommand {
    let error = angular_distance(control.goal, position, steps_per_rev);
    let gains = control.gains;
    control.acceleration = pid_compute(&mut control.pid, &gains, error, dt, max_acceleration);
    control.velocity =
        (control.velocity + control.acceleration * dt).clamp(-max_velocity, max_velocity);

    if control.velocity.abs() < MIN_PULSE_HZ {
        PulseCommand::Hold
    } else {
        PulseCommand::Drive {
            direction: Direction::from_sign(control.velocity),
            frequency: control.velocity.abs(),
        }
    }
}

/// The per-axis closed-loop control tick.
///
/// Driven by a `PeriodicTask`; terminates without re-arming when the
/// feedback flag is cleared or the position source goes away.
pub(crate) struct FeedbackLoop {
    axis: &'static str,
    steps_per_rev: f64,
    max_velocity: f64,
    max_acceleration: f64,

    control: Arc<StdMutex<ControlState>>,
    feedback_enabled: Arc<AtomicBool>,
    outputs: Arc<Mutex<AxisOutputs>>,
    position_source: Arc<PositionSource>,

    last_tick: Option<Instant>,
}

impl FeedbackLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        axis: &'static str,
        steps_per_rev: f64,
        max_velocity: f64,
        max_acceleration: f64,
        control: Arc<StdMutex<ControlState>>,
        feedback_enabled: Arc<AtomicBool>,
        outputs: Arc<Mutex<AxisOutputs>>,
        position_source: Arc<PositionSource>,
    ) -> Self {
        Self {
            axis,
            steps_per_rev,
            max_velocity,
            max_acceleration,
            control,
            feedback_enabled,
            outputs,
            position_source,
            last_tick: None,
        }
    }

    async fn halt_pulse(&self) {
        let mut outputs = self.outputs.lock().await;
        if let Err(e) = outputs.halt() {
            warn!(axis = self.axis, "failed to stop pulse output: {e}");
        }
    }
}

impl Tick for FeedbackLoop {
    async fn tick(&mut self) -> ControlFlow<()> {
        if !self.feedback_enabled.load(Ordering::SeqCst) {
            self.halt_pulse().await;
            debug!(axis = self.axis, "feedback flag cleared, loop exiting");
            return ControlFlow::Break(());
        }

        let now = Instant::now();
        let Some(prev) = self.last_tick.replace(now) else {
            // First tick seeds the clock; integral and derivative would see
            // a meaningless dt.
            return ControlFlow::Continue(());
        };
        let dt = now.duration_since(prev).as_secs_f64();
        if dt <= 0.0 {
            return ControlFlow::Continue(());
        }

        let Some(angle) = self.position_source.angle().await else {
            // Fail safe: position falls back to zero and feedback stops —
            // the motor is never driven open-loop from a broken read.
            warn!(
                axis = self.axis,
                "position source unavailable, stopping feedback"
            );
            self.feedback_enabled.store(false, Ordering::SeqCst);
            self.halt_pulse().await;
            return ControlFlow::Break(());
        };

        let position = angle / 360.0 * self.steps_per_rev;
        let command = {
            let mut control = self.control.lock().unwrap();
            control_step(
                &mut control,
                position,
                dt,
                self.steps_per_rev,
                self.max_velocity,
                self.max_acceleration,
            )
        };

        let mut outputs = self.outputs.lock().await;
        let result = match command {
            PulseCommand::Hold => outputs.halt(),
            PulseCommand::Drive {
                direction,
                frequency,
            } => outputs.drive(direction, frequency),
        };
        if let Err(e) = result {
            warn!(axis = self.axis, "pulse command failed: {e}");
        }

        ControlFlow::Continue(())
    }
}
