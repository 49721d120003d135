use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, warn};

use crate::{
    command_executor::{command_sender::AxisCommandSender, commands::AxisCommand},
    hardware::{AxisOutputs, Direction, HardwareError},
};

pub mod command_sender;
pub mod commands;

/// Per-axis queue worker.
///
/// Drains the FIFO strictly in order, running one command to completion —
/// including the real-time delay the move implies — before the next, so at
/// most one physical movement is ever in flight on the axis. Step commands
/// that arrive while feedback control owns the actuator are dropped at
/// dequeue time with a warning and no hardware effect.
pub struct StepExecutor {
    axis: &'static str,
    outputs: Arc<Mutex<AxisOutputs>>,
    feedback_enabled: Arc<AtomicBool>,

    commands_ch: mpsc::UnboundedReceiver<AxisCommand>,
    sender: mpsc::UnboundedSender<AxisCommand>,
}

impl StepExecutor {
    pub fn new(
        axis: &'static str,
        outputs: Arc<Mutex<AxisOutputs>>,
        feedback_enabled: Arc<AtomicBool>,
    ) -> Self {
        let (sender, commands_ch) = mpsc::unbounded_channel();

        Self {
            axis,
            outputs,
            feedback_enabled,
            commands_ch,
            sender,
        }
    }

    pub fn sender(&self) -> AxisCommandSender {
        AxisCommandSender::new(self.sender.clone())
    }

    pub async fn run(mut self) {
        while let Some(command) = self.commands_ch.recv().await {
            match command {
                AxisCommand::Step {
                    step_count,
                    velocity,
                    done,
                } => {
                    if self.feedback_enabled.load(Ordering::SeqCst) {
                        warn!(
                            axis = self.axis,
                            step_count, "step command rejected: feedback control owns the actuator"
                        );
                    } else if let Err(e) = self.execute_step(step_count, velocity).await {
                        warn!(axis = self.axis, step_count, "step command failed: {e}");
                    }

                    if let Some(done) = done {
                        let _ = done.send(());
                    }
                }
                AxisCommand::Shutdown => {
                    debug!(axis = self.axis, "step executor shutting down");
                    break;
                }
            }
        }
    }

    async fn execute_step(&self, step_count: i32, velocity: u32) -> Result<(), HardwareError> {
        if step_count == 0 || velocity == 0 {
            return Ok(());
        }

        let direction = Direction::from_sign(step_count as f64);
        let duration = Duration::from_secs_f64(step_count.unsigned_abs() as f64 / velocity as f64);
        debug!(
            axis = self.axis,
            step_count, velocity, "executing timed move ({:.2}s)", duration.as_secs_f64()
        );

        // The outputs stay locked for the whole move, so a control tick that
        // starts mid-move waits for the hardware instead of interleaving.
        let mut outputs = self.outputs.lock().await;
        outputs.drive(direction, velocity as f64)?;
        tokio::time::sleep(duration).await;
        outputs.halt()
    }
}
