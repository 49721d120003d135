use tokio::sync::{mpsc, oneshot};

use crate::{command_executor::commands::AxisCommand, controller::motor_axis::AxisError};

/// Cloneable, non-blocking handle onto one axis's command queue.
///
/// Enqueues append in FIFO order and return immediately; the issuing caller
/// is never held up by hardware timing. Once the worker has shut down every
/// enqueue fails with [`AxisError::Disabled`].
#[derive(Clone)]
pub struct AxisCommandSender {
    commands_ch: mpsc::UnboundedSender<AxisCommand>,
}

impl AxisCommandSender {
    pub fn new(commands_ch: mpsc::UnboundedSender<AxisCommand>) -> Self {
        Self { commands_ch }
    }

    /// Fire-and-forget move. A rejection at dequeue time (feedback owns the
    /// actuator) is logged by the worker, not reported here.
    pub fn enqueue(&self, step_count: i32, velocity: u32) -> Result<(), AxisError> {
        self.send(AxisCommand::Step {
            step_count,
            velocity,
            done: None,
        })
    }

    /// Enqueue a move and wait until the worker has run it to completion.
    ///
    /// Blocks only the calling task, never the worker of another axis. There
    /// is no timeout; callers wanting bounded waiting use [`enqueue`] and
    /// poll.
    ///
    /// [`enqueue`]: AxisCommandSender::enqueue
    pub async fn step_blocking(&self, step_count: i32, velocity: u32) -> Result<(), AxisError> {
        let (done, done_rx) = oneshot::channel();
        self.send(AxisCommand::Step {
            step_count,
            velocity,
            done: Some(done),
        })?;

        done_rx.await.map_err(|_| AxisError::Disabled)
    }

    /// Ask the worker to terminate. Harmless when it is already gone.
    pub fn shutdown(&self) {
        let _ = self.commands_ch.send(AxisCommand::Shutdown);
    }

    fn send(&self, command: AxisCommand) -> Result<(), AxisError> {
        self.commands_ch
            .send(command)
            .map_err(|_| AxisError::Disabled)
    }
}
