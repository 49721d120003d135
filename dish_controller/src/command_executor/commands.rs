use tokio::sync::oneshot;

/// Work items consumed by the per-axis queue, strictly in FIFO order.
pub enum AxisCommand {
    /// Run-to-completion timed move of `step_count` signed steps at
    /// `velocity` steps per second.
    Step {
        step_count: i32,
        velocity: u32,
        /// Present when the issuer wants to wait for the move to be
        /// consumed (the blocking variant); fire-and-forget enqueues leave
        /// it empty.
        done: Option<oneshot::Sender<()>>,
    },
    /// Terminate the worker once the commands ahead of it are handled.
    Shutdown,
}
