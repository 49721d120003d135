use std::fmt;

use tokio::sync::oneshot;

use crate::models::{DishAxis, DishStatus};

pub mod service;

/// Dwell used when a calibrate request does not carry one.
pub const DEFAULT_CALIBRATION_DWELL_SECS: f64 = 2.0;

pub type CommandResult = Result<CommandResponse, CommandError>;

#[derive(Debug, Clone)]
pub struct CommandError {
    pub message: String,
}

impl From<String> for CommandError {
    fn from(message: String) -> Self {
        CommandError { message }
    }
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error: {}", self.message)
    }
}

/// The call contract exposed to the external HTTP layer.
///
/// Every request is an envelope on the service channel; none of them may
/// hold the requesting thread beyond the channel round-trip.
#[derive(Debug)]
pub enum Command {
    SetTarget { azimuth: f64, elevation: f64 },
    Tune { axis: DishAxis, p: f64, i: f64, d: f64 },
    ToggleFeedback,
    Calibrate { dwell_seconds: f64 },
    Zero,
    Stop,
    Status,
}

#[derive(Debug, Clone)]
pub enum CommandResponse {
    Success,
    FeedbackEnabled(bool),
    Status(DishStatus),
}

#[derive(Debug)]
pub struct CommandEnvelope {
    pub command: Command,
    pub response: oneshot::Sender<CommandResult>,
}

impl CommandEnvelope {
    pub fn new(command: Command) -> (Self, oneshot::Receiver<CommandResult>) {
        let (response, response_rx) = oneshot::channel();
        (Self { command, response }, response_rx)
    }
}
