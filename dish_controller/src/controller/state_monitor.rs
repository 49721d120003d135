use std::{ops::ControlFlow, sync::Arc, time::Duration};

use tokio::sync::Mutex;
use tracing::debug;
use utilities::periodic::{PeriodicTask, Tick};

use crate::{controller::dish::DishController, models::SharedState};

/// Best-effort telemetry: snapshots both axes at a fixed interval for the
/// status query and the debug log. Diagnostic only — not part of the
/// control contract.
pub struct StateMonitor {
    controller: Arc<DishController>,
    shared_state: Arc<Mutex<SharedState>>,
}

impl Tick for StateMonitor {
    async fn tick(&mut self) -> ControlFlow<()> {
        let status = self.controller.status().await;

        debug!(
            az_goal = status.azimuth.goal,
            az_velocity = status.azimuth.velocity,
            az_acceleration = status.azimuth.acceleration,
            az_feedback = status.azimuth.feedback_enabled,
            el_goal = status.elevation.goal,
            el_velocity = status.elevation.velocity,
            el_acceleration = status.elevation.acceleration,
            el_feedback = status.elevation.feedback_enabled,
            "dish telemetry"
        );

        self.shared_state.lock().await.status = Some(status);
        ControlFlow::Continue(())
    }
}

pub fn spawn_state_monitor(
    interval: Duration,
    controller: Arc<DishController>,
    shared_state: Arc<Mutex<SharedState>>,
) -> PeriodicTask {
    PeriodicTask::spawn(
        interval,
        StateMonitor {
            controller,
            shared_state,
        },
    )
}
