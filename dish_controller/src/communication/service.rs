use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tokio::sync::{Mutex, mpsc};
use tracing::{error, info};

use crate::{
    communication::{Command, CommandEnvelope, CommandResponse},
    controller::dish::DishController,
    models::SharedState,
};

/// Drain the command channel and apply each request to the controller.
///
/// Requests are handled one at a time; the only long-running one —
/// calibration — is pushed onto its own task so a later `Stop` is never
/// stuck behind it.
pub async fn run_service(
    mut command_rx: mpsc::Receiver<CommandEnvelope>,
    controller: Arc<DishController>,
    shared_state: Arc<Mutex<SharedState>>,
) -> Result<()> {
    while let Some(envelope) = command_rx.recv().await {
        let CommandEnvelope { command, response } = envelope;

        let result = match command {
            Command::SetTarget { azimuth, elevation } => controller
                .set_target(azimuth, elevation)
                .map(|_| CommandResponse::Success)
                .map_err(|e| e.to_string().into()),

            Command::Tune { axis, p, i, d } => controller
                .tune(p, i, d, axis)
                .map(|_| CommandResponse::Success)
                .map_err(|e| e.to_string().into()),

            Command::ToggleFeedback => controller
                .toggle_feedback()
                .await
                .map(CommandResponse::FeedbackEnabled)
                .map_err(|e| e.to_string().into()),

            Command::Calibrate { dwell_seconds } => {
                let controller = controller.clone();
                tokio::spawn(async move {
                    if let Err(e) = controller
                        .calibrate(Duration::from_secs_f64(dwell_seconds))
                        .await
                    {
                        error!("calibration sequence failed: {e}");
                    }
                });
                Ok(CommandResponse::Success)
            }

            Command::Zero => controller
                .zero()
                .await
                .map(|_| CommandResponse::Success)
                .map_err(|e| e.to_string().into()),

            Command::Stop => {
                controller.stop().await;
                Ok(CommandResponse::Success)
            }

            Command::Status => {
                // Prefer the monitor's snapshot; fall back to a live query
                // before the first telemetry tick has landed.
                let cached = shared_state.lock().await.status;
                let status = match cached {
                    Some(status) => status,
                    None => controller.status().await,
                };
                Ok(CommandResponse::Status(status))
            }
        };

        let _ = response.send(result);
    }

    info!("command service channel closed, shutting down");
    Ok(())
}
