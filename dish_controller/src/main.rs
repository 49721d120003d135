use std::{path::PathBuf, sync::Arc};

use anyhow::Result;
use tokio::sync::{Mutex, mpsc};
use tracing::{info, warn};

use dish_controller::{
    communication::{CommandEnvelope, service::run_service},
    config::{create_default_config, init_config},
    controller::{create_controller, state_monitor::spawn_state_monitor},
    hardware::{OrientationSensor, unconnected::UnconnectedSensor},
    logging,
    models::SharedState,
};

fn should_create_config() -> bool {
    std::env::var("CREATE_CONFIG")
        .map(|val| val == "1" || val.to_lowercase() == "true")
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> Result<()> {
    let _log_guard = logging::init();

    if should_create_config() {
        create_default_config(None::<PathBuf>)?;
    }

    let (_config_manager, config) = init_config().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        eprintln!("Run with CREATE_CONFIG=1 to create a default configuration file.");
        e
    })?;

    info!("starting");

    // The orientation sensor binding is deployment-specific and supplied
    // from outside this crate; without one the controller runs with the
    // explicit unconnected fallback and feedback refuses to engage.
    let sensor: Arc<dyn OrientationSensor> = Arc::new(UnconnectedSensor);
    warn!("orientation sensor not wired up; feedback control will not engage");

    info!(
        warmup_ms = config.sensor_warmup_ms,
        "waiting for the orientation sensor to settle"
    );
    tokio::time::sleep(config.sensor_warmup()).await;

    let controller = Arc::new(create_controller(&config, sensor)?);

    let shared_state = Arc::new(Mutex::new(SharedState::default()));
    let _telemetry = spawn_state_monitor(
        config.telemetry_interval(),
        controller.clone(),
        shared_state.clone(),
    );

    // The web layer (listening on config.web_port) feeds this channel; it
    // lives outside this crate.
    let (command_tx, command_rx) = mpsc::channel::<CommandEnvelope>(32);
    let service = tokio::spawn(run_service(command_rx, controller.clone(), shared_state));

    info!(web_port = config.web_port, "dish controller running");
    shutdown_signal().await;

    info!("stopping...");
    controller.disable().await;
    drop(command_tx);
    let _ = service.await;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => {}
            _ = sigterm.recv() => {}
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }
}
