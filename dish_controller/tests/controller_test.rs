//! Axis-pair orchestration: fan-out, calibration, the shutdown paths and
//! the command service round-trip.

mod common;

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use common::{AxisHarness, FakeSensor, PulseEvent, build_axis, default_settings};
use dish_controller::{
    communication::{Command, CommandEnvelope, CommandResponse, service::run_service},
    controller::dish::DishController,
    models::{DishAxis, SharedState},
};
use tokio::sync::{Mutex as AsyncMutex, mpsc};

struct DishHarness {
    controller: DishController,
    azimuth_events: Arc<Mutex<Vec<PulseEvent>>>,
    elevation_events: Arc<Mutex<Vec<PulseEvent>>>,
}

fn pulse_starts(events: &Arc<Mutex<Vec<PulseEvent>>>) -> usize {
    events
        .lock()
        .unwrap()
        .iter()
        .filter(|e| matches!(e, PulseEvent::Start))
        .count()
}

fn build_dish(sensor: Arc<FakeSensor>) -> DishHarness {
    let AxisHarness {
        axis: azimuth,
        pulse_events: azimuth_events,
        ..
    } = build_axis(DishAxis::Azimuth, default_settings(), sensor.clone());

    let AxisHarness {
        axis: elevation,
        pulse_events: elevation_events,
        ..
    } = build_axis(DishAxis::Elevation, default_settings(), sensor.clone());

    DishHarness {
        controller: DishController::new(azimuth, elevation, sensor),
        azimuth_events,
        elevation_events,
    }
}

#[tokio::test(start_paused = true)]
async fn set_target_updates_both_goals() {
    let dish = build_dish(FakeSensor::fixed(0.0, 0.0));

    dish.controller.set_target(90.0, 45.0).unwrap();

    assert!((dish.controller.azimuth().snapshot().goal - 800.0).abs() < 1e-9);
    assert!((dish.controller.elevation().snapshot().goal - 400.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn toggle_feedback_flips_the_pair_together() {
    let dish = build_dish(FakeSensor::fixed(0.0, 0.0));

    assert!(dish.controller.toggle_feedback().await.unwrap());
    assert!(dish.controller.azimuth().is_feedback_enabled());
    assert!(dish.controller.elevation().is_feedback_enabled());

    assert!(!dish.controller.toggle_feedback().await.unwrap());
    assert!(!dish.controller.azimuth().is_feedback_enabled());
    assert!(!dish.controller.elevation().is_feedback_enabled());
}

#[tokio::test(start_paused = true)]
async fn calibration_runs_the_scripted_moves_on_both_axes() {
    let dish = build_dish(FakeSensor::fixed(0.0, 0.0));
    dish.azimuth_events.lock().unwrap().clear();
    dish.elevation_events.lock().unwrap().clear();

    dish.controller
        .calibrate(Duration::from_millis(100))
        .await
        .unwrap();

    // Four of the six poses move, plus eight figure-8 sweeps, per axis.
    assert_eq!(pulse_starts(&dish.azimuth_events), 12);
    assert_eq!(pulse_starts(&dish.elevation_events), 12);

    // The scripted offsets cancel out, so the goals were never touched.
    assert_eq!(dish.controller.azimuth().snapshot().goal, 0.0);
}

#[tokio::test(start_paused = true)]
async fn calibration_stops_feedback_before_moving() {
    let dish = build_dish(FakeSensor::fixed(0.0, 0.0));

    dish.controller.start_feedback().await.unwrap();
    dish.controller
        .calibrate(Duration::from_millis(10))
        .await
        .unwrap();

    assert!(!dish.controller.azimuth().is_feedback_enabled());
    assert!(!dish.controller.elevation().is_feedback_enabled());
}

#[tokio::test(start_paused = true)]
async fn stop_survives_one_axis_being_disabled() {
    let dish = build_dish(FakeSensor::fixed(0.0, 0.0));

    dish.controller.azimuth().disable().await.unwrap();

    // The elevation axis must still get its chance to stop.
    dish.controller.stop().await;
    dish.controller.disable().await;
    dish.controller.disable().await;

    assert!(matches!(
        dish.controller.elevation().enqueue_step(10, 400),
        Err(_)
    ));
}

#[tokio::test(start_paused = true)]
async fn status_reports_sensor_and_axis_state() {
    let dish = build_dish(FakeSensor::fixed(120.0, 45.0));

    dish.controller.set_target(90.0, 0.0).unwrap();
    let status = dish.controller.status().await;

    let orientation = status.orientation.unwrap();
    assert_eq!(orientation.yaw, 120.0);
    assert_eq!(orientation.pitch, 45.0);
    assert!(status.calibration.unwrap().is_calibrated());
    assert!((status.azimuth.goal - 800.0).abs() < 1e-9);
    assert!(!status.azimuth.feedback_enabled);
}

#[tokio::test(start_paused = true)]
async fn zero_holds_the_dish_where_it_points() {
    let dish = build_dish(FakeSensor::fixed(90.0, 180.0));

    dish.controller.set_target(0.0, 0.0).unwrap();
    dish.controller.zero().await.unwrap();

    assert!((dish.controller.azimuth().snapshot().goal - 800.0).abs() < 1e-9);
    assert!((dish.controller.elevation().snapshot().goal - 1600.0).abs() < 1e-9);
}

#[tokio::test(start_paused = true)]
async fn command_service_round_trip() {
    let dish = build_dish(FakeSensor::fixed(0.0, 0.0));
    let controller = Arc::new(dish.controller);
    let shared_state = Arc::new(AsyncMutex::new(SharedState::default()));

    let (command_tx, command_rx) = mpsc::channel(8);
    tokio::spawn(run_service(
        command_rx,
        controller.clone(),
        shared_state.clone(),
    ));

    let (envelope, response) = CommandEnvelope::new(Command::SetTarget {
        azimuth: 90.0,
        elevation: 45.0,
    });
    command_tx.send(envelope).await.unwrap();
    assert!(matches!(
        response.await.unwrap(),
        Ok(CommandResponse::Success)
    ));

    let (envelope, response) = CommandEnvelope::new(Command::Status);
    command_tx.send(envelope).await.unwrap();
    match response.await.unwrap() {
        Ok(CommandResponse::Status(status)) => {
            assert!((status.azimuth.goal - 800.0).abs() < 1e-9);
        }
        other => panic!("unexpected response: {other:?}"),
    }

    // Commands keep failing cleanly once the dish is disabled.
    controller.disable().await;
    let (envelope, response) = CommandEnvelope::new(Command::SetTarget {
        azimuth: 0.0,
        elevation: 0.0,
    });
    command_tx.send(envelope).await.unwrap();
    assert!(response.await.unwrap().is_err());
}
