// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for the calibration state machine

use futures::channel::mpsc::UnboundedReceiver;
use spectroscope::calibration::{
    CalibrationEngine, CalibrationEvent, CalibrationMode, CalibrationPoint, CalibrationState,
    WavelengthResponse,
};

fn drain(events: &mut UnboundedReceiver<CalibrationEvent>) -> Vec<CalibrationEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

#[test]
fn test_full_session_event_sequence() {
    let mut engine = CalibrationEngine::new(CalibrationMode::XLinear);
    let mut events = engine.subscribe();
    let mut states = vec![engine.state()];

    engine.start_calibration();
    states.push(engine.state());

    engine.add_reference_point(100.0);
    engine.request_to_add_calibrated_point(100.0).unwrap();
    states.push(engine.state());
    engine
        .submit_wavelength(WavelengthResponse::Entered("420".to_string()))
        .unwrap();

    engine.add_reference_point(500.0);
    engine.request_to_add_calibrated_point(500.0).unwrap();
    states.push(engine.state());
    engine
        .submit_wavelength(WavelengthResponse::Entered("680".to_string()))
        .unwrap();
    states.push(engine.state());

    assert_eq!(
        states,
        vec![
            CalibrationState::Uncalibrated,
            CalibrationState::Start,
            CalibrationState::FirstPointSelected,
            CalibrationState::SecondPointSelected,
            CalibrationState::Calibrated,
        ]
    );

    let events = drain(&mut events);
    let kinds: Vec<&str> = events
        .iter()
        .map(|event| match event {
            CalibrationEvent::Started => "started",
            CalibrationEvent::WavelengthRequested(_) => "requested",
            CalibrationEvent::PointsUpdated { .. } => "points-updated",
            CalibrationEvent::Completed { .. } => "completed",
            _ => "other",
        })
        .collect();
    assert_eq!(
        kinds,
        vec![
            "started",
            "requested",
            "points-updated",
            "requested",
            "points-updated",
            "completed"
        ]
    );

    let completions = events
        .iter()
        .filter(|e| matches!(e, CalibrationEvent::Completed { .. }))
        .count();
    assert_eq!(completions, 1);

    let params = engine.parameters().unwrap();
    assert!((params.slope - 0.65).abs() < 1e-12);
    assert!((params.intercept - 355.0).abs() < 1e-9);
    assert!((params.wavelength_at(300.0) - 550.0).abs() < 1e-9);
}

#[test]
fn test_cancel_first_point_returns_to_start() {
    let mut engine = CalibrationEngine::default();
    engine.start_calibration();
    engine.add_reference_point(250.0);
    engine.request_to_add_calibrated_point(250.0).unwrap();
    assert_eq!(engine.state(), CalibrationState::FirstPointSelected);

    engine.submit_wavelength(WavelengthResponse::Cancelled).unwrap();
    assert_eq!(engine.state(), CalibrationState::Start);
    assert!(!engine.is_calibrated());
}

#[test]
fn test_too_close_points_reset_and_report() {
    let mut engine = CalibrationEngine::default();
    let mut events = engine.subscribe();
    engine.start_calibration();

    engine.add_reference_point(300.0);
    engine.request_to_add_calibrated_point(300.0).unwrap();
    engine
        .submit_wavelength(WavelengthResponse::Entered("420".to_string()))
        .unwrap();
    engine.add_reference_point(300.0005);
    engine.request_to_add_calibrated_point(300.0005).unwrap();

    let result = engine.submit_wavelength(WavelengthResponse::Entered("680".to_string()));
    assert!(result.is_err());
    assert_eq!(engine.state(), CalibrationState::Start);
    assert!(engine.parameters().is_none());
    assert!(engine.calibration_info().is_none());

    let events = drain(&mut events);
    assert!(matches!(events.last(), Some(CalibrationEvent::Failed(_))));
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, CalibrationEvent::Completed { .. }))
    );
}

#[test]
fn test_restart_discards_in_flight_state() {
    let mut engine = CalibrationEngine::default();
    engine.start_calibration();
    engine.add_reference_point(10.0);
    engine.request_to_add_calibrated_point(10.0).unwrap();

    engine.start_calibration();
    assert_eq!(engine.state(), CalibrationState::Start);
    assert!(engine.points().is_empty());
    assert!(engine.pending_request().is_none());
}

/// Every state but `Calibrated` reports no parameters
fn assert_uncalibrated(engine: &CalibrationEngine) {
    assert_ne!(engine.state(), CalibrationState::Calibrated);
    assert!(!engine.is_calibrated());
    assert!(engine.parameters().is_none());
    assert!(engine.calibration_info().is_none());
}

fn calibrate(engine: &mut CalibrationEngine) {
    engine.start_calibration();
    engine.add_reference_point(100.0);
    engine.request_to_add_calibrated_point(100.0).unwrap();
    engine
        .submit_wavelength(WavelengthResponse::Entered("420".into()))
        .unwrap();
    engine.add_reference_point(500.0);
    engine.request_to_add_calibrated_point(500.0).unwrap();
    engine
        .submit_wavelength(WavelengthResponse::Entered("680".into()))
        .unwrap();
    assert!(engine.is_calibrated());
    assert_eq!(engine.points().len(), 2);
}

#[test]
fn test_parameters_cleared_on_every_exit_from_calibrated() {
    let mut engine = CalibrationEngine::default();

    calibrate(&mut engine);
    engine.set_uncalibrated_mode();
    assert_eq!(engine.state(), CalibrationState::Uncalibrated);
    assert_uncalibrated(&engine);

    calibrate(&mut engine);
    engine.add_reference_point(300.0);
    engine.request_to_add_calibrated_point(300.0).unwrap();
    assert_eq!(engine.state(), CalibrationState::SecondPointSelected);
    assert_uncalibrated(&engine);

    engine.submit_wavelength(WavelengthResponse::Cancelled).unwrap();
    assert_eq!(engine.state(), CalibrationState::FirstPointSelected);
    assert_uncalibrated(&engine);

    calibrate(&mut engine);
    engine.reset_calibration();
    assert_uncalibrated(&engine);

    calibrate(&mut engine);
    engine.start_calibration();
    assert_uncalibrated(&engine);
}

#[test]
fn test_recalibrating_from_calibrated_publishes_new_line() {
    let mut engine = CalibrationEngine::default();
    calibrate(&mut engine);

    engine.add_reference_point(300.0);
    engine.request_to_add_calibrated_point(300.0).unwrap();
    engine
        .submit_wavelength(WavelengthResponse::Entered("560".into()))
        .unwrap();

    assert!(engine.is_calibrated());
    let params = engine.parameters().unwrap();
    assert!((params.slope - 0.7).abs() < 1e-12);
    assert!((params.intercept - 350.0).abs() < 1e-9);
}

#[test]
fn test_restore_from_saved_points() {
    let saved = vec![
        CalibrationPoint::labeled(100.0, 420.0),
        CalibrationPoint::labeled(500.0, 680.0),
    ];

    let mut engine = CalibrationEngine::default();
    let mut events = engine.subscribe();
    let params = engine.restore(saved.clone()).unwrap();

    assert!(engine.is_calibrated());
    assert_eq!(engine.points(), saved.as_slice());
    assert!((params.slope - 0.65).abs() < 1e-12);
    assert_eq!(
        engine.calibration_info().as_deref(),
        Some("Calibrated: a- 0.65,  b- 355.00")
    );
    assert!(matches!(
        drain(&mut events).last(),
        Some(CalibrationEvent::Completed { .. })
    ));
}

#[test]
fn test_restore_rejects_wrong_point_counts() {
    let mut engine = CalibrationEngine::default();

    assert!(engine.restore(Vec::new()).is_err());
    assert_uncalibrated(&engine);

    assert!(engine
        .restore(vec![CalibrationPoint::labeled(100.0, 420.0)])
        .is_err());
    assert_uncalibrated(&engine);

    assert!(engine
        .restore(vec![
            CalibrationPoint::new(100.0),
            CalibrationPoint::labeled(500.0, 680.0),
        ])
        .is_err());
    assert_uncalibrated(&engine);
    assert!(engine.points().is_empty());
}
