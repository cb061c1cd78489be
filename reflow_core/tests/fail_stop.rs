use std::sync::atomic::AtomicBool;

use reflow_core::machine::{LABEL_ERROR, LABEL_OPEN_DOOR, LABEL_READY_DOOR};
use reflow_core::mocks::{RecordingHeater, RecordingSink, ScriptedThermocouple, sim_clock};
use reflow_core::{
    AbortReason, ControllerBuilder, Levels, MilestoneCfg, Profile, ProfileMachine, Reading,
    ReflowError, RunParams, RunStatus, SafetyCfg, Stage, run,
};

fn machine() -> ProfileMachine {
    ProfileMachine::new(
        Profile::default(),
        MilestoneCfg::default(),
        &SafetyCfg::default(),
    )
}

#[test]
fn unknown_stage_code_fail_stops() {
    let mut m = machine();
    m.tick(0, Reading::Celsius(100.0));
    let err = m.load_stage(9).unwrap_err();
    assert_eq!(err, ReflowError::InvalidStage(9));
    assert_eq!(m.state().stage, Stage::Error);
    assert_eq!(m.state().label, LABEL_ERROR);
    assert_eq!(m.state().levels, Levels::OFF);
    assert!(m.is_terminal());

    let s = m.tick(1, Reading::Celsius(100.0));
    assert_eq!(
        s.status,
        RunStatus::Aborted(ReflowError::Abort(AbortReason::InvalidStage))
    );
}

#[test]
fn loading_error_stage_fail_stops_on_next_tick() {
    let mut m = machine();
    assert_eq!(m.load_stage(Stage::Error.code()), Ok(Stage::Error));
    assert!(!m.is_terminal());
    let s = m.tick(0, Reading::Celsius(25.0));
    assert_eq!(
        s.status,
        RunStatus::Aborted(ReflowError::Abort(AbortReason::InvalidStage))
    );
    assert_eq!(s.report.levels, Levels::OFF);
}

#[test]
fn valid_stage_code_resumes_there() {
    let mut m = machine();
    assert_eq!(m.load_stage(Stage::Soak.code()), Ok(Stage::Soak));
    assert_eq!(m.load_stage(Stage::Reflow.code()), Ok(Stage::Reflow));
    // reloading the current stage is not a regression
    assert_eq!(m.load_stage(Stage::Reflow.code()), Ok(Stage::Reflow));
    let s = m.tick(0, Reading::Celsius(100.0));
    // low temperature in Reflow stays in Reflow's first band
    assert_eq!(s.report.stage, Stage::Reflow);
    assert_eq!(s.report.label, "Reflow1");
    assert_eq!(s.status, RunStatus::Running);
}

#[test]
fn stage_regression_fail_stops() {
    let mut m = machine();
    let s = m.tick(0, Reading::Celsius(185.0));
    assert_eq!(s.report.stage, Stage::Reflow);

    let err = m.load_stage(Stage::Preheat.code()).unwrap_err();
    assert_eq!(err, ReflowError::InvalidStage(Stage::Preheat.code()));
    assert_eq!(m.state().stage, Stage::Error);
    assert_eq!(m.state().levels, Levels::OFF);

    let s = m.tick(1, Reading::Celsius(30.0));
    assert_eq!(s.report.stage, Stage::Error);
    assert_eq!(s.report.label, LABEL_ERROR);
    assert_eq!(
        s.status,
        RunStatus::Aborted(ReflowError::Abort(AbortReason::InvalidStage))
    );
}

#[test]
fn load_stage_leaves_a_finished_run_frozen() {
    let mut m = machine();
    m.tick(0, Reading::Celsius(215.0));
    let done = m.tick(1, Reading::Celsius(40.0));
    assert!(matches!(done.status, RunStatus::Complete(_)));
    let before = m.state().clone();

    assert_eq!(m.load_stage(Stage::Preheat.code()), Err(ReflowError::Frozen));
    assert_eq!(m.load_stage(9), Err(ReflowError::Frozen));
    assert_eq!(m.state(), &before);

    let mut stopped = machine();
    stopped.fail_stop(AbortReason::MaxRuntime);
    let before = stopped.state().clone();
    assert_eq!(stopped.load_stage(Stage::Cool.code()), Err(ReflowError::Frozen));
    assert_eq!(stopped.state(), &before);
}

#[test]
fn loaded_cool_stage_opens_the_door_after_eight_ticks() {
    let mut m = machine();
    assert_eq!(m.load_stage(Stage::Cool.code()), Ok(Stage::Cool));
    let labels: Vec<String> = (0..10u64)
        .map(|t| m.tick(t, Reading::Celsius(200.0 - t as f32)).report.label)
        .collect();
    assert_eq!(m.state().milestones.cool_entry_s, Some(0));
    assert!(labels[..8].iter().all(|l| l == LABEL_READY_DOOR));
    assert!(labels[8..].iter().all(|l| l == LABEL_OPEN_DOOR));
}

#[test]
fn fail_stop_is_idempotent_and_first_reason_wins() {
    let mut m = machine();
    m.fail_stop(AbortReason::MaxRuntime);
    m.fail_stop(AbortReason::SensorFault);
    assert_eq!(
        m.state().terminal,
        Some(RunStatus::Aborted(ReflowError::Abort(AbortReason::MaxRuntime)))
    );
}

#[test]
fn max_runtime_aborts_the_run() {
    let (clock, shared) = sim_clock();
    let mut sink = RecordingSink::default();
    let params = RunParams {
        safety: SafetyCfg {
            max_run_ms: 5_000,
            ..SafetyCfg::default()
        },
        ..RunParams::default()
    };
    let err = run(
        ScriptedThermocouple::from_celsius([100.0]),
        RecordingHeater::new(),
        shared,
        params,
        &mut sink,
        None,
    )
    .expect_err("runtime cap");
    assert!(matches!(
        err.downcast_ref::<ReflowError>(),
        Some(ReflowError::Abort(AbortReason::MaxRuntime))
    ));
    assert_eq!(sink.ticks.len(), 6);
    assert_eq!(sink.ticks[5].stage, Stage::Error);
    assert_eq!(clock.elapsed().as_millis(), 5_000);
}

#[test]
fn cancel_flag_stops_before_the_next_tick() {
    let (_clock, shared) = sim_clock();
    let heater = RecordingHeater::new();
    let writes = heater.log();
    let mut sink = RecordingSink::default();
    let cancel = AtomicBool::new(true);
    let err = run(
        ScriptedThermocouple::from_celsius([100.0]),
        heater,
        shared,
        RunParams::default(),
        &mut sink,
        Some(&cancel),
    )
    .expect_err("cancelled");
    assert!(matches!(
        err.downcast_ref::<ReflowError>(),
        Some(ReflowError::Abort(AbortReason::Cancelled))
    ));
    assert!(sink.ticks.is_empty());
    let log = writes.lock().unwrap();
    assert_eq!(log.len(), 2);
    assert!(log.iter().all(|w| !w.on));
}

#[test]
fn no_actuation_after_terminal() {
    let (_clock, shared) = sim_clock();
    let heater = RecordingHeater::new();
    let writes = heater.log();
    let mut ctrl = ControllerBuilder::new()
        .with_thermocouple(ScriptedThermocouple::new([Some(120.0), None]))
        .with_heater(heater)
        .with_safety(SafetyCfg {
            max_consecutive_faults: 1,
            ..SafetyCfg::default()
        })
        .with_clock(shared)
        .build()
        .unwrap();
    ctrl.begin();
    assert_eq!(ctrl.step().unwrap().status, RunStatus::Running);
    let out = ctrl.step().unwrap();
    assert!(out.status.is_terminal());
    assert!(ctrl.is_halted());

    let n = writes.lock().unwrap().len();
    for _ in 0..5 {
        let again = ctrl.step().unwrap();
        assert_eq!(again.status, out.status);
        assert_eq!(again.report.levels, Levels::OFF);
    }
    assert_eq!(writes.lock().unwrap().len(), n);
    assert_eq!(ctrl.ticks(), 2);
}

#[test]
fn heater_error_surfaces_and_run_stops() {
    let (_clock, shared) = sim_clock();
    let mut sink = RecordingSink::default();
    let err = run(
        ScriptedThermocouple::from_celsius([100.0]),
        RecordingHeater::new().failing_after(1),
        shared,
        RunParams::default(),
        &mut sink,
        None,
    )
    .expect_err("heater failure");
    assert!(matches!(
        err.downcast_ref::<ReflowError>(),
        Some(ReflowError::Hardware(_))
    ));
    assert!(sink.ticks.is_empty());
}
