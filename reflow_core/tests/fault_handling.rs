use reflow_core::machine::{LABEL_ERROR, LABEL_SENSOR_FAULT};
use reflow_core::mocks::{RecordingHeater, RecordingSink, ScriptedThermocouple, sim_clock};
use reflow_core::{
    AbortReason, Levels, MilestoneCfg, Profile, ProfileMachine, Reading, ReflowError, RunParams,
    RunStatus, SafetyCfg, Stage, run,
};
use rstest::rstest;

fn machine(max_consecutive_faults: u32) -> ProfileMachine {
    let safety = SafetyCfg {
        max_consecutive_faults,
        ..SafetyCfg::default()
    };
    ProfileMachine::new(Profile::default(), MilestoneCfg::default(), &safety)
}

fn fault() -> Reading {
    Reading::Fault("thermocouple open circuit".into())
}

#[test]
fn fault_tick_holds_heaters_off_and_keeps_stage() {
    let mut m = machine(3);
    m.tick(0, Reading::Celsius(160.0));
    let before = m.state().milestones;

    let s = m.tick(1, fault());
    assert_eq!(s.status, RunStatus::Running);
    assert_eq!(s.report.stage, Stage::Soak);
    assert_eq!(s.report.label, LABEL_SENSOR_FAULT);
    assert_eq!(s.report.levels, Levels::OFF);
    assert_eq!(s.report.temperature_c, None);
    assert_eq!(s.report.fault.as_deref(), Some("thermocouple open circuit"));
    assert_eq!(m.state().milestones, before);
}

#[test]
fn valid_reading_resumes_and_resets_the_counter() {
    let mut m = machine(3);
    m.tick(0, Reading::Celsius(160.0));
    m.tick(1, fault());
    m.tick(2, fault());
    let s = m.tick(3, Reading::Celsius(165.0));
    assert_eq!(s.report.label, "Soak2");
    assert_eq!(m.state().consecutive_faults, 0);
    // two more faults are tolerated again
    m.tick(4, fault());
    assert_eq!(m.tick(5, fault()).status, RunStatus::Running);
}

#[rstest]
#[case(1)]
#[case(3)]
#[case(5)]
fn consecutive_faults_trip_fail_stop(#[case] limit: u32) {
    let mut m = machine(limit);
    m.tick(0, Reading::Celsius(120.0));
    for t in 1..u64::from(limit) {
        assert_eq!(m.tick(t, fault()).status, RunStatus::Running);
    }
    let s = m.tick(u64::from(limit), fault());
    assert_eq!(
        s.status,
        RunStatus::Aborted(ReflowError::Abort(AbortReason::SensorFault))
    );
    assert_eq!(s.report.stage, Stage::Error);
    assert_eq!(s.report.label, LABEL_ERROR);
    assert_eq!(s.report.levels, Levels::OFF);
}

#[test]
fn zero_limit_never_trips() {
    let mut m = machine(0);
    for t in 0..50 {
        assert_eq!(m.tick(t, fault()).status, RunStatus::Running);
    }
}

#[test]
fn fault_before_first_reading_stays_in_preheat() {
    let mut m = machine(3);
    let s = m.tick(0, fault());
    assert_eq!(s.report.stage, Stage::Preheat);
    assert_eq!(m.state().max_temperature_c, 30.0);
    assert_eq!(m.state().milestones.ambient_s, None);
}

#[test]
fn runner_reports_sensor_fault_abort_with_heaters_off() {
    let (_clock, shared) = sim_clock();
    let heater = RecordingHeater::new();
    let writes = heater.log();
    let mut sink = RecordingSink::default();
    let tc = ScriptedThermocouple::new([Some(120.0), Some(125.0), None]);

    let err = run(tc, heater, shared, RunParams::default(), &mut sink, None)
        .expect_err("sensor fault must abort");
    assert!(matches!(
        err.downcast_ref::<ReflowError>(),
        Some(ReflowError::Abort(AbortReason::SensorFault))
    ));

    // two good ticks, two held fault ticks, then the tripping tick
    let labels: Vec<&str> = sink.ticks.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(
        labels,
        ["Preheat3", "Preheat3", LABEL_SENSOR_FAULT, LABEL_SENSOR_FAULT, LABEL_ERROR]
    );
    let log = writes.lock().unwrap();
    let tail: Vec<bool> = log.iter().rev().take(2).map(|w| w.on).collect();
    assert_eq!(tail, [false, false]);
    assert!(sink.summaries.is_empty());
}
