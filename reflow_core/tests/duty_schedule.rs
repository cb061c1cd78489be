use proptest::prelude::*;
use reflow_core::mocks::{HeaterWrite, RecordingHeater};
use reflow_core::scheduler::SLICE_DEADLINES_MS;
use reflow_core::{DutyLevel, DutyScheduler, Levels, SLICES, TICK_MS};
use reflow_traits::{Channel, Clock, SimClock};
use std::time::Duration;

fn writes_for(channel: Channel, log: &[HeaterWrite]) -> Vec<(u64, bool)> {
    log.iter()
        .filter(|w| w.channel == channel)
        .map(|w| (w.at_ms.unwrap_or_default(), w.on))
        .collect()
}

/// Expected writes for one fresh tick at `level`.
fn expected(level: u8) -> Vec<(u64, bool)> {
    match level {
        0 => vec![(0, false)],
        l if l >= SLICES => vec![(0, true)],
        l => vec![(0, true), (SLICE_DEADLINES_MS[usize::from(l) - 1], false)],
    }
}

proptest! {
    #[test]
    fn slice_is_on_iff_level_reaches_it(level in 0u8..=6, slice in 1u8..=6) {
        let l = DutyLevel::new(level).unwrap();
        prop_assert_eq!(l.asserted_at(slice), level >= slice);
        prop_assert_eq!(l.pattern().iter().filter(|on| **on).count(), usize::from(level));
    }

    #[test]
    fn one_tick_emits_only_transitions(top in 0u8..=6, bottom in 0u8..=6) {
        let clock = SimClock::new();
        let heater = RecordingHeater::new().with_clock(clock.clone());
        let log = heater.log();
        let mut heater = heater;
        let mut sched = DutyScheduler::new();
        let levels = Levels::new(DutyLevel::saturating(top), DutyLevel::saturating(bottom));

        let stats = sched.run_tick(&mut heater, &clock, clock.now(), levels).unwrap();
        prop_assert_eq!(stats.overruns, 0);
        prop_assert_eq!(clock.elapsed(), Duration::from_millis(TICK_MS));

        let log = log.lock().unwrap();
        prop_assert_eq!(writes_for(Channel::Top, &log), expected(top));
        prop_assert_eq!(writes_for(Channel::Bottom, &log), expected(bottom));
        prop_assert_eq!(usize::from(stats.writes), log.len());
    }
}

#[test]
fn steady_full_power_writes_once() {
    let clock = SimClock::new();
    let heater = RecordingHeater::new();
    let log = heater.log();
    let mut heater = heater;
    let mut sched = DutyScheduler::new();
    let levels = Levels::new(DutyLevel::FULL, DutyLevel::FULL);
    for _ in 0..5 {
        let start = clock.now();
        sched.run_tick(&mut heater, &clock, start, levels).unwrap();
    }
    // one ON per channel, never repeated
    assert_eq!(log.lock().unwrap().len(), 2);
}

#[test]
fn partial_level_switches_twice_per_tick_after_the_first() {
    let clock = SimClock::new();
    let heater = RecordingHeater::new().with_clock(clock.clone());
    let log = heater.log();
    let mut heater = heater;
    let mut sched = DutyScheduler::new();
    let levels = Levels::new(DutyLevel::saturating(3), DutyLevel::OFF);
    for _ in 0..3 {
        let start = clock.now();
        sched.run_tick(&mut heater, &clock, start, levels).unwrap();
    }
    let top = writes_for(Channel::Top, &log.lock().unwrap());
    assert_eq!(
        top,
        vec![
            (0, true),
            (500, false),
            (1_000, true),
            (1_500, false),
            (2_000, true),
            (2_500, false)
        ]
    );
}

#[test]
fn force_off_rewrites_both_channels() {
    let heater = RecordingHeater::new();
    let log = heater.log();
    let mut heater = heater;
    let mut sched = DutyScheduler::new();
    sched.force_off(&mut heater).unwrap();
    sched.force_off(&mut heater).unwrap();
    assert_eq!(log.lock().unwrap().len(), 4);
    assert_eq!(sched.commanded(Channel::Top), Some(false));
}

#[test]
fn heater_failure_carries_channel_context() {
    let clock = SimClock::new();
    let mut heater = RecordingHeater::new().failing_after(0);
    let mut sched = DutyScheduler::new();
    let err = sched
        .run_tick(&mut heater, &clock, clock.now(), Levels::OFF)
        .unwrap_err();
    assert!(format!("{err}").contains("switching top heater off"));
    assert!(matches!(
        err.downcast_ref::<reflow_core::ReflowError>(),
        Some(reflow_core::ReflowError::Hardware(_))
    ));
}
