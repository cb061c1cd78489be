use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};
use reflow_core::mocks::{ScriptedThermocouple, sim_clock};
use reflow_core::{
    DutyLevel, DutyScheduler, Levels, MilestoneCfg, NullSink, Profile, ProfileMachine, Reading,
    RunParams, SafetyCfg, run,
};
use reflow_traits::{Channel, Clock, Heater, SimClock};

struct NullHeater;

impl Heater for NullHeater {
    fn set(
        &mut self,
        _channel: Channel,
        _on: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Ok(())
    }
}

// Heat to 215 C at 2 C per tick, then cool at 1 C per tick down to 50 C.
fn synth_trace() -> Vec<f32> {
    let mut v = Vec::new();
    let mut t = 25.0f32;
    while t < 215.0 {
        v.push(t);
        t += 2.0;
    }
    while t > 49.0 {
        v.push(t);
        t -= 1.0;
    }
    v
}

fn bench_machine(c: &mut Criterion) {
    let trace = synth_trace();
    c.bench_function("machine_full_profile", |b| {
        b.iter_batched(
            || {
                ProfileMachine::new(
                    Profile::default(),
                    MilestoneCfg::default(),
                    &SafetyCfg::default(),
                )
            },
            |mut m| {
                for (i, &t) in trace.iter().enumerate() {
                    let step = m.tick(i as u64, Reading::Celsius(black_box(t)));
                    if step.status.is_terminal() {
                        break;
                    }
                }
                m
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_scheduler(c: &mut Criterion) {
    let levels = Levels::new(DutyLevel::saturating(3), DutyLevel::saturating(5));
    c.bench_function("scheduler_tick_sim_clock", |b| {
        let clock = SimClock::new();
        let mut heater = NullHeater;
        let mut sched = DutyScheduler::new();
        b.iter(|| {
            let start = clock.now();
            sched
                .run_tick(&mut heater, &clock, start, black_box(levels))
                .ok()
        })
    });
}

fn bench_run(c: &mut Criterion) {
    let trace = synth_trace();
    c.bench_function("run_scripted_profile_virtual_time", |b| {
        b.iter(|| {
            let (_, clock) = sim_clock();
            let tc = ScriptedThermocouple::from_celsius(trace.iter().copied());
            run(tc, NullHeater, clock, RunParams::default(), &mut NullSink, None).ok()
        })
    });
}

criterion_group!(benches, bench_machine, bench_scheduler, bench_run);
criterion_main!(benches);
