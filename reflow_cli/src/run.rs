//! Config mapping, backend assembly and profile execution.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use eyre::WrapErr;
use reflow_config::Config;
use reflow_core::error::{AbortReason, ReflowError, Result as CoreResult};
use reflow_core::machine::Reading;
use reflow_core::{
    Levels, Profile, RunParams, RunReport, SafetyCfg, Summary, TelemetrySink, TickReport,
    TracingSink,
};
use reflow_traits::{Clock, Heater, MonotonicClock, SimClock, Thermocouple};

use crate::cli::{CliSafety, LAST_SAFETY, RtLock};
use crate::rt::setup_rt_once;

/// Test hook: the simulated thermocouple faults after this many good reads.
pub const SIM_FAULT_AFTER_ENV: &str = "REFLOW_TEST_SIM_FAULT_AFTER";

pub struct RunOpts {
    pub max_run_ms: Option<u64>,
    pub sim_clock: bool,
    pub stats: bool,
    pub rt: bool,
    pub rt_prio: Option<i32>,
    pub rt_lock: RtLock,
    pub json: bool,
}

type Backend = (Box<dyn Thermocouple>, Box<dyn Heater>, &'static str);

/// Build the thermocouple/heater pair: GPIO + MAX6675 when compiled with
/// `hardware` and `[pins]` is present, otherwise the simulated oven.
#[cfg_attr(not(feature = "hardware"), allow(unused_variables))]
fn assemble(cfg: &Config, clock: &Arc<dyn Clock + Send + Sync>, sim_clock: bool) -> CoreResult<Backend> {
    #[cfg(feature = "hardware")]
    if let Some(pins) = &cfg.pins {
        if sim_clock {
            eyre::bail!("--sim-clock needs the simulated backend; remove [pins] from the config");
        }
        let tc = reflow_hardware::hardware::HardwareThermocouple::try_new(pins.spi_bus, pins.spi_cs)
            .wrap_err("open max6675")?;
        let heater = reflow_hardware::hardware::GpioHeater::try_new(pins.heater_top, pins.heater_bottom)
            .wrap_err("open heater pins")?;
        return Ok((Box::new(tc), Box::new(heater), "hardware"));
    }

    let s = &cfg.sim;
    let params = reflow_hardware::ThermalParams {
        ambient_c: s.ambient_c,
        top_gain_c_per_s: s.top_gain_c_per_s,
        bottom_gain_c_per_s: s.bottom_gain_c_per_s,
        loss_per_s: s.loss_per_s,
    };
    let mut oven = reflow_hardware::SimulatedOven::new(params, Arc::clone(clock));
    if let Ok(v) = std::env::var(SIM_FAULT_AFTER_ENV) {
        let n: u64 = v
            .trim()
            .parse()
            .wrap_err_with(|| format!("{SIM_FAULT_AFTER_ENV} must be an integer, got {v:?}"))?;
        oven = oven.with_fault_after(n);
    }
    let (tc, heater) = oven.split();
    Ok((Box::new(tc), Box::new(heater), "sim"))
}

fn make_clock(sim_clock: bool) -> Arc<dyn Clock + Send + Sync> {
    if sim_clock {
        Arc::new(SimClock::new())
    } else {
        Arc::new(MonotonicClock::new())
    }
}

/// Prints tick and summary records to stdout and mirrors them into the log.
pub struct ConsoleSink {
    json: bool,
    log: TracingSink,
    fault_ticks: u64,
    min_temp_c: Option<f32>,
    duty: DutyTotals,
}

/// Running duty-cycle totals per channel over the reported ticks.
#[derive(Debug, Default, Clone, Copy)]
struct DutyTotals {
    ticks: u64,
    top: f32,
    bottom: f32,
}

impl DutyTotals {
    fn add(&mut self, levels: Levels) {
        self.ticks += 1;
        self.top += levels.top.ratio();
        self.bottom += levels.bottom.ratio();
    }

    /// Mean on-fraction as `(top, bottom)`, `None` before any tick.
    fn mean(&self) -> Option<(f32, f32)> {
        (self.ticks > 0).then(|| {
            let n = self.ticks as f32;
            (self.top / n, self.bottom / n)
        })
    }
}

impl ConsoleSink {
    pub fn new(json: bool) -> Self {
        Self {
            json,
            log: TracingSink,
            fault_ticks: 0,
            min_temp_c: None,
            duty: DutyTotals::default(),
        }
    }
}

impl TelemetrySink for ConsoleSink {
    fn tick(&mut self, r: &TickReport) {
        self.log.tick(r);
        self.duty.add(r.levels);
        if r.fault.is_some() {
            self.fault_ticks += 1;
        }
        if let Some(t) = r.temperature_c {
            self.min_temp_c = Some(self.min_temp_c.map_or(t, |m| m.min(t)));
        }
        if self.json {
            let line = serde_json::json!({
                "elapsed_s": r.elapsed_s,
                "temp_c": r.temperature_c,
                "stage": r.stage.name(),
                "label": r.label,
                "top": r.levels.top.get(),
                "bottom": r.levels.bottom.get(),
                "cooling_rate_c": r.cooling_rate_c,
                "fault": r.fault,
            });
            println!("{line}");
            return;
        }
        let temp = r
            .temperature_c
            .map_or_else(|| "   --.--".to_string(), |t| format!("{t:8.2}"));
        let mut line = format!(
            "t={:>4}s  T={temp} C  {:<8} {:<11} top={}/6 bottom={}/6",
            r.elapsed_s,
            r.stage.name(),
            r.label,
            r.levels.top.get(),
            r.levels.bottom.get()
        );
        if let Some(rate) = r.cooling_rate_c {
            line.push_str(&format!("  rate={rate:+.2} C/s"));
        }
        if let Some(fault) = &r.fault {
            line.push_str(&format!("  fault: {fault}"));
        }
        println!("{line}");
    }

    fn summary(&mut self, s: &Summary) {
        self.log.summary(s);
        if self.json {
            let line = serde_json::json!({
                "summary": {
                    "max_temp_c": s.max_temperature_c,
                    "peak_time_s": s.peak_time_s,
                    "soak_time_s": s.soak_time_s,
                    "reflow_time_s": s.reflow_time_s,
                }
            });
            println!("{line}");
            return;
        }
        let secs = |v: Option<u64>| v.map_or_else(|| "n/a".to_string(), |s| format!("{s} s"));
        println!(
            "Reflow complete: max {:.2} C, peak time {}, soak time {}, time above liquidus {}",
            s.max_temperature_c,
            secs(s.peak_time_s),
            secs(s.soak_time_s),
            secs(s.reflow_time_s)
        );
    }
}

fn effective_safety(cfg: &Config, max_run_ms: Option<u64>) -> SafetyCfg {
    let mut safety = SafetyCfg::from(&cfg.safety);
    if let Some(ms) = max_run_ms {
        safety.max_run_ms = ms;
    }
    let _ = LAST_SAFETY.set(CliSafety {
        max_run_ms: safety.max_run_ms,
        max_consecutive_faults: safety.max_consecutive_faults,
    });
    safety
}

pub fn run_profile(cfg: &Config, opts: &RunOpts, shutdown: &AtomicBool) -> CoreResult<RunReport> {
    if opts.rt {
        setup_rt_once(opts.rt_prio, opts.rt_lock);
    }

    let safety = effective_safety(cfg, opts.max_run_ms);
    let profile = Profile::try_from(cfg)?;
    let clock = make_clock(opts.sim_clock);
    let (tc, heater, backend) = assemble(cfg, &clock, opts.sim_clock)?;
    tracing::info!(
        backend,
        sim_clock = opts.sim_clock,
        max_run_ms = safety.max_run_ms,
        "reflow run"
    );

    let mut sink = ConsoleSink::new(opts.json);
    let params = RunParams {
        profile,
        safety,
        ..RunParams::default()
    };
    let result = reflow_core::run(tc, heater, clock, params, &mut sink, Some(shutdown));

    if opts.stats {
        print_stats(&sink, result.as_ref().ok());
    }
    result
}

/// Print tick stats to stderr.
fn print_stats(sink: &ConsoleSink, report: Option<&RunReport>) {
    eprintln!("\n--- Reflow Stats ---");
    match report {
        Some(r) => {
            eprintln!("Ticks: {}", r.ticks);
            eprintln!("Sub-slice overruns: {}", r.overruns);
        }
        None => eprintln!("Run aborted; tick counters unavailable"),
    }
    eprintln!("Fault ticks: {}", sink.fault_ticks);
    if let Some((top, bottom)) = sink.duty.mean() {
        eprintln!(
            "Mean duty: top {:.1}%, bottom {:.1}%",
            top * 100.0,
            bottom * 100.0
        );
    }
    if let Some(t) = sink.min_temp_c {
        eprintln!("Lowest reading: {t:.2} C");
    }
    eprintln!("--------------------\n");
}

/// Validate the config, build the profile and take one reading.
pub fn self_check(cfg: &Config, json: bool) -> CoreResult<()> {
    let profile = Profile::try_from(cfg)?;
    let clock = make_clock(false);
    let (mut tc, mut heater, backend) = assemble(cfg, &clock, false)?;
    for ch in reflow_traits::Channel::ALL {
        heater
            .set(ch, false)
            .map_err(|e| eyre::Report::new(ReflowError::Hardware(e.to_string())))
            .wrap_err_with(|| format!("switching {} heater off", ch.name()))?;
    }
    match Reading::from_sensor(tc.read()) {
        Reading::Celsius(t) => {
            if json {
                println!(
                    "{}",
                    serde_json::json!({
                        "self_check": "ok",
                        "backend": backend,
                        "temp_c": t,
                        "bands": profile.bands().len(),
                    })
                );
            } else {
                println!(
                    "Self-check OK: backend={backend}, thermocouple {t:.2} C, {} bands",
                    profile.bands().len()
                );
            }
            Ok(())
        }
        Reading::Fault(msg) => Err(eyre::Report::new(ReflowError::Abort(AbortReason::SensorFault)))
            .wrap_err(format!("self-check: thermocouple read failed: {msg}")),
    }
}

/// Print the effective band table, as JSON or as pasteable TOML.
pub fn print_profile(cfg: &Config, json: bool) -> CoreResult<()> {
    let profile = Profile::try_from(cfg)?;
    if json {
        let bands: Vec<_> = profile
            .bands()
            .iter()
            .map(|b| {
                serde_json::json!({
                    "stage": b.stage.name(),
                    "upper_c": b.upper_c,
                    "top": b.levels.top.get(),
                    "bottom": b.levels.bottom.get(),
                    "label": b.label,
                })
            })
            .collect();
        let cool = profile.cool();
        println!(
            "{}",
            serde_json::json!({
                "bands": bands,
                "cool": {
                    "complete_at_c": cool.complete_at_c,
                    "door_open_after_s": cool.door_open_after_s,
                }
            })
        );
        return Ok(());
    }

    let mut bands = toml::value::Array::new();
    for b in profile.bands() {
        let mut t = toml::Table::new();
        t.insert("stage".into(), b.stage.name().into());
        t.insert("upper_c".into(), f64::from(b.upper_c).into());
        t.insert("top".into(), i64::from(b.levels.top.get()).into());
        t.insert("bottom".into(), i64::from(b.levels.bottom.get()).into());
        t.insert("label".into(), b.label.clone().into());
        bands.push(toml::Value::Table(t));
    }
    let mut section = toml::Table::new();
    section.insert("bands".into(), toml::Value::Array(bands));
    let mut cool = toml::Table::new();
    cool.insert("complete_at_c".into(), f64::from(profile.cool().complete_at_c).into());
    cool.insert(
        "door_open_after_s".into(),
        i64::try_from(profile.cool().door_open_after_s)
            .unwrap_or(i64::MAX)
            .into(),
    );
    let mut root = toml::Table::new();
    root.insert("profile".into(), toml::Value::Table(section));
    root.insert("cool".into(), toml::Value::Table(cool));
    let text = toml::to_string(&root).wrap_err("render profile")?;
    print!("{text}");
    Ok(())
}
