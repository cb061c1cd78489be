//! The tick loop body: read, evaluate, actuate.
//!
//! `Controller::step` performs exactly one control tick:
//! 1. enforce the runtime cap,
//! 2. read the thermocouple once,
//! 3. advance the profile state machine,
//! 4. drive the heaters across the six sub-slices.
//!
//! After a terminal status the controller forces both heaters off once and
//! never actuates again.

use std::sync::Arc;
use std::time::Instant;

use reflow_traits::{Clock, Heater, Thermocouple};

use crate::config::SafetyCfg;
use crate::error::{AbortReason, Result};
use crate::machine::{OvenState, ProfileMachine, Reading, Step};
use crate::scheduler::{DutyScheduler, SliceStats};
use crate::status::RunStatus;
use crate::telemetry::TickReport;
use crate::util::whole_secs;

/// Everything produced by one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickOutcome {
    pub report: TickReport,
    pub status: RunStatus,
    pub slices: SliceStats,
}

pub struct Controller<T: Thermocouple, H: Heater> {
    pub(crate) thermocouple: T,
    pub(crate) heater: H,
    pub(crate) machine: ProfileMachine,
    pub(crate) scheduler: DutyScheduler,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) safety: SafetyCfg,
    pub(crate) epoch: Instant,
    pub(crate) ticks: u64,
    pub(crate) overruns: u64,
    pub(crate) halted: bool,
}

impl<T: Thermocouple, H: Heater> core::fmt::Debug for Controller<T, H> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = self.machine.state();
        f.debug_struct("Controller")
            .field("stage", &s.stage)
            .field("label", &s.label)
            .field("temperature_c", &s.temperature_c)
            .field("ticks", &self.ticks)
            .field("halted", &self.halted)
            .finish()
    }
}

impl<T: Thermocouple, H: Heater> Controller<T, H> {
    /// Reset per-run state and restart elapsed time. Call before a new run.
    pub fn begin(&mut self) {
        self.epoch = self.clock.now();
        self.machine.reset();
        self.scheduler.invalidate();
        self.ticks = 0;
        self.overruns = 0;
        self.halted = false;
        tracing::info!(
            bands = self.machine.profile().bands().len(),
            max_run_ms = self.safety.max_run_ms,
            "reflow start"
        );
    }

    /// One control tick. Blocks for the tick's sub-slices (about 1 s).
    pub fn step(&mut self) -> Result<TickOutcome> {
        let tick_start = self.clock.now();
        let elapsed_ms = self.clock.ms_since(self.epoch);
        let elapsed_s = whole_secs(elapsed_ms);

        if !self.machine.is_terminal() && elapsed_ms >= self.safety.max_run_ms {
            tracing::error!(elapsed_ms, max_run_ms = self.safety.max_run_ms, "max run time exceeded");
            self.machine.fail_stop(AbortReason::MaxRuntime);
        }

        let step = if self.machine.is_terminal() {
            self.machine.snapshot(elapsed_s)
        } else {
            let reading = Reading::from_sensor(self.thermocouple.read());
            self.ticks += 1;
            self.machine.tick(elapsed_s, reading)
        };
        let Step { report, status } = step;

        if status.is_terminal() {
            self.halt()?;
            return Ok(TickOutcome {
                report,
                status,
                slices: SliceStats::default(),
            });
        }

        let slices = self
            .scheduler
            .run_tick(&mut self.heater, &*self.clock, tick_start, report.levels)?;
        self.overruns += u64::from(slices.overruns);
        Ok(TickOutcome {
            report,
            status,
            slices,
        })
    }

    /// Fail-stop the run from outside the tick (cancel, supervisor).
    pub fn abort(&mut self, reason: AbortReason) -> Result<()> {
        self.machine.fail_stop(reason);
        self.halt()
    }

    /// Force both heaters off (best-effort caller-side cleanup).
    pub fn heaters_off(&mut self) -> Result<()> {
        self.scheduler.force_off(&mut self.heater)
    }

    pub fn state(&self) -> &OvenState {
        self.machine.state()
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Ticks that actually read the sensor.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Sub-slice deadlines missed over the run.
    pub fn overruns(&self) -> u64 {
        self.overruns
    }

    fn halt(&mut self) -> Result<()> {
        if self.halted {
            return Ok(());
        }
        self.halted = true;
        self.scheduler.force_off(&mut self.heater)
    }
}
