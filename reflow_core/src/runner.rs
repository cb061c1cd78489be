//! Blocking run-to-completion loop.
//!
//! `run` builds a controller from the given capabilities, emits one
//! `TickReport` per tick into the sink and returns once the profile
//! completes or the run aborts. Heaters are forced off on every exit path.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use reflow_traits::{Clock, Heater, Thermocouple};

use crate::builder::ControllerBuilder;
use crate::config::{MilestoneCfg, SafetyCfg};
use crate::controller::Controller;
use crate::error::{AbortReason, ReflowError, Report, Result};
use crate::profile::Profile;
use crate::status::RunStatus;
use crate::telemetry::TelemetrySink;
use crate::timing::Summary;

/// Everything a run needs apart from the hardware.
#[derive(Debug, Clone, Default)]
pub struct RunParams {
    pub profile: Profile,
    pub milestones: MilestoneCfg,
    pub safety: SafetyCfg,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunReport {
    pub summary: Summary,
    /// Ticks that read the sensor.
    pub ticks: u64,
    /// Sub-slice deadlines missed across the run.
    pub overruns: u64,
}

/// Run the profile until completion or abort.
///
/// `cancel` is polled at the start of every tick; once set the run
/// fail-stops with `AbortReason::Cancelled`.
pub fn run<T, H>(
    thermocouple: T,
    heater: H,
    clock: Arc<dyn Clock + Send + Sync>,
    params: RunParams,
    sink: &mut dyn TelemetrySink,
    cancel: Option<&AtomicBool>,
) -> Result<RunReport>
where
    T: Thermocouple,
    H: Heater,
{
    let mut ctrl = ControllerBuilder::new()
        .with_thermocouple(thermocouple)
        .with_heater(heater)
        .with_profile(params.profile)
        .with_milestones(params.milestones)
        .with_safety(params.safety)
        .with_clock(clock)
        .build()?;
    ctrl.begin();

    loop {
        if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
            tracing::warn!(ticks = ctrl.ticks(), "run cancelled");
            return abort(&mut ctrl, ReflowError::Abort(AbortReason::Cancelled));
        }

        let outcome = match ctrl.step() {
            Ok(o) => o,
            Err(e) => {
                if let Err(off) = ctrl.heaters_off() {
                    tracing::error!(error = %off, "heaters off failed after tick error");
                }
                tracing::error!(error = %e, "tick failed");
                return Err(e);
            }
        };
        sink.tick(&outcome.report);

        match outcome.status {
            RunStatus::Running => continue,
            RunStatus::Complete(summary) => {
                sink.summary(&summary);
                tracing::info!(
                    ticks = ctrl.ticks(),
                    overruns = ctrl.overruns(),
                    max_temp_c = summary.max_temperature_c,
                    "reflow complete"
                );
                return Ok(RunReport {
                    summary,
                    ticks: ctrl.ticks(),
                    overruns: ctrl.overruns(),
                });
            }
            RunStatus::Aborted(e) => return abort(&mut ctrl, e),
        }
    }
}

fn abort<T: Thermocouple, H: Heater>(
    ctrl: &mut Controller<T, H>,
    e: ReflowError,
) -> Result<RunReport> {
    if let ReflowError::Abort(reason) = e {
        // Halts once; a no-op if the tick already did.
        if let Err(off) = ctrl.abort(reason) {
            tracing::error!(error = %off, "heaters off failed during abort");
        }
    } else if let Err(off) = ctrl.heaters_off() {
        tracing::error!(error = %off, "heaters off failed during abort");
    }
    tracing::error!(error = %e, ticks = ctrl.ticks(), "reflow aborted");
    Err(Report::new(e))
}
