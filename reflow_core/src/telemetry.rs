//! Per-tick status records and the sink that consumes them.

use crate::duty::Levels;
use crate::stage::Stage;
use crate::timing::Summary;

/// Status record emitted once per tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub elapsed_s: u64,
    /// `None` on a sensor-fault tick.
    pub temperature_c: Option<f32>,
    pub stage: Stage,
    pub label: String,
    pub levels: Levels,
    /// °C per tick; only present while the door advisory is "OpenDoor".
    pub cooling_rate_c: Option<f32>,
    /// Sensor fault message on fault ticks.
    pub fault: Option<String>,
}

/// Receiver for tick and summary records (display, log, telemetry link).
pub trait TelemetrySink {
    fn tick(&mut self, report: &TickReport);
    fn summary(&mut self, summary: &Summary);
}

/// Sink that forwards records to `tracing`: ticks at debug (warn on faults),
/// the summary at info.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl TelemetrySink for TracingSink {
    fn tick(&mut self, r: &TickReport) {
        match (&r.fault, r.temperature_c) {
            (Some(fault), _) => tracing::warn!(
                elapsed_s = r.elapsed_s,
                stage = %r.stage,
                label = %r.label,
                fault = %fault,
                "tick"
            ),
            (None, temp_c) => tracing::debug!(
                elapsed_s = r.elapsed_s,
                temp_c = temp_c.unwrap_or(f32::NAN),
                stage = %r.stage,
                label = %r.label,
                top = r.levels.top.get(),
                bottom = r.levels.bottom.get(),
                cooling_rate_c = r.cooling_rate_c,
                "tick"
            ),
        }
    }

    fn summary(&mut self, s: &Summary) {
        tracing::info!(
            max_temp_c = s.max_temperature_c,
            peak_time_s = s.peak_time_s,
            soak_time_s = s.soak_time_s,
            reflow_time_s = s.reflow_time_s,
            "profile complete"
        );
    }
}

/// Sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl TelemetrySink for NullSink {
    fn tick(&mut self, _report: &TickReport) {}
    fn summary(&mut self, _summary: &Summary) {}
}
