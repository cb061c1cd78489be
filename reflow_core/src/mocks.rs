//! Test doubles for driving the controller without hardware.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use reflow_traits::{Channel, Clock, Heater, SimClock, Thermocouple};

use crate::telemetry::{TelemetrySink, TickReport};
use crate::timing::Summary;

/// Replays a fixed sequence of readings; `None` entries are sensor faults.
/// Once the script runs out the last entry repeats.
#[derive(Debug, Clone)]
pub struct ScriptedThermocouple {
    script: VecDeque<Option<f32>>,
    last: Option<f32>,
}

impl ScriptedThermocouple {
    pub fn new(script: impl IntoIterator<Item = Option<f32>>) -> Self {
        Self {
            script: script.into_iter().collect(),
            last: None,
        }
    }

    /// A script with no faults.
    pub fn from_celsius(values: impl IntoIterator<Item = f32>) -> Self {
        Self::new(values.into_iter().map(Some))
    }
}

impl Thermocouple for ScriptedThermocouple {
    fn read(&mut self) -> Result<f32, Box<dyn std::error::Error + Send + Sync>> {
        if let Some(next) = self.script.pop_front() {
            self.last = next;
        }
        self.last.ok_or_else(|| "scripted sensor fault".into())
    }
}

/// One heater write as seen by `RecordingHeater`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaterWrite {
    /// Milliseconds on the attached `SimClock`, if any.
    pub at_ms: Option<u64>,
    pub channel: Channel,
    pub on: bool,
}

/// Heater that records every write into a shared log.
#[derive(Debug, Clone, Default)]
pub struct RecordingHeater {
    log: Arc<Mutex<Vec<HeaterWrite>>>,
    clock: Option<SimClock>,
    fail_after: Option<usize>,
}

impl RecordingHeater {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timestamp writes with `clock`.
    pub fn with_clock(mut self, clock: SimClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Reject every write after the first `n`.
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    /// Handle onto the write log, shareable before the heater is moved away.
    pub fn log(&self) -> Arc<Mutex<Vec<HeaterWrite>>> {
        Arc::clone(&self.log)
    }
}

impl Heater for RecordingHeater {
    fn set(
        &mut self,
        channel: Channel,
        on: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let mut log = self
            .log
            .lock()
            .map_err(|_| std::io::Error::other("heater log poisoned"))?;
        if self.fail_after.is_some_and(|n| log.len() >= n) {
            return Err(Box::new(std::io::Error::other("relay driver not responding")));
        }
        let at_ms = self
            .clock
            .as_ref()
            .map(|c| u64::try_from(c.elapsed().as_millis()).unwrap_or(u64::MAX));
        log.push(HeaterWrite { at_ms, channel, on });
        Ok(())
    }
}

/// Sink that keeps every record for later inspection.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    pub ticks: Vec<TickReport>,
    pub summaries: Vec<Summary>,
}

impl TelemetrySink for RecordingSink {
    fn tick(&mut self, report: &TickReport) {
        self.ticks.push(report.clone());
    }

    fn summary(&mut self, summary: &Summary) {
        self.summaries.push(*summary);
    }
}

/// Convenience: a `SimClock` plus the same clock as the trait object the
/// controller takes.
pub fn sim_clock() -> (SimClock, Arc<dyn Clock + Send + Sync>) {
    let clock = SimClock::new();
    let shared: Arc<dyn Clock + Send + Sync> = Arc::new(clock.clone());
    (clock, shared)
}
