//! The profile state machine.
//!
//! `ProfileMachine` owns the single `OvenState` record and advances it once per
//! tick from one `Reading`. It decides stage transitions, duty levels and the
//! sub-phase label, feeds the timing recorder, and freezes the state on
//! completion or fail-stop. It performs no I/O; the controller handles that.

use crate::config::{MilestoneCfg, SafetyCfg};
use crate::duty::Levels;
use crate::error::{AbortReason, ReflowError};
use crate::hw_error::fault_message;
use crate::profile::Profile;
use crate::stage::Stage;
use crate::status::RunStatus;
use crate::telemetry::TickReport;
use crate::timing::{Milestones, Summary};

pub const LABEL_READY_DOOR: &str = "ReadyDoor";
pub const LABEL_OPEN_DOOR: &str = "OpenDoor";
pub const LABEL_COMPLETE: &str = "Complete";
pub const LABEL_ERROR: &str = "Error";
pub const LABEL_SENSOR_FAULT: &str = "SensorFault";
pub const LABEL_IDLE: &str = "Idle";

/// One temperature sample. A fault is never comparable with thresholds.
#[derive(Debug, Clone, PartialEq)]
pub enum Reading {
    Celsius(f32),
    Fault(String),
}

impl Reading {
    /// Classify a thermocouple result. Non-finite values count as faults.
    pub fn from_sensor(r: Result<f32, Box<dyn std::error::Error + Send + Sync>>) -> Self {
        match r {
            Ok(t) if t.is_finite() => Reading::Celsius(t),
            Ok(t) => Reading::Fault(format!("non-finite reading {t}")),
            Err(e) => Reading::Fault(fault_message(&*e)),
        }
    }

    pub fn celsius(&self) -> Option<f32> {
        match self {
            Reading::Celsius(t) => Some(*t),
            Reading::Fault(_) => None,
        }
    }
}

/// The single mutable record of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct OvenState {
    pub stage: Stage,
    pub levels: Levels,
    pub label: String,
    pub temperature_c: Option<f32>,
    pub previous_temperature_c: Option<f32>,
    pub max_temperature_c: f32,
    pub milestones: Milestones,
    pub summary: Option<Summary>,
    pub consecutive_faults: u32,
    /// Set once; the state is frozen afterwards.
    pub terminal: Option<RunStatus>,
}

impl OvenState {
    pub fn new(max_temp_init_c: f32) -> Self {
        Self {
            stage: Stage::Preheat,
            levels: Levels::OFF,
            label: LABEL_IDLE.to_string(),
            temperature_c: None,
            previous_temperature_c: None,
            max_temperature_c: max_temp_init_c,
            milestones: Milestones::default(),
            summary: None,
            consecutive_faults: 0,
            terminal: None,
        }
    }
}

/// Result of one state-machine tick.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub report: TickReport,
    pub status: RunStatus,
}

#[derive(Debug, Clone)]
pub struct ProfileMachine {
    profile: Profile,
    milestones: MilestoneCfg,
    max_consecutive_faults: u32,
    state: OvenState,
}

impl ProfileMachine {
    pub fn new(profile: Profile, milestones: MilestoneCfg, safety: &SafetyCfg) -> Self {
        let state = OvenState::new(milestones.max_temp_init_c);
        Self {
            profile,
            milestones,
            max_consecutive_faults: safety.max_consecutive_faults,
            state,
        }
    }

    pub fn state(&self) -> &OvenState {
        &self.state
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    pub fn is_terminal(&self) -> bool {
        self.state.terminal.is_some()
    }

    /// Report the current state without advancing it.
    pub fn snapshot(&self, elapsed_s: u64) -> Step {
        let status = self.state.terminal.clone().unwrap_or(RunStatus::Running);
        self.step(elapsed_s, None, None, status)
    }

    /// Drop back to a fresh run. Call before starting a new profile.
    pub fn reset(&mut self) {
        self.state = OvenState::new(self.milestones.max_temp_init_c);
    }

    /// Advance the run by one tick taken at `elapsed_s`.
    ///
    /// Once terminal, the state is frozen and every call reports the frozen
    /// state with both channels off.
    pub fn tick(&mut self, elapsed_s: u64, reading: Reading) -> Step {
        if self.is_terminal() {
            return self.snapshot(elapsed_s);
        }
        if self.state.stage == Stage::Error {
            self.fail_stop(AbortReason::InvalidStage);
            return self.snapshot(elapsed_s);
        }
        match reading {
            Reading::Fault(msg) => self.on_fault(elapsed_s, msg),
            Reading::Celsius(t) => self.on_reading(elapsed_s, t),
        }
    }

    /// Load a stage from its wire code.
    ///
    /// Stages only move forward. An unknown code, or one that maps below the
    /// current stage, is state corruption: the machine fail-stops on the spot
    /// (both channels off, label `Error`) and an error is returned. A frozen
    /// machine is left untouched.
    pub fn load_stage(&mut self, code: u8) -> Result<Stage, ReflowError> {
        if self.is_terminal() {
            return Err(ReflowError::Frozen);
        }
        match Stage::try_from(code) {
            Ok(stage) if stage >= self.state.stage => {
                self.state.stage = stage;
                Ok(stage)
            }
            Ok(stage) => {
                tracing::error!(code, from = %self.state.stage, to = %stage, "stage regression; fail-stop");
                self.fail_stop(AbortReason::InvalidStage);
                Err(ReflowError::InvalidStage(code))
            }
            Err(e) => {
                tracing::error!(code, "invalid stage code; fail-stop");
                self.fail_stop(AbortReason::InvalidStage);
                Err(e)
            }
        }
    }

    /// Enter the `Error` stage and freeze. No-op when already terminal.
    pub fn fail_stop(&mut self, reason: AbortReason) {
        if self.is_terminal() {
            return;
        }
        tracing::error!(stage = %self.state.stage, %reason, "fail-stop");
        self.state.stage = Stage::Error;
        self.state.levels = Levels::OFF;
        self.state.label = LABEL_ERROR.to_string();
        self.state.terminal = Some(RunStatus::Aborted(ReflowError::Abort(reason)));
    }

    fn on_fault(&mut self, elapsed_s: u64, msg: String) -> Step {
        self.state.consecutive_faults = self.state.consecutive_faults.saturating_add(1);
        tracing::warn!(
            elapsed_s,
            consecutive = self.state.consecutive_faults,
            fault = %msg,
            "sensor fault; heaters held off"
        );
        if self.max_consecutive_faults > 0
            && self.state.consecutive_faults >= self.max_consecutive_faults
        {
            self.fail_stop(AbortReason::SensorFault);
        } else {
            self.state.levels = Levels::OFF;
            self.state.label = LABEL_SENSOR_FAULT.to_string();
        }
        let status = self.state.terminal.clone().unwrap_or(RunStatus::Running);
        self.step(elapsed_s, None, Some(msg), status)
    }

    fn on_reading(&mut self, elapsed_s: u64, t: f32) -> Step {
        self.state.consecutive_faults = 0;
        self.state.previous_temperature_c = self.state.temperature_c;
        self.state.temperature_c = Some(t);

        let cooling_rate = self.evaluate(elapsed_s, t);
        if !self.is_terminal() {
            self.state
                .milestones
                .observe(self.state.stage, elapsed_s, t, &self.milestones);
        }
        let status = self.state.terminal.clone().unwrap_or(RunStatus::Running);
        self.step(elapsed_s, cooling_rate, None, status)
    }

    /// Apply the stage table for `t`, advancing through as many stages as the
    /// reading clears. Returns the cooling rate when the door advisory is open.
    fn evaluate(&mut self, elapsed_s: u64, t: f32) -> Option<f32> {
        loop {
            match self.state.stage {
                stage @ (Stage::Preheat | Stage::Soak | Stage::Reflow) => {
                    if let Some(band) = self.profile.band_for(stage, t) {
                        self.state.levels = band.levels;
                        self.state.label.clone_from(&band.label);
                        return None;
                    }
                    let Some(next) = stage.next() else {
                        return None;
                    };
                    if next == Stage::Cool {
                        self.state.milestones.cool_entry_s = Some(elapsed_s);
                    }
                    tracing::info!(from = %stage, to = %next, temp_c = t, elapsed_s, "stage advance");
                    self.state.stage = next;
                }
                Stage::Cool => return self.evaluate_cool(elapsed_s, t),
                Stage::Error => {
                    self.fail_stop(AbortReason::InvalidStage);
                    return None;
                }
            }
        }
    }

    fn evaluate_cool(&mut self, elapsed_s: u64, t: f32) -> Option<f32> {
        self.state.levels = Levels::OFF;
        // Cool loaded directly: entry is the first Cool tick.
        let entry = *self.state.milestones.cool_entry_s.get_or_insert(elapsed_s);
        let cool = self.profile.cool();
        if t <= cool.complete_at_c {
            let summary = self
                .state
                .milestones
                .summarize(self.state.max_temperature_c);
            tracing::info!(elapsed_s, temp_c = t, "cool complete");
            self.state.summary = Some(summary);
            self.state.label = LABEL_COMPLETE.to_string();
            self.state.terminal = Some(RunStatus::Complete(summary));
            return None;
        }
        if t > self.state.max_temperature_c {
            self.state.max_temperature_c = t;
            self.state.milestones.peak_s = Some(elapsed_s);
        }
        let since_entry = elapsed_s.saturating_sub(entry);
        if since_entry >= cool.door_open_after_s {
            self.state.label = LABEL_OPEN_DOOR.to_string();
            self.state.previous_temperature_c.map(|prev| t - prev)
        } else {
            self.state.label = LABEL_READY_DOOR.to_string();
            None
        }
    }

    fn step(
        &self,
        elapsed_s: u64,
        cooling_rate_c: Option<f32>,
        fault: Option<String>,
        status: RunStatus,
    ) -> Step {
        let levels = if status.is_terminal() {
            Levels::OFF
        } else {
            self.state.levels
        };
        Step {
            report: TickReport {
                elapsed_s,
                temperature_c: if fault.is_some() {
                    None
                } else {
                    self.state.temperature_c
                },
                stage: self.state.stage,
                label: self.state.label.clone(),
                levels,
                cooling_rate_c,
                fault,
            },
            status,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine() -> ProfileMachine {
        ProfileMachine::new(
            Profile::default(),
            MilestoneCfg::default(),
            &SafetyCfg::default(),
        )
    }

    #[test]
    fn nan_reading_is_a_fault() {
        assert!(matches!(
            Reading::from_sensor(Ok(f32::NAN)),
            Reading::Fault(_)
        ));
        assert_eq!(Reading::from_sensor(Ok(21.5)).celsius(), Some(21.5));
    }

    #[test]
    fn advance_evaluates_new_stage_on_same_tick() {
        let mut m = machine();
        let s = m.tick(0, Reading::Celsius(145.0));
        assert_eq!(s.report.stage, Stage::Soak);
        assert_eq!(s.report.label, "Soak1");
        assert_eq!(s.report.levels.top.get(), 1);
        assert_eq!(s.report.levels.bottom.get(), 4);
    }

    #[test]
    fn reflow_exit_records_cool_entry() {
        let mut m = machine();
        m.tick(0, Reading::Celsius(185.0));
        let s = m.tick(1, Reading::Celsius(213.0));
        assert_eq!(s.report.stage, Stage::Cool);
        assert_eq!(s.report.label, LABEL_READY_DOOR);
        assert_eq!(s.report.levels, Levels::OFF);
        assert_eq!(m.state().milestones.cool_entry_s, Some(1));
    }

    #[test]
    fn frozen_after_completion() {
        let mut m = machine();
        m.tick(0, Reading::Celsius(215.0));
        let done = m.tick(1, Reading::Celsius(40.0));
        assert!(matches!(done.status, RunStatus::Complete(_)));
        let before = m.state().clone();
        let again = m.tick(2, Reading::Celsius(300.0));
        assert_eq!(again.status, done.status);
        assert_eq!(m.state(), &before);
    }
}
