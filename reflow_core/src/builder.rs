//! Type-state builder for `Controller`.
//!
//! The builder enforces at compile time that a thermocouple and a heater are
//! provided before `build()` is available.

use std::sync::Arc;

use reflow_traits::clock::{Clock, MonotonicClock};
use reflow_traits::{Heater, Thermocouple};

use crate::config::{CoolCfg, MilestoneCfg, SafetyCfg};
use crate::controller::Controller;
use crate::error::{BuildError, Result};
use crate::machine::ProfileMachine;
use crate::profile::{BandRow, Profile};
use crate::scheduler::DutyScheduler;

/// Placeholder for a capability not yet supplied.
#[derive(Debug, Default)]
pub struct Missing;

impl ControllerBuilder<Missing, Missing> {
    /// Start building a controller.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Builder for `Controller`. All fields are validated on `build()`.
pub struct ControllerBuilder<T, H> {
    thermocouple: T,
    heater: H,
    profile: Option<Profile>,
    rows: Option<(Vec<BandRow>, CoolCfg)>,
    milestones: Option<MilestoneCfg>,
    safety: Option<SafetyCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
}

impl Default for ControllerBuilder<Missing, Missing> {
    fn default() -> Self {
        Self {
            thermocouple: Missing,
            heater: Missing,
            profile: None,
            rows: None,
            milestones: None,
            safety: None,
            clock: None,
        }
    }
}

impl<T, H> ControllerBuilder<T, H> {
    pub fn with_thermocouple<T2: Thermocouple>(self, thermocouple: T2) -> ControllerBuilder<T2, H> {
        ControllerBuilder {
            thermocouple,
            heater: self.heater,
            profile: self.profile,
            rows: self.rows,
            milestones: self.milestones,
            safety: self.safety,
            clock: self.clock,
        }
    }

    pub fn with_heater<H2: Heater>(self, heater: H2) -> ControllerBuilder<T, H2> {
        ControllerBuilder {
            thermocouple: self.thermocouple,
            heater,
            profile: self.profile,
            rows: self.rows,
            milestones: self.milestones,
            safety: self.safety,
            clock: self.clock,
        }
    }

    /// Use an already validated profile.
    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self.rows = None;
        self
    }

    /// Use raw band rows; validated against the safety limits on `build()`.
    pub fn with_bands(mut self, rows: Vec<BandRow>, cool: CoolCfg) -> Self {
        self.rows = Some((rows, cool));
        self.profile = None;
        self
    }

    pub fn with_milestones(mut self, milestones: MilestoneCfg) -> Self {
        self.milestones = Some(milestones);
        self
    }

    pub fn with_safety(mut self, safety: SafetyCfg) -> Self {
        self.safety = Some(safety);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }
}

impl<T: Thermocouple, H: Heater> ControllerBuilder<T, H> {
    pub fn build(self) -> Result<Controller<T, H>> {
        let safety = self.safety.unwrap_or_default();
        if safety.max_run_ms == 0 {
            return Err(eyre::Report::new(BuildError::InvalidConfig(
                "max_run_ms must be > 0",
            )));
        }
        let profile = match (self.profile, self.rows) {
            (Some(p), _) => {
                if p.max_top_level().get() > safety.top_level_limit {
                    return Err(eyre::Report::new(BuildError::InvalidConfig(
                        "profile top level exceeds safety.top_level_limit",
                    )));
                }
                p
            }
            (None, Some((rows, cool))) => Profile::new(rows, cool, safety.top_level_limit)?,
            (None, None) => Profile::default(),
        };
        let milestones = self.milestones.unwrap_or_default();
        let clock: Arc<dyn Clock + Send + Sync> = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let epoch = clock.now();
        Ok(Controller {
            thermocouple: self.thermocouple,
            heater: self.heater,
            machine: ProfileMachine::new(profile, milestones, &safety),
            scheduler: DutyScheduler::new(),
            clock,
            safety,
            epoch,
            ticks: 0,
            overruns: 0,
            halted: false,
        })
    }
}
