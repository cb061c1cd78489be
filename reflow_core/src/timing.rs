//! Milestone timestamps and the derived run summary.
//!
//! Each milestone is overwritten on every tick its condition holds, so the
//! stored value is the last tick before the condition became false. Ascending
//! crossings are only tracked while heating; the descending liquidus crossing
//! and the peak are only tracked during Cool.

use crate::config::MilestoneCfg;
use crate::stage::Stage;

/// Elapsed seconds (since run start) at each crossing, `None` until reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Milestones {
    /// Last heating tick at or below `ambient_c`.
    pub ambient_s: Option<u64>,
    /// Last heating tick at or below `soak_c`.
    pub soak_start_s: Option<u64>,
    /// Last heating tick at or below `reflow_c`.
    pub liquidus_rising_s: Option<u64>,
    /// Last Cool tick at or above `reflow_c`.
    pub liquidus_falling_s: Option<u64>,
    /// Tick of the tracked maximum.
    pub peak_s: Option<u64>,
    /// Tick on which Cool was entered.
    pub cool_entry_s: Option<u64>,
}

impl Milestones {
    /// Latch crossings for a valid reading taken at `elapsed_s` in `stage`.
    pub fn observe(&mut self, stage: Stage, elapsed_s: u64, temp_c: f32, cfg: &MilestoneCfg) {
        match stage {
            Stage::Preheat | Stage::Soak | Stage::Reflow => {
                if temp_c <= cfg.ambient_c {
                    self.ambient_s = Some(elapsed_s);
                }
                if temp_c <= cfg.soak_c {
                    self.soak_start_s = Some(elapsed_s);
                }
                if temp_c <= cfg.reflow_c {
                    self.liquidus_rising_s = Some(elapsed_s);
                }
            }
            Stage::Cool => {
                if temp_c >= cfg.reflow_c {
                    self.liquidus_falling_s = Some(elapsed_s);
                }
            }
            Stage::Error => {}
        }
    }

    /// Derive the summary durations. A duration is `None` if any milestone it
    /// depends on is missing or the pair is out of order.
    pub fn summarize(&self, max_temperature_c: f32) -> Summary {
        Summary {
            max_temperature_c,
            peak_time_s: span(self.ambient_s, self.peak_s),
            soak_time_s: span(self.soak_start_s, self.liquidus_rising_s),
            reflow_time_s: span(self.liquidus_rising_s, self.liquidus_falling_s),
        }
    }
}

#[inline]
fn span(from: Option<u64>, to: Option<u64>) -> Option<u64> {
    to?.checked_sub(from?)
}

/// Terminal report emitted once when Cool completes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub max_temperature_c: f32,
    /// Peak timestamp minus last time at ambient.
    pub peak_time_s: Option<u64>,
    /// Time between the soak and liquidus crossings on the way up.
    pub soak_time_s: Option<u64>,
    /// Time above liquidus.
    pub reflow_time_s: Option<u64>,
}
