//! Time-sliced duty-cycle scheduler.
//!
//! A tick is split into six sub-slices ending at fixed offsets from tick
//! start. At the start of sub-slice `i` each channel is switched ON iff its
//! level is `>= i`, then the scheduler blocks until the slice deadline.
//! Deadlines are absolute offsets from tick start: an overrun shortens the
//! remaining slices instead of shifting the tick, and nothing is made up.

use std::time::{Duration, Instant};

use eyre::WrapErr;
use reflow_traits::{Channel, Clock, Heater};

use crate::duty::{Levels, SLICES};
use crate::error::Result;
use crate::hw_error::map_hw_error;

/// Length of one control tick.
pub const TICK_MS: u64 = 1_000;

/// Sub-slice deadlines measured from tick start.
pub const SLICE_DEADLINES_MS: [u64; SLICES as usize] = [166, 333, 500, 666, 833, 1_000];

/// Per-tick scheduling counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SliceStats {
    /// Deadlines that had already passed when the scheduler went to wait.
    pub overruns: u8,
    /// Heater writes actually issued.
    pub writes: u8,
}

/// Drives the heater outputs for one tick at a time.
///
/// Remembers the last commanded state per channel so only transitions are
/// written; the first write after construction or `invalidate()` is always
/// issued.
#[derive(Debug, Default)]
pub struct DutyScheduler {
    last: [Option<bool>; 2],
}

fn slot(channel: Channel) -> usize {
    match channel {
        Channel::Top => 0,
        Channel::Bottom => 1,
    }
}

impl DutyScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget the cached output state so the next tick rewrites both channels.
    pub fn invalidate(&mut self) {
        self.last = [None; 2];
    }

    /// Last state commanded on `channel`, if any.
    pub fn commanded(&self, channel: Channel) -> Option<bool> {
        self.last[slot(channel)]
    }

    /// Run the six sub-slices of one tick starting at `tick_start`.
    pub fn run_tick<H, C>(
        &mut self,
        heater: &mut H,
        clock: &C,
        tick_start: Instant,
        levels: Levels,
    ) -> Result<SliceStats>
    where
        H: Heater + ?Sized,
        C: Clock + ?Sized,
    {
        let mut stats = SliceStats::default();
        for (i, deadline_ms) in SLICE_DEADLINES_MS.iter().enumerate() {
            let slice = i as u8 + 1;
            for channel in Channel::ALL {
                let on = levels.get(channel).asserted_at(slice);
                if self.apply(heater, channel, on)? {
                    stats.writes += 1;
                }
            }
            let deadline = tick_start + Duration::from_millis(*deadline_ms);
            if !clock.sleep_until(deadline) {
                stats.overruns += 1;
                tracing::debug!(slice, deadline_ms, "sub-slice deadline overrun");
            }
        }
        Ok(stats)
    }

    /// Switch both channels off unconditionally.
    pub fn force_off<H: Heater + ?Sized>(&mut self, heater: &mut H) -> Result<()> {
        self.invalidate();
        for channel in Channel::ALL {
            self.apply(heater, channel, false)?;
        }
        Ok(())
    }

    fn apply<H: Heater + ?Sized>(&mut self, heater: &mut H, channel: Channel, on: bool) -> Result<bool> {
        let s = slot(channel);
        if self.last[s] == Some(on) {
            return Ok(false);
        }
        heater
            .set(channel, on)
            .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
            .wrap_err_with(|| format!("switching {} heater {}", channel.name(), if on { "on" } else { "off" }))?;
        self.last[s] = Some(on);
        Ok(true)
    }
}
