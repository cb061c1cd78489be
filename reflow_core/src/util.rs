//! Small time helpers shared by the controller and runner.

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;

/// Whole seconds in `ms`, rounded down.
#[inline]
pub fn whole_secs(ms: u64) -> u64 {
    ms / MILLIS_PER_SEC
}
