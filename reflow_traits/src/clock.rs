use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Monotonic clock abstraction for control-tick timing.
///
/// - now(): returns a monotonic Instant
/// - sleep(): sleeps for the provided duration (implementations may simulate)
/// - sleep_until(): blocks until an absolute deadline; returns false if it had already passed
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, d: Duration);

    /// Block until `deadline`. Returns `false` when the deadline was already
    /// in the past on entry (an overrun); no time is made up in that case.
    fn sleep_until(&self, deadline: Instant) -> bool {
        let now = self.now();
        if now >= deadline {
            return false;
        }
        self.sleep(deadline - now);
        true
    }

    /// Milliseconds elapsed since `epoch`, saturating at 0 on underflow.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let dur = self.now().saturating_duration_since(epoch);
        dur.as_millis() as u64
    }
}

/// Default, real-time monotonic clock backed by std::time::Instant.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    #[inline]
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    #[inline]
    fn now(&self) -> Instant {
        Instant::now()
    }

    #[inline]
    fn sleep(&self, d: Duration) {
        if d.is_zero() {
            return;
        }
        thread::sleep(d);
    }
}

/// Virtual clock whose time only moves when advanced or slept on.
///
/// now() = origin + offset
/// sleep(d) advances internal time by d without actually sleeping.
/// Clones share the same offset, so a simulated plant can observe the
/// same timeline as the controller driving it.
#[derive(Debug, Clone)]
pub struct SimClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl Default for SimClock {
    fn default() -> Self {
        Self::new()
    }
}

impl SimClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = off.saturating_add(d);
        }
    }

    /// Set the absolute offset relative to origin.
    pub fn set_offset(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = d;
        }
    }

    /// Current offset from the origin.
    pub fn elapsed(&self) -> Duration {
        self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO)
    }
}

impl Clock for SimClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_clock_sleep_advances_shared_time() {
        let clock = SimClock::new();
        let other = clock.clone();
        let epoch = clock.now();
        clock.sleep(Duration::from_millis(166));
        assert_eq!(other.ms_since(epoch), 166);
    }

    #[test]
    fn sleep_until_reports_overrun() {
        let clock = SimClock::new();
        let start = clock.now();
        assert!(clock.sleep_until(start + Duration::from_millis(333)));
        assert_eq!(clock.ms_since(start), 333);
        // already past: no sleep, overrun reported
        assert!(!clock.sleep_until(start + Duration::from_millis(100)));
        assert_eq!(clock.ms_since(start), 333);
    }

    #[test]
    fn set_offset_is_absolute() {
        let clock = SimClock::new();
        let epoch = clock.now();
        clock.advance(Duration::from_secs(5));
        clock.set_offset(Duration::from_secs(2));
        assert_eq!(clock.ms_since(epoch), 2_000);
    }
}
