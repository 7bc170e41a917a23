use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Time source for retry backoff and readiness polling.
///
/// All waits in the engine go through this trait, so tests substitute
/// [`ManualClock`] and run without wall-clock delays.
pub trait Clock {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

// ---------------------------------------------------------------------------
// SystemClock
// ---------------------------------------------------------------------------

/// Real time: `Instant::now()` and `std::thread::sleep`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

// ---------------------------------------------------------------------------
// ManualClock
// ---------------------------------------------------------------------------

/// Deterministic clock: `sleep` advances the reported time instead of
/// blocking. Every sleep is recorded so tests can assert total simulated
/// wait time.
pub struct ManualClock {
    inner: Mutex<ManualInner>,
}

struct ManualInner {
    now: Instant,
    slept: Duration,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ManualInner {
                now: Instant::now(),
                slept: Duration::ZERO,
            }),
        }
    }

    /// Total simulated time spent in `sleep`.
    pub fn slept(&self) -> Duration {
        self.inner.lock().unwrap().slept
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.inner.lock().unwrap().now
    }

    fn sleep(&self, duration: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.now += duration;
        inner.slept += duration;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_on_sleep() {
        let clock = ManualClock::new();
        let start = clock.now();
        clock.sleep(Duration::from_secs(30));
        assert_eq!(clock.now() - start, Duration::from_secs(30));
        assert_eq!(clock.slept(), Duration::from_secs(30));
    }

    #[test]
    fn manual_clock_accumulates() {
        let clock = ManualClock::new();
        clock.sleep(Duration::from_secs(1));
        clock.sleep(Duration::from_secs(2));
        assert_eq!(clock.slept(), Duration::from_secs(3));
    }
}
