//! Readiness polling for long-running dependencies.
//!
//! A [`ReadinessCheck`] carries a disjunction of independent sub-probes:
//! the target counts as ready as soon as any one of them reports ready
//! (e.g. a structured container health status, with a log-pattern match as
//! the fallback signal). Every wait terminates: ready, timed out, or the
//! target entered an unrecoverable state.

use crate::clock::Clock;
use std::time::Duration;

// ---------------------------------------------------------------------------
// ProbeStatus / Probe
// ---------------------------------------------------------------------------

/// One poll of one sub-probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeStatus {
    Ready,
    Pending,
    /// The target can no longer become ready (e.g. the supervised process
    /// exited). Ends the wait immediately.
    Failed(String),
}

pub trait Probe {
    fn name(&self) -> &str;
    fn poll(&mut self) -> ProbeStatus;
}

// ---------------------------------------------------------------------------
// ReadinessCheck
// ---------------------------------------------------------------------------

pub struct ReadinessCheck {
    pub target: String,
    pub interval: Duration,
    pub timeout: Duration,
    /// Emit a progress log line every this many polls.
    pub progress_every: u32,
    pub probes: Vec<Box<dyn Probe>>,
}

impl ReadinessCheck {
    pub fn new(target: impl Into<String>, interval: Duration, timeout: Duration) -> Self {
        Self {
            target: target.into(),
            interval,
            timeout,
            progress_every: 10,
            probes: Vec::new(),
        }
    }

    pub fn probe(mut self, probe: impl Probe + 'static) -> Self {
        self.probes.push(Box::new(probe));
        self
    }
}

// ---------------------------------------------------------------------------
// Readiness / wait_for
// ---------------------------------------------------------------------------

/// Terminal result of a readiness wait.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    TimedOut,
    PermanentFailure(String),
}

/// Poll `check` until ready, timed out, or permanently failed.
///
/// Sub-probes are evaluated in declared order each poll, short-circuiting
/// on the first `Ready`. A `Failed` signal from any sub-probe ends the wait
/// with `PermanentFailure`; a dead target cannot become ready.
pub fn wait_for(check: &mut ReadinessCheck, clock: &dyn Clock) -> Readiness {
    let start = clock.now();
    let mut polls: u32 = 0;

    loop {
        polls += 1;
        let mut last_status = String::from("pending");

        for probe in check.probes.iter_mut() {
            match probe.poll() {
                ProbeStatus::Ready => {
                    tracing::info!(target_name = %check.target, polls, probe = probe.name(), "ready");
                    return Readiness::Ready;
                }
                ProbeStatus::Failed(reason) => {
                    tracing::warn!(target_name = %check.target, polls, probe = probe.name(), "permanently failed: {reason}");
                    return Readiness::PermanentFailure(reason);
                }
                ProbeStatus::Pending => {
                    last_status = format!("{}: pending", probe.name());
                }
            }
        }

        if check.progress_every > 0 && polls % check.progress_every == 0 {
            tracing::info!(
                target_name = %check.target,
                polls,
                elapsed = ?(clock.now() - start),
                "still waiting ({last_status})"
            );
        }

        if clock.now() - start >= check.timeout {
            tracing::warn!(target_name = %check.target, polls, "readiness wait timed out");
            return Readiness::TimedOut;
        }

        clock.sleep(check.interval);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    struct ReadyAfter {
        name: &'static str,
        remaining: u32,
    }

    impl Probe for ReadyAfter {
        fn name(&self) -> &str {
            self.name
        }

        fn poll(&mut self) -> ProbeStatus {
            if self.remaining == 0 {
                ProbeStatus::Ready
            } else {
                self.remaining -= 1;
                ProbeStatus::Pending
            }
        }
    }

    struct Never;

    impl Probe for Never {
        fn name(&self) -> &str {
            "never"
        }

        fn poll(&mut self) -> ProbeStatus {
            ProbeStatus::Pending
        }
    }

    struct Dead;

    impl Probe for Dead {
        fn name(&self) -> &str {
            "dead"
        }

        fn poll(&mut self) -> ProbeStatus {
            ProbeStatus::Failed("process exited".to_string())
        }
    }

    fn check_1s_10s() -> ReadinessCheck {
        ReadinessCheck::new("db", Duration::from_secs(1), Duration::from_secs(10))
    }

    #[test]
    fn ready_after_three_polls_blocks_three_intervals() {
        let clock = ManualClock::new();
        let mut check = check_1s_10s().probe(ReadyAfter {
            name: "health",
            remaining: 3,
        });

        assert_eq!(wait_for(&mut check, &clock), Readiness::Ready);
        assert_eq!(clock.slept(), Duration::from_secs(3));
    }

    #[test]
    fn never_ready_times_out_at_timeout() {
        let clock = ManualClock::new();
        let mut check = check_1s_10s().probe(Never);

        assert_eq!(wait_for(&mut check, &clock), Readiness::TimedOut);
        // Bounded by the timeout, to within one polling interval.
        assert_eq!(clock.slept(), Duration::from_secs(10));
    }

    #[test]
    fn fallback_probe_wins_when_first_is_pending() {
        let clock = ManualClock::new();
        let mut check = check_1s_10s().probe(Never).probe(ReadyAfter {
            name: "log-pattern",
            remaining: 0,
        });

        assert_eq!(wait_for(&mut check, &clock), Readiness::Ready);
        assert_eq!(clock.slept(), Duration::ZERO);
    }

    #[test]
    fn ready_short_circuits_before_failed_probe() {
        let clock = ManualClock::new();
        let mut check = check_1s_10s()
            .probe(ReadyAfter {
                name: "health",
                remaining: 0,
            })
            .probe(Dead);

        assert_eq!(wait_for(&mut check, &clock), Readiness::Ready);
    }

    #[test]
    fn dead_target_is_permanent_failure() {
        let clock = ManualClock::new();
        let mut check = check_1s_10s().probe(Never).probe(Dead);

        assert_eq!(
            wait_for(&mut check, &clock),
            Readiness::PermanentFailure("process exited".to_string())
        );
        assert_eq!(clock.slept(), Duration::ZERO);
    }

    #[test]
    fn no_probes_times_out() {
        let clock = ManualClock::new();
        let mut check = ReadinessCheck::new("x", Duration::from_secs(2), Duration::from_secs(6));
        assert_eq!(wait_for(&mut check, &clock), Readiness::TimedOut);
    }
}
