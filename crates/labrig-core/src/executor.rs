//! Retry loop for a single step.
//!
//! Every attempt and its outcome is appended to the journal, so a later
//! reader can tell which attempt succeeded. The executor never propagates
//! an error: the caller decides what a terminal failure means from the
//! step's declared failure mode.

use crate::clock::Clock;
use crate::journal::{Journal, JournalOutcome};
use crate::step::{Outcome, Step};
use crate::types::ErrorClass;
use uuid::Uuid;

/// Run `step` to a terminal outcome under its retry policy.
///
/// Transient errors are retried up to `retry.max_attempts` with a linearly
/// increasing delay (`base_delay * attempt`). A permanent error stops the
/// loop immediately. Exhausted retries reclassify the last transient error
/// as the step's terminal failure.
pub fn execute(
    step: &mut Step,
    journal: &Journal,
    clock: &dyn Clock,
    run: Uuid,
    phase: &str,
) -> Outcome {
    let max_attempts = step.retry.max_attempts.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_attempts {
        journal.record(
            run,
            phase,
            Some(&step.id),
            attempt,
            JournalOutcome::Started,
            "",
        );

        match step.action.run() {
            Ok(detail) => {
                journal.record(
                    run,
                    phase,
                    Some(&step.id),
                    attempt,
                    JournalOutcome::Succeeded,
                    &detail,
                );
                return Outcome::Success { attempts: attempt };
            }
            Err(e) => {
                journal.record(
                    run,
                    phase,
                    Some(&step.id),
                    attempt,
                    JournalOutcome::Failed,
                    &e.to_string(),
                );
                last_error = e.message.clone();

                if e.class == ErrorClass::Permanent {
                    return Outcome::Failed {
                        attempts: attempt,
                        reason: last_error,
                    };
                }

                if attempt < max_attempts {
                    let delay = step.retry.base_delay * attempt;
                    tracing::warn!(
                        step = %step.id,
                        attempt,
                        max_attempts,
                        "step failed, retrying in {delay:?}: {}",
                        e.message
                    );
                    clock.sleep(delay);
                }
            }
        }
    }

    Outcome::Failed {
        attempts: max_attempts,
        reason: last_error,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::step::{RetryPolicy, StepError};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn harness() -> (TempDir, Journal, ManualClock, Uuid) {
        let dir = TempDir::new().unwrap();
        let journal = Journal::open(dir.path());
        (dir, journal, ManualClock::new(), Uuid::new_v4())
    }

    #[test]
    fn success_on_first_attempt() {
        let (_dir, journal, clock, run) = harness();
        let mut step = Step::new("ok", || Ok::<_, StepError>("done".to_string()));

        let outcome = execute(&mut step, &journal, &clock, run, "p");
        assert_eq!(outcome, Outcome::Success { attempts: 1 });
        assert_eq!(clock.slept(), Duration::ZERO);
    }

    #[test]
    fn transient_failure_retried_exactly_max_attempts_times() {
        let (_dir, journal, clock, run) = harness();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let mut step = Step::new("flaky", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<String, _>(StepError::transient("mirror unreachable"))
        })
        .with_retry(RetryPolicy::new(4, Duration::from_secs(2)));

        let outcome = execute(&mut step, &journal, &clock, run, "p");
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(
            outcome,
            Outcome::Failed {
                attempts: 4,
                reason: "mirror unreachable".to_string()
            }
        );
    }

    #[test]
    fn backoff_is_linear() {
        let (_dir, journal, clock, run) = harness();
        let mut step = Step::new("flaky", || {
            Err::<String, _>(StepError::transient("nope"))
        })
        .with_retry(RetryPolicy::new(3, Duration::from_secs(2)));

        execute(&mut step, &journal, &clock, run, "p");
        // 2s after attempt 1, 4s after attempt 2, none after the last
        assert_eq!(clock.slept(), Duration::from_secs(6));
    }

    #[test]
    fn permanent_failure_is_not_retried() {
        let (_dir, journal, clock, run) = harness();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let mut step = Step::new("broken", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Err::<String, _>(StepError::permanent("binary not found"))
        })
        .with_retry(RetryPolicy::new(5, Duration::from_secs(1)));

        let outcome = execute(&mut step, &journal, &clock, run, "p");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            outcome,
            Outcome::Failed {
                attempts: 1,
                reason: "binary not found".to_string()
            }
        );
        assert_eq!(clock.slept(), Duration::ZERO);
    }

    #[test]
    fn recovery_after_transient_failures() {
        let (_dir, journal, clock, run) = harness();
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let mut step = Step::new("eventually", move || {
            if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(StepError::transient("not yet"))
            } else {
                Ok("ready".to_string())
            }
        })
        .with_retry(RetryPolicy::new(5, Duration::from_secs(1)));

        let outcome = execute(&mut step, &journal, &clock, run, "p");
        assert_eq!(outcome, Outcome::Success { attempts: 3 });
    }

    #[test]
    fn every_attempt_is_journaled() {
        let (_dir, journal, clock, run) = harness();
        let mut step = Step::new("flaky", || {
            Err::<String, _>(StepError::transient("nope"))
        })
        .with_retry(RetryPolicy::new(2, Duration::from_secs(1)));

        execute(&mut step, &journal, &clock, run, "install");

        let entries = journal.tail(10).unwrap();
        // started + failed, twice
        assert_eq!(entries.len(), 4);
        assert!(entries
            .iter()
            .all(|e| e.phase == "install" && e.step.as_deref() == Some("flaky")));
        assert_eq!(entries[3].attempt, 2);
        assert_eq!(entries[3].outcome, JournalOutcome::Failed);
    }

    #[test]
    fn zero_max_attempts_still_runs_once() {
        let (_dir, journal, clock, run) = harness();
        let mut step = Step::new("once", || Ok::<_, StepError>("ran".to_string()))
            .with_retry(RetryPolicy::new(0, Duration::ZERO));
        let outcome = execute(&mut step, &journal, &clock, run, "p");
        assert_eq!(outcome, Outcome::Success { attempts: 1 });
    }
}
