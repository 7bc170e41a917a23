use crate::types::{ErrorClass, FailureMode};
use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// StepError
// ---------------------------------------------------------------------------

/// Failure reported by a step action, classified for the retry loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepError {
    pub class: ErrorClass,
    pub message: String,
}

impl StepError {
    pub fn transient(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Transient,
            message: message.into(),
        }
    }

    pub fn permanent(message: impl Into<String>) -> Self {
        Self {
            class: ErrorClass::Permanent,
            message: message.into(),
        }
    }
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.class)
    }
}

impl std::error::Error for StepError {}

// ---------------------------------------------------------------------------
// StepAction
// ---------------------------------------------------------------------------

/// One side-effecting provisioning operation. Must be idempotent: a phase
/// interrupted mid-way reruns all of its steps on the next invocation.
///
/// The `Ok` value is a short detail line for the audit journal.
pub trait StepAction {
    fn run(&mut self) -> Result<String, StepError>;
}

impl<F> StepAction for F
where
    F: FnMut() -> Result<String, StepError>,
{
    fn run(&mut self) -> Result<String, StepError> {
        self()
    }
}

// ---------------------------------------------------------------------------
// RetryPolicy
// ---------------------------------------------------------------------------

/// Attempt budget and backoff schedule for one step.
///
/// The delay before attempt `n + 1` is `base_delay * n` (linear backoff).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            base_delay,
        }
    }

    /// Single attempt, no retries.
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(5))
    }
}

// ---------------------------------------------------------------------------
// Step
// ---------------------------------------------------------------------------

pub struct Step {
    pub id: String,
    pub failure_mode: FailureMode,
    pub retry: RetryPolicy,
    pub action: Box<dyn StepAction>,
}

impl Step {
    pub fn new(id: impl Into<String>, action: impl StepAction + 'static) -> Self {
        Self {
            id: id.into(),
            failure_mode: FailureMode::Fatal,
            retry: RetryPolicy::default(),
            action: Box::new(action),
        }
    }

    pub fn tolerable(mut self) -> Self {
        self.failure_mode = FailureMode::Tolerable;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Step")
            .field("id", &self.id)
            .field("failure_mode", &self.failure_mode)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

/// Terminal result of executing one step, with the number of attempts used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success { attempts: u32 },
    Failed { attempts: u32, reason: String },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
