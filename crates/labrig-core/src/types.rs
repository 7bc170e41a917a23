use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// ErrorClass
// ---------------------------------------------------------------------------

/// Whether a failed operation is worth retrying.
///
/// `Transient` failures (network hiccup, dependency not yet ready) are
/// absorbed by the step executor's retry loop. `Permanent` failures stop
/// retrying immediately; whether they abort the sequence depends on the
/// step's [`FailureMode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    Transient,
    Permanent,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorClass::Transient => "transient",
            ErrorClass::Permanent => "permanent",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// FailureMode
// ---------------------------------------------------------------------------

/// How a step's exhausted failure affects its phase.
///
/// A `Fatal` step aborts the phase. A `Tolerable` step is journaled as a
/// warning and the phase continues (and is still marked complete).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureMode {
    Fatal,
    Tolerable,
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureMode::Fatal => "fatal",
            FailureMode::Tolerable => "tolerable",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
