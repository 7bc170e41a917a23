use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// RestartPolicy
// ---------------------------------------------------------------------------

/// Restart behavior owned by the host supervisor after initial startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestartPolicy {
    Never,
    OnFailure,
    Always,
}

impl fmt::Display for RestartPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RestartPolicy::Never => "never",
            RestartPolicy::OnFailure => "on_failure",
            RestartPolicy::Always => "always",
        };
        f.write_str(s)
    }
}

// ---------------------------------------------------------------------------
// ServiceDeclaration
// ---------------------------------------------------------------------------

/// A long-running background service registered with the host supervisor.
///
/// `requires_marker` names a phase whose completion marker must exist
/// before the service does real work. The precondition is enforced by the
/// service unit's own startup (it polls for the marker before exec), not
/// by the sequencer on the service's behalf.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceDeclaration {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub exec_start: String,
    #[serde(default = "default_restart")]
    pub restart: RestartPolicy,
    /// Supervisor units this service must start after.
    #[serde(default)]
    pub after: Vec<String>,
    #[serde(default)]
    pub requires_marker: Option<String>,
}

fn default_restart() -> RestartPolicy {
    RestartPolicy::OnFailure
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
