use crate::error::{LabrigError, Result};
use crate::paths;
use crate::step::Step;
use std::collections::HashSet;
use std::fmt;

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// A named, ordered, idempotent unit of provisioning work.
///
/// Phases run strictly in declared order; `depends_on` is an assertion
/// that earlier phases completed, not a scheduling hint. A phase with no
/// steps is trivially complete.
pub struct Phase {
    pub id: String,
    pub title: String,
    pub depends_on: Vec<String>,
    /// A fatal step failure aborts this phase but lets the sequence
    /// continue to the next phase.
    pub tolerate_failure: bool,
    pub steps: Vec<Step>,
}

impl Phase {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            depends_on: Vec::new(),
            tolerate_failure: false,
            steps: Vec::new(),
        }
    }

    pub fn depends_on(mut self, phase: impl Into<String>) -> Self {
        self.depends_on.push(phase.into());
        self
    }

    pub fn tolerate_failure(mut self) -> Self {
        self.tolerate_failure = true;
        self
    }

    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }
}

impl fmt::Debug for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Phase")
            .field("id", &self.id)
            .field("depends_on", &self.depends_on)
            .field("tolerate_failure", &self.tolerate_failure)
            .field("steps", &self.steps.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Plan validation
// ---------------------------------------------------------------------------

/// Reject malformed plans before anything runs: invalid or duplicate
/// phase ids, and dependencies that don't name a strictly earlier phase.
/// With declared-order execution this also makes cycles impossible.
pub fn validate_order(phases: &[Phase]) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for phase in phases {
        paths::validate_name(&phase.id)?;
        for dep in &phase.depends_on {
            if !seen.contains(dep.as_str()) {
                return Err(LabrigError::InvalidPhaseOrder {
                    phase: phase.id.clone(),
                    dependency: dep.clone(),
                });
            }
        }
        if !seen.insert(&phase.id) {
            return Err(LabrigError::DuplicatePhase(phase.id.clone()));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_order_passes() {
        let phases = vec![
            Phase::new("packages", "Install packages"),
            Phase::new("database", "Start database").depends_on("packages"),
            Phase::new("database-config", "Configure database").depends_on("database"),
        ];
        validate_order(&phases).unwrap();
    }

    #[test]
    fn forward_dependency_rejected() {
        let phases = vec![
            Phase::new("database", "Start database").depends_on("packages"),
            Phase::new("packages", "Install packages"),
        ];
        assert!(matches!(
            validate_order(&phases),
            Err(LabrigError::InvalidPhaseOrder { phase, dependency })
                if phase == "database" && dependency == "packages"
        ));
    }

    #[test]
    fn unknown_dependency_rejected() {
        let phases = vec![Phase::new("database", "Start database").depends_on("nonexistent")];
        assert!(matches!(
            validate_order(&phases),
            Err(LabrigError::InvalidPhaseOrder { .. })
        ));
    }

    #[test]
    fn self_dependency_rejected() {
        let phases = vec![Phase::new("database", "db").depends_on("database")];
        assert!(validate_order(&phases).is_err());
    }

    #[test]
    fn duplicate_phase_rejected() {
        let phases = vec![
            Phase::new("packages", "one"),
            Phase::new("packages", "two"),
        ];
        assert!(matches!(
            validate_order(&phases),
            Err(LabrigError::DuplicatePhase(p)) if p == "packages"
        ));
    }

    #[test]
    fn invalid_id_rejected() {
        let phases = vec![Phase::new("Bad Name", "bad")];
        assert!(matches!(
            validate_order(&phases),
            Err(LabrigError::InvalidName(_))
        ));
    }
}
