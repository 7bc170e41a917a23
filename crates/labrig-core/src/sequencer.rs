//! The phase sequencer: drives phases in declared order, skipping
//! completed ones, asserting dependencies, and writing a marker on each
//! successful completion.
//!
//! Re-invocation is safe at any point: completed phases skip, the first
//! incomplete phase reruns all of its steps. The sequencer is the sole
//! writer of the marker store.

use crate::clock::Clock;
use crate::error::{LabrigError, Result};
use crate::executor;
use crate::journal::{Journal, JournalOutcome};
use crate::marker::MarkerStore;
use crate::phase::{self, Phase};
use crate::step::Outcome;
use crate::types::FailureMode;
use serde::Serialize;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseStatus {
    Skipped,
    Completed,
    CompletedWithWarnings,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct PhaseReport {
    pub phase: String,
    pub status: PhaseStatus,
    pub steps_run: u32,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SequenceStatus {
    Completed,
    Aborted { phase: String, reason: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct SequenceReport {
    pub run: Uuid,
    pub status: SequenceStatus,
    pub phases: Vec<PhaseReport>,
}

impl SequenceReport {
    pub fn is_success(&self) -> bool {
        self.status == SequenceStatus::Completed
    }

    /// Total steps executed across all phases; zero on a no-op re-run.
    pub fn steps_run(&self) -> u32 {
        self.phases.iter().map(|p| p.steps_run).sum()
    }
}

// ---------------------------------------------------------------------------
// Sequencer
// ---------------------------------------------------------------------------

pub struct Sequencer<'a> {
    store: &'a mut dyn MarkerStore,
    journal: &'a Journal,
    clock: &'a dyn Clock,
}

impl<'a> Sequencer<'a> {
    pub fn new(
        store: &'a mut dyn MarkerStore,
        journal: &'a Journal,
        clock: &'a dyn Clock,
    ) -> Self {
        Self {
            store,
            journal,
            clock,
        }
    }

    /// Run `phases` in declared order to a terminal report.
    ///
    /// Returns `Err` only for plan bugs (bad ordering, dependency not
    /// met) that no retry can fix. Runtime failures land in the report:
    /// `Aborted` when a fatal step exhausts its retries, with the failing
    /// phase left unmarked so the next invocation resumes there.
    pub fn run(&mut self, phases: Vec<Phase>) -> Result<SequenceReport> {
        phase::validate_order(&phases)?;

        let run = Uuid::new_v4();
        let mut reports = Vec::with_capacity(phases.len());

        for mut phase in phases {
            if self.store.is_complete(&phase.id) {
                self.journal
                    .record(run, &phase.id, None, 0, JournalOutcome::Skipped, "already complete");
                reports.push(PhaseReport {
                    phase: phase.id,
                    status: PhaseStatus::Skipped,
                    steps_run: 0,
                    warnings: Vec::new(),
                });
                continue;
            }

            for dep in &phase.depends_on {
                if !self.store.is_complete(dep) {
                    return Err(LabrigError::DependencyNotMet {
                        phase: phase.id.clone(),
                        dependency: dep.clone(),
                    });
                }
            }

            tracing::info!(phase = %phase.id, "{}", phase.title);

            let mut steps_run = 0u32;
            let mut warnings = Vec::new();
            let mut fatal: Option<String> = None;

            for step in phase.steps.iter_mut() {
                match executor::execute(step, self.journal, self.clock, run, &phase.id) {
                    Outcome::Success { .. } => steps_run += 1,
                    Outcome::Failed { reason, .. } => {
                        steps_run += 1;
                        match step.failure_mode {
                            FailureMode::Tolerable => {
                                let warning = format!("{}: {reason}", step.id);
                                tracing::warn!(phase = %phase.id, "tolerated failure: {warning}");
                                self.journal.record(
                                    run,
                                    &phase.id,
                                    Some(&step.id),
                                    0,
                                    JournalOutcome::Warning,
                                    &reason,
                                );
                                warnings.push(warning);
                            }
                            FailureMode::Fatal => {
                                fatal = Some(format!("{}: {reason}", step.id));
                                break;
                            }
                        }
                    }
                }
            }

            if let Some(reason) = fatal {
                self.journal
                    .record(run, &phase.id, None, 0, JournalOutcome::Failed, &reason);
                reports.push(PhaseReport {
                    phase: phase.id.clone(),
                    status: PhaseStatus::Failed,
                    steps_run,
                    warnings,
                });

                if phase.tolerate_failure {
                    tracing::warn!(phase = %phase.id, "phase failed, continuing: {reason}");
                    continue;
                }

                return Ok(SequenceReport {
                    run,
                    status: SequenceStatus::Aborted {
                        phase: phase.id,
                        reason,
                    },
                    phases: reports,
                });
            }

            self.store.mark_complete(&phase.id, run)?;
            self.journal
                .record(run, &phase.id, None, 0, JournalOutcome::Succeeded, "");
            reports.push(PhaseReport {
                phase: phase.id,
                status: if warnings.is_empty() {
                    PhaseStatus::Completed
                } else {
                    PhaseStatus::CompletedWithWarnings
                },
                steps_run,
                warnings,
            });
        }

        Ok(SequenceReport {
            run,
            status: SequenceStatus::Completed,
            phases: reports,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
