use crate::error::Result;
use crate::io;
use crate::paths;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// JournalOutcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JournalOutcome {
    Started,
    Succeeded,
    Failed,
    Warning,
    Skipped,
}

impl JournalOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            JournalOutcome::Started => "started",
            JournalOutcome::Succeeded => "succeeded",
            JournalOutcome::Failed => "failed",
            JournalOutcome::Warning => "warning",
            JournalOutcome::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for JournalOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// JournalEntry
// ---------------------------------------------------------------------------

/// One line of the append-only audit log: a single step attempt (or
/// phase-level event, with `step` unset).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JournalEntry {
    pub at: DateTime<Utc>,
    pub run: Uuid,
    pub phase: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(default)]
    pub attempt: u32,
    pub outcome: JournalOutcome,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub detail: String,
}

// ---------------------------------------------------------------------------
// Journal
// ---------------------------------------------------------------------------

/// Append-only JSONL log of every attempt and outcome, ordered by write
/// time. Survives across invocations; never truncated by the engine.
pub struct Journal {
    path: PathBuf,
}

impl Journal {
    pub fn open(root: &Path) -> Self {
        Self {
            path: paths::journal_path(root),
        }
    }

    #[doc(hidden)]
    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn append(&self, entry: &JournalEntry) -> Result<()> {
        let mut line = serde_json::to_string(entry)?;
        line.push('\n');
        io::append_text(&self.path, &line)
    }

    /// Append an entry, logging instead of failing if the write is refused.
    /// Audit writes must never turn a step outcome into an engine error.
    pub fn record(
        &self,
        run: Uuid,
        phase: &str,
        step: Option<&str>,
        attempt: u32,
        outcome: JournalOutcome,
        detail: &str,
    ) {
        let entry = JournalEntry {
            at: Utc::now(),
            run,
            phase: phase.to_string(),
            step: step.map(str::to_string),
            attempt,
            outcome,
            detail: detail.to_string(),
        };
        if let Err(e) = self.append(&entry) {
            tracing::warn!("journal write failed: {e}");
        }
    }

    /// Last `n` parseable entries, oldest first. Malformed lines are skipped.
    pub fn tail(&self, n: usize) -> Result<Vec<JournalEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let data = std::fs::read_to_string(&self.path)?;
        let entries: Vec<JournalEntry> = data
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect();
        let skip = entries.len().saturating_sub(n);
        Ok(entries.into_iter().skip(skip).collect())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn record_then_tail_roundtrip() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::open(dir.path());
        let run = Uuid::new_v4();

        journal.record(run, "packages", Some("install"), 1, JournalOutcome::Started, "");
        journal.record(run, "packages", Some("install"), 1, JournalOutcome::Succeeded, "ok");

        let entries = journal.tail(10).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].outcome, JournalOutcome::Started);
        assert_eq!(entries[1].outcome, JournalOutcome::Succeeded);
        assert_eq!(entries[1].detail, "ok");
        assert_eq!(entries[1].run, run);
    }

    #[test]
    fn tail_returns_last_n() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::open(dir.path());
        let run = Uuid::new_v4();
        for i in 0..5 {
            journal.record(run, "p", Some("s"), i, JournalOutcome::Started, "");
        }
        let entries = journal.tail(2).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].attempt, 3);
        assert_eq!(entries[1].attempt, 4);
    }

    #[test]
    fn tail_skips_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::open(dir.path());
        let run = Uuid::new_v4();
        journal.record(run, "p", None, 0, JournalOutcome::Skipped, "");
        crate::io::append_text(&crate::paths::journal_path(dir.path()), "not json\n").unwrap();
        journal.record(run, "p", None, 0, JournalOutcome::Succeeded, "");

        let entries = journal.tail(10).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn tail_on_missing_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let journal = Journal::open(dir.path());
        assert!(journal.tail(10).unwrap().is_empty());
    }
}
