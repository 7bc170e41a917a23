use super::{CompletedMarker, MarkerStore};
use crate::error::Result;
use crate::io;
use crate::paths;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// MarkerFile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MarkerFile {
    #[serde(default = "default_version")]
    version: u32,
    #[serde(default)]
    completed: Vec<CompletedMarker>,
    last_updated: chrono::DateTime<Utc>,
}

fn default_version() -> u32 {
    1
}

impl Default for MarkerFile {
    fn default() -> Self {
        Self {
            version: 1,
            completed: Vec::new(),
            last_updated: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// FileMarkerStore
// ---------------------------------------------------------------------------

/// Marker store backed by a YAML state file, written atomically on every
/// mutation. Created empty on first use.
pub struct FileMarkerStore {
    path: PathBuf,
    doc: MarkerFile,
}

impl FileMarkerStore {
    pub fn open(root: &Path) -> Result<Self> {
        Self::at_path(paths::state_path(root))
    }

    pub fn at_path(path: PathBuf) -> Result<Self> {
        let doc = if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            serde_yaml::from_str(&data)?
        } else {
            MarkerFile::default()
        };
        Ok(Self { path, doc })
    }

    fn save(&self) -> Result<()> {
        let data = serde_yaml::to_string(&self.doc)?;
        io::atomic_write(&self.path, data.as_bytes())
    }
}

impl MarkerStore for FileMarkerStore {
    fn is_complete(&self, phase: &str) -> bool {
        self.doc.completed.iter().any(|m| m.phase == phase)
    }

    fn mark_complete(&mut self, phase: &str, run: Uuid) -> Result<()> {
        if self.is_complete(phase) {
            return Ok(());
        }
        self.doc.completed.push(CompletedMarker {
            phase: phase.to_string(),
            completed_at: Utc::now(),
            run,
        });
        self.doc.last_updated = Utc::now();
        self.save()
    }

    fn completed(&self) -> Vec<CompletedMarker> {
        self.doc.completed.clone()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
