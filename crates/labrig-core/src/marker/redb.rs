//! Marker store backed by an embedded redb database.
//!
//! One `MARKERS` table, keyed by phase id, JSON-encoded
//! [`CompletedMarker`] values.

use super::{CompletedMarker, MarkerStore};
use crate::error::{LabrigError, Result};
use redb::{Database, ReadableTable, TableDefinition};
use std::path::Path;
use uuid::Uuid;

const MARKERS: TableDefinition<&str, &[u8]> = TableDefinition::new("markers");

pub struct RedbMarkerStore {
    db: Database,
}

impl RedbMarkerStore {
    /// Open or create the database at `path`, ensuring the table exists
    /// before any reads.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::create(path).map_err(|e| LabrigError::MarkerDb(e.to_string()))?;
        let wt = db
            .begin_write()
            .map_err(|e| LabrigError::MarkerDb(e.to_string()))?;
        wt.open_table(MARKERS)
            .map_err(|e| LabrigError::MarkerDb(e.to_string()))?;
        wt.commit()
            .map_err(|e| LabrigError::MarkerDb(e.to_string()))?;
        Ok(Self { db })
    }

    fn get(&self, phase: &str) -> Result<Option<CompletedMarker>> {
        let rt = self
            .db
            .begin_read()
            .map_err(|e| LabrigError::MarkerDb(e.to_string()))?;
        let table = rt
            .open_table(MARKERS)
            .map_err(|e| LabrigError::MarkerDb(e.to_string()))?;
        let value = table
            .get(phase)
            .map_err(|e| LabrigError::MarkerDb(e.to_string()))?;
        match value {
            Some(v) => Ok(Some(serde_json::from_slice(v.value())?)),
            None => Ok(None),
        }
    }
}

impl MarkerStore for RedbMarkerStore {
    fn is_complete(&self, phase: &str) -> bool {
        match self.get(phase) {
            Ok(found) => found.is_some(),
            Err(e) => {
                tracing::warn!("marker read failed for '{phase}': {e}");
                false
            }
        }
    }

    fn mark_complete(&mut self, phase: &str, run: Uuid) -> Result<()> {
        if self.is_complete(phase) {
            return Ok(());
        }
        let marker = CompletedMarker {
            phase: phase.to_string(),
            completed_at: chrono::Utc::now(),
            run,
        };
        let value = serde_json::to_vec(&marker)?;
        let wt = self
            .db
            .begin_write()
            .map_err(|e| LabrigError::MarkerDb(e.to_string()))?;
        {
            let mut table = wt
                .open_table(MARKERS)
                .map_err(|e| LabrigError::MarkerDb(e.to_string()))?;
            table
                .insert(phase, value.as_slice())
                .map_err(|e| LabrigError::MarkerDb(e.to_string()))?;
        }
        wt.commit()
            .map_err(|e| LabrigError::MarkerDb(e.to_string()))?;
        Ok(())
    }

    fn completed(&self) -> Vec<CompletedMarker> {
        let mut result = Vec::new();
        let Ok(rt) = self.db.begin_read() else {
            return result;
        };
        let Ok(table) = rt.open_table(MARKERS) else {
            return result;
        };
        let Ok(iter) = table.iter() else {
            return result;
        };
        for entry in iter.flatten() {
            let (_, v) = entry;
            if let Ok(marker) = serde_json::from_slice::<CompletedMarker>(v.value()) {
                result.push(marker);
            }
        }
        result.sort_by(|a, b| a.completed_at.cmp(&b.completed_at));
        result
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_tmp() -> (TempDir, RedbMarkerStore) {
        let dir = TempDir::new().unwrap();
        let store = RedbMarkerStore::open(&dir.path().join("markers.redb")).unwrap();
        (dir, store)
    }

    #[test]
    fn starts_empty() {
        let (_dir, store) = open_tmp();
        assert!(!store.is_complete("packages"));
        assert!(store.completed().is_empty());
    }

    #[test]
    fn mark_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("markers.redb");
        let run = Uuid::new_v4();
        {
            let mut store = RedbMarkerStore::open(&path).unwrap();
            store.mark_complete("packages", run).unwrap();
        }
        let store = RedbMarkerStore::open(&path).unwrap();
        assert!(store.is_complete("packages"));
        assert_eq!(store.completed()[0].run, run);
    }

    #[test]
    fn mark_is_idempotent() {
        let (_dir, mut store) = open_tmp();
        store.mark_complete("database", Uuid::new_v4()).unwrap();
        let first = store.completed()[0].clone();
        store.mark_complete("database", Uuid::new_v4()).unwrap();
        assert_eq!(store.completed().len(), 1);
        assert_eq!(store.completed()[0], first);
    }

    #[test]
    fn completed_sorts_by_completion_time() {
        let (_dir, mut store) = open_tmp();
        // Insert in an order whose keys sort differently than insertion time
        store.mark_complete("zeta", Uuid::new_v4()).unwrap();
        store.mark_complete("alpha", Uuid::new_v4()).unwrap();
        let order: Vec<String> = store.completed().into_iter().map(|m| m.phase).collect();
        assert_eq!(order, ["zeta", "alpha"]);
    }
}
