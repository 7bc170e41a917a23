//! Durable completion markers, one per finished phase.
//!
//! Markers are written only by the sequencer on successful phase
//! completion and are never removed by the engine; re-provisioning
//! requires an explicit operator reset.

mod file;
mod redb;

pub use file::FileMarkerStore;
pub use redb::RedbMarkerStore;

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// CompletedMarker
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedMarker {
    pub phase: String,
    pub completed_at: DateTime<Utc>,
    pub run: Uuid,
}

// ---------------------------------------------------------------------------
// MarkerStore
// ---------------------------------------------------------------------------

pub trait MarkerStore {
    fn is_complete(&self, phase: &str) -> bool;

    /// Record a phase as complete. Idempotent: marking an already-complete
    /// phase keeps the original record.
    fn mark_complete(&mut self, phase: &str, run: Uuid) -> Result<()>;

    /// All completed markers, in completion order.
    fn completed(&self) -> Vec<CompletedMarker>;
}
