pub mod await_marker;
pub mod init;
pub mod plan;
pub mod reset;
pub mod status;
pub mod up;

use labrig_core::config::{RigConfig, StateBackend};
use labrig_core::marker::{FileMarkerStore, MarkerStore, RedbMarkerStore};
use labrig_core::paths;
use std::path::Path;

/// Open the marker store named by the config's state backend.
pub fn open_store(root: &Path, config: &RigConfig) -> anyhow::Result<Box<dyn MarkerStore>> {
    match config.state.backend {
        StateBackend::File => Ok(Box::new(FileMarkerStore::open(root)?)),
        StateBackend::Redb => Ok(Box::new(RedbMarkerStore::open(&paths::marker_db_path(
            root,
        ))?)),
    }
}
