use anyhow::bail;
use labrig_core::paths;
use std::path::Path;

/// Operator-level reset: forget all completion markers so the next `up`
/// reprovisions from the first phase. The journal is kept.
pub fn run(root: &Path, yes: bool) -> anyhow::Result<()> {
    if !yes {
        bail!("refusing to reset without --yes (this forgets all completed phases)");
    }

    let mut removed = 0;
    for path in [paths::state_path(root), paths::marker_db_path(root)] {
        if path.exists() {
            std::fs::remove_file(&path)?;
            removed += 1;
        }
    }

    if removed == 0 {
        println!("No marker state to remove.");
    } else {
        println!("Marker state removed. The next 'labrig up' reprovisions from the start.");
    }
    Ok(())
}
