use crate::plan::ProvisionPhase;
use anyhow::{bail, Context};
use labrig_core::config::RigConfig;
use std::path::Path;
use std::time::{Duration, Instant};

/// Block until the named phase's completion marker exists.
///
/// Generated service units run this as `ExecStartPre`, so the supervisor
/// holds a service back until its provisioning prerequisite is durably
/// done. A store that cannot be opened (e.g. the sequencer still holds an
/// exclusive database lock) counts as "not yet".
pub fn run(root: &Path, phase: &str, timeout_secs: u64, interval_secs: u64) -> anyhow::Result<()> {
    if !ProvisionPhase::all().iter().any(|p| p.as_str() == phase) {
        let known: Vec<String> = ProvisionPhase::all().iter().map(|p| p.to_string()).collect();
        bail!("unknown phase '{phase}' (expected one of: {})", known.join(", "));
    }
    let config = RigConfig::load(root).context("failed to load config")?;

    let timeout = Duration::from_secs(timeout_secs);
    let interval = Duration::from_secs(interval_secs.max(1));
    let start = Instant::now();

    loop {
        let complete = match super::open_store(root, &config) {
            Ok(store) => store.is_complete(phase),
            Err(e) => {
                tracing::debug!("marker store busy: {e:#}");
                false
            }
        };
        if complete {
            println!("marker '{phase}' present");
            return Ok(());
        }
        if start.elapsed() >= timeout {
            bail!("timed out after {timeout_secs}s waiting for marker '{phase}'");
        }
        std::thread::sleep(interval);
    }
}
