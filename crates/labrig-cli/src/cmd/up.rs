use crate::output::print_json;
use crate::plan;
use anyhow::{bail, Context};
use labrig_core::clock::SystemClock;
use labrig_core::config::RigConfig;
use labrig_core::journal::Journal;
use labrig_core::sequencer::{PhaseStatus, Sequencer, SequenceStatus};
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = RigConfig::load(root).context("failed to load config")?;
    config.validate().context("invalid config")?;

    let phases = plan::build_plan(&config, root);
    let mut store = super::open_store(root, &config)?;
    let journal = Journal::open(root);
    let clock = SystemClock;

    let report = Sequencer::new(store.as_mut(), &journal, &clock)
        .run(phases)
        .context("provisioning failed")?;

    if json {
        print_json(&report)?;
    } else {
        for phase in &report.phases {
            let status = match phase.status {
                PhaseStatus::Skipped => "skipped (already complete)",
                PhaseStatus::Completed => "complete",
                PhaseStatus::CompletedWithWarnings => "complete with warnings",
                PhaseStatus::Failed => "FAILED",
            };
            println!("{:<18} {status}", phase.phase);
            for warning in &phase.warnings {
                println!("{:<18}   warning: {warning}", "");
            }
        }
        match report.steps_run() {
            0 => println!("\nNothing to do — all phases already complete."),
            n => println!("\nProvisioning finished ({n} steps run)."),
        }
    }

    match report.status {
        SequenceStatus::Completed => Ok(()),
        SequenceStatus::Aborted { phase, reason } => {
            bail!("provisioning aborted in phase '{phase}': {reason}")
        }
    }
}
