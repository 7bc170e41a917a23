use crate::output::{print_json, print_table};
use anyhow::Context;
use labrig_core::config::RigConfig;
use labrig_core::journal::Journal;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = RigConfig::load(root).context("failed to load config")?;
    let store = super::open_store(root, &config)?;
    let journal = Journal::open(root);

    let completed = store.completed();
    let recent = journal.tail(10)?;

    if json {
        #[derive(serde::Serialize)]
        struct StatusOutput {
            completed: Vec<labrig_core::marker::CompletedMarker>,
            recent: Vec<labrig_core::journal::JournalEntry>,
        }
        return print_json(&StatusOutput { completed, recent });
    }

    if completed.is_empty() {
        println!("No phases complete yet. Run: labrig up");
    } else {
        let rows: Vec<Vec<String>> = completed
            .iter()
            .map(|m| {
                vec![
                    m.phase.clone(),
                    m.completed_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                    m.run.to_string(),
                ]
            })
            .collect();
        print_table(&["PHASE", "COMPLETED AT", "RUN"], rows);
    }

    if !recent.is_empty() {
        println!("\nRecent activity:");
        for entry in &recent {
            let step = entry.step.as_deref().unwrap_or("-");
            let detail = if entry.detail.is_empty() {
                String::new()
            } else {
                format!(": {}", entry.detail)
            };
            println!(
                "  {} {:<10} {}/{}{detail}",
                entry.at.format("%H:%M:%S"),
                entry.outcome,
                entry.phase,
                step
            );
        }
    }

    Ok(())
}
