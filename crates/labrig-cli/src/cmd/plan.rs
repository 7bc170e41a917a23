use crate::output::{print_json, print_table};
use crate::plan;
use anyhow::Context;
use labrig_core::config::RigConfig;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let config = RigConfig::load(root).context("failed to load config")?;
    config.validate().context("invalid config")?;

    let phases = plan::build_plan(&config, root);
    let store = super::open_store(root, &config)?;

    if json {
        #[derive(serde::Serialize)]
        struct PhasePlan {
            phase: String,
            title: String,
            depends_on: Vec<String>,
            steps: Vec<String>,
            complete: bool,
        }

        let out: Vec<PhasePlan> = phases
            .iter()
            .map(|p| PhasePlan {
                phase: p.id.clone(),
                title: p.title.clone(),
                depends_on: p.depends_on.clone(),
                steps: p.steps.iter().map(|s| s.id.clone()).collect(),
                complete: store.is_complete(&p.id),
            })
            .collect();
        return print_json(&out);
    }

    let rows: Vec<Vec<String>> = phases
        .iter()
        .map(|p| {
            vec![
                p.id.clone(),
                if store.is_complete(&p.id) {
                    "yes".to_string()
                } else {
                    "no".to_string()
                },
                p.steps.len().to_string(),
                p.depends_on.join(", "),
                p.title.clone(),
            ]
        })
        .collect();
    print_table(&["PHASE", "DONE", "STEPS", "DEPENDS ON", "TITLE"], rows);
    Ok(())
}
