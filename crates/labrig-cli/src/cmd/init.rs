use labrig_core::{io, paths};
use std::path::Path;

const DEFAULT_CONFIG: &str = r#"# labrig provisioning configuration.
#
# Sections left commented out contribute no steps; their phases complete
# trivially. Re-running `labrig up` is always safe: completed phases are
# skipped, the first incomplete phase is rerun from its first step.

state:
  backend: file # or: redb

retry:
  max_attempts: 3
  base_delay_secs: 5

readiness:
  interval_secs: 2
  timeout_secs: 180

packages: []

# database:
#   image: pgvector/pgvector:pg16
#   name: lab-db
#   env:
#     POSTGRES_PASSWORD: lab
#   ports: ["5432:5432"]
#   volumes: ["/var/lib/lab/pg:/var/lib/postgresql/data"]
#   ready_log_pattern: "ready to accept connections"
#   init_commands:
#     - psql -U postgres -c 'CREATE EXTENSION IF NOT EXISTS vector'
#   tolerated_signals:
#     - 'extension "vector" already exists'

# runtime:
#   manager: pyenv
#   version: "3.12.4"
#   libraries:
#     - name: torch
#       version: "2.3.1"
#     - name: transformers
#       version: "4.41.0"

# content:
#   repo: https://github.com/example/genai-labs.git
#   subset: notebooks
#   dest: /opt/lab/notebooks
#   archive_url: https://github.com/example/genai-labs/archive/refs/heads/main.tar.gz

# services:
#   - name: lab-notebook
#     description: Notebook server
#     exec_start: /usr/local/bin/jupyter lab --no-browser
#     restart: always
#     requires_marker: runtime
"#;

pub fn run(root: &Path) -> anyhow::Result<()> {
    io::ensure_dir(&paths::labrig_dir(root))?;
    let written = io::write_if_missing(&paths::config_path(root), DEFAULT_CONFIG.as_bytes())?;
    if written {
        println!("Initialized labrig in {}", root.display());
        println!("Edit {} and run: labrig up", paths::CONFIG_FILE);
    } else {
        println!("Already initialized: {}", paths::config_path(root).display());
    }
    Ok(())
}
