//! Service registration with systemd.
//!
//! A declared service becomes a rendered unit file. Ordering against a
//! provisioning phase is enforced by the unit itself: `ExecStartPre` runs
//! `labrig await-marker <phase>`, so systemd holds the service until the
//! phase's completion marker exists — the sequencer never polls on the
//! service's behalf. Restart behavior after initial startup belongs to
//! systemd alone.

use crate::error::HostError;
use crate::exec;
use labrig_core::service::{RestartPolicy, ServiceDeclaration};
use std::path::{Path, PathBuf};

pub struct Systemd {
    unit_dir: PathBuf,
}

impl Systemd {
    pub fn new(unit_dir: impl Into<PathBuf>) -> Self {
        Self {
            unit_dir: unit_dir.into(),
        }
    }

    pub fn is_available() -> bool {
        exec::have("systemctl")
    }

    pub fn unit_path(&self, name: &str) -> PathBuf {
        self.unit_dir.join(format!("{name}.service"))
    }

    /// Write the unit file. Overwrites any previous render so repeated
    /// provisioning converges on the current declaration.
    pub fn install(
        &self,
        decl: &ServiceDeclaration,
        labrig_bin: &str,
        root: &Path,
    ) -> Result<PathBuf, HostError> {
        let unit = render_unit(decl, labrig_bin, root);
        let path = self.unit_path(&decl.name);
        labrig_core::io::atomic_write(&path, unit.as_bytes())
            .map_err(|e| HostError::UnitInstall(e.to_string()))?;
        Ok(path)
    }

    pub fn daemon_reload(&self) -> Result<(), HostError> {
        exec::run_checked("systemctl", &["daemon-reload"])?;
        Ok(())
    }

    pub fn enable_now(&self, name: &str) -> Result<(), HostError> {
        let unit = format!("{name}.service");
        exec::run_checked("systemctl", &["enable", "--now", &unit])?;
        Ok(())
    }

    pub fn status(&self, name: &str) -> Result<String, HostError> {
        let unit = format!("{name}.service");
        // is-active exits non-zero for inactive units; the text is the answer
        let out = exec::run("systemctl", &["is-active", &unit])?;
        Ok(out.stdout.trim().to_string())
    }
}

// ---------------------------------------------------------------------------
// Unit rendering
// ---------------------------------------------------------------------------

fn restart_directive(policy: RestartPolicy) -> &'static str {
    match policy {
        RestartPolicy::Never => "no",
        RestartPolicy::OnFailure => "on-failure",
        RestartPolicy::Always => "always",
    }
}

pub fn render_unit(decl: &ServiceDeclaration, labrig_bin: &str, root: &Path) -> String {
    let description = if decl.description.is_empty() {
        &decl.name
    } else {
        &decl.description
    };

    let mut after = vec!["network-online.target".to_string()];
    after.extend(decl.after.iter().cloned());

    let mut unit = String::new();
    unit.push_str("[Unit]\n");
    unit.push_str(&format!("Description={description}\n"));
    unit.push_str(&format!("After={}\n", after.join(" ")));
    unit.push_str("Wants=network-online.target\n");
    unit.push('\n');
    unit.push_str("[Service]\n");
    if let Some(phase) = &decl.requires_marker {
        unit.push_str(&format!(
            "ExecStartPre={labrig_bin} await-marker {phase} --root {}\n",
            root.display()
        ));
    }
    unit.push_str(&format!("ExecStart={}\n", decl.exec_start));
    unit.push_str(&format!("Restart={}\n", restart_directive(decl.restart)));
    unit.push_str("RestartSec=5\n");
    unit.push('\n');
    unit.push_str("[Install]\n");
    unit.push_str("WantedBy=multi-user.target\n");
    unit
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
