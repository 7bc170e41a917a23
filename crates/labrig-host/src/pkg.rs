//! OS package installation via the distribution's package manager.
//!
//! Detection priority: apt-get (Debian/Ubuntu lab images are the common
//! case), then dnf. Installing an already-present package is a no-op
//! success for both tools, so the install step stays idempotent.

use crate::error::HostError;
use crate::exec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
}

impl PackageManager {
    pub fn detect() -> Option<Self> {
        if exec::have("apt-get") {
            return Some(PackageManager::Apt);
        }
        if exec::have("dnf") {
            return Some(PackageManager::Dnf);
        }
        None
    }

    pub fn name(&self) -> &'static str {
        match self {
            PackageManager::Apt => "apt-get",
            PackageManager::Dnf => "dnf",
        }
    }

    /// Refresh package metadata. Failures here are worth retrying: mirror
    /// and index outages dominate.
    pub fn refresh(&self) -> Result<(), HostError> {
        match self {
            PackageManager::Apt => {
                exec::run_checked_env(
                    "apt-get",
                    &["update", "-y"],
                    &[("DEBIAN_FRONTEND", "noninteractive")],
                )?;
            }
            PackageManager::Dnf => {
                exec::run_checked("dnf", &["makecache", "-y"])?;
            }
        }
        Ok(())
    }

    pub fn install(&self, packages: &[String]) -> Result<(), HostError> {
        if packages.is_empty() {
            return Ok(());
        }
        let mut args: Vec<&str> = vec!["install", "-y"];
        args.extend(packages.iter().map(String::as_str));
        match self {
            PackageManager::Apt => {
                exec::run_checked_env(
                    "apt-get",
                    &args,
                    &[("DEBIAN_FRONTEND", "noninteractive")],
                )?;
            }
            PackageManager::Dnf => {
                exec::run_checked("dnf", &args)?;
            }
        }
        Ok(())
    }
}
