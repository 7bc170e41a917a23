//! Language runtime installation through a pyenv-style version manager.

use crate::error::HostError;
use crate::exec;
use labrig_core::config::LibrarySpec;

pub struct VersionManager {
    binary: String,
}

impl VersionManager {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    pub fn ensure_available(&self) -> Result<(), HostError> {
        exec::binary(&self.binary).map(|_| ())
    }

    /// Install the requested runtime version. `-s` makes an existing
    /// install a no-op, keeping the step idempotent.
    pub fn install(&self, version: &str) -> Result<(), HostError> {
        exec::run_checked(&self.binary, &["install", "-s", version])?;
        Ok(())
    }

    pub fn activate(&self, version: &str) -> Result<(), HostError> {
        exec::run_checked(&self.binary, &["global", version])?;
        Ok(())
    }

    /// Install pinned libraries into the active runtime.
    pub fn install_libraries(&self, libraries: &[LibrarySpec]) -> Result<(), HostError> {
        if libraries.is_empty() {
            return Ok(());
        }
        let pins = pins(libraries);
        let mut args: Vec<&str> = vec!["exec", "pip", "install"];
        args.extend(pins.iter().map(String::as_str));
        exec::run_checked(&self.binary, &args)?;
        Ok(())
    }
}

fn pins(libraries: &[LibrarySpec]) -> Vec<String> {
    libraries
        .iter()
        .map(|lib| format!("{}=={}", lib.name, lib.version))
        .collect()
}
