use crate::error::{LabrigError, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const LABRIG_DIR: &str = ".labrig";

pub const CONFIG_FILE: &str = ".labrig/config.yaml";
pub const STATE_FILE: &str = ".labrig/state.yaml";
pub const MARKER_DB_FILE: &str = ".labrig/markers.redb";
pub const JOURNAL_FILE: &str = ".labrig/journal.log";

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn labrig_dir(root: &Path) -> PathBuf {
    root.join(LABRIG_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_FILE)
}

pub fn state_path(root: &Path) -> PathBuf {
    root.join(STATE_FILE)
}

pub fn marker_db_path(root: &Path) -> PathBuf {
    root.join(MARKER_DB_FILE)
}

pub fn journal_path(root: &Path) -> PathBuf {
    root.join(JOURNAL_FILE)
}

// ---------------------------------------------------------------------------
// Name validation
// ---------------------------------------------------------------------------

static NAME_RE: OnceLock<Regex> = OnceLock::new();

fn name_re() -> &'static Regex {
    NAME_RE.get_or_init(|| Regex::new(r"^[a-z0-9][a-z0-9\-]*[a-z0-9]$|^[a-z0-9]$").unwrap())
}

/// Validate a phase, step, or service name.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > 64 || !name_re().is_match(name) {
        return Err(LabrigError::InvalidName(name.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_names() {
        for name in ["packages", "database-config", "a", "lab-db-1"] {
            validate_name(name).unwrap_or_else(|_| panic!("expected valid: {name}"));
        }
    }

    #[test]
    fn invalid_names() {
        for name in [
            "",
            "-leading-dash",
            "trailing-dash-",
            "has spaces",
            "UPPER",
            "a_b",
        ] {
            assert!(validate_name(name).is_err(), "expected invalid: {name}");
        }
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/opt/lab");
        assert_eq!(
            config_path(root),
            PathBuf::from("/opt/lab/.labrig/config.yaml")
        );
        assert_eq!(
            marker_db_path(root),
            PathBuf::from("/opt/lab/.labrig/markers.redb")
        );
        assert_eq!(
            journal_path(root),
            PathBuf::from("/opt/lab/.labrig/journal.log")
        );
    }
}
