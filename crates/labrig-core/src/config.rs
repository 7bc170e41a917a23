use crate::error::{LabrigError, Result};
use crate::paths;
use crate::service::ServiceDeclaration;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

// ---------------------------------------------------------------------------
// StateConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StateBackend {
    File,
    Redb,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateConfig {
    #[serde(default = "default_backend")]
    pub backend: StateBackend,
}

fn default_backend() -> StateBackend {
    StateBackend::File
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
        }
    }
}

// ---------------------------------------------------------------------------
// RetryConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay_secs")]
    pub base_delay_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_secs() -> u64 {
    5
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay_secs(),
        }
    }
}

impl RetryConfig {
    pub fn base_delay(&self) -> Duration {
        Duration::from_secs(self.base_delay_secs)
    }
}

// ---------------------------------------------------------------------------
// ReadinessConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_progress_every")]
    pub progress_every: u32,
}

fn default_interval_secs() -> u64 {
    2
}

fn default_timeout_secs() -> u64 {
    180
}

fn default_progress_every() -> u32 {
    10
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            timeout_secs: default_timeout_secs(),
            progress_every: default_progress_every(),
        }
    }
}

impl ReadinessConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// DatabaseConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub image: String,
    #[serde(default = "default_db_name")]
    pub name: String,
    #[serde(default)]
    pub env: BTreeMap<String, String>,
    #[serde(default)]
    pub ports: Vec<String>,
    #[serde(default)]
    pub volumes: Vec<String>,
    /// Fallback readiness signal: a regex matched against container logs
    /// when the image exposes no structured healthcheck.
    #[serde(default)]
    pub ready_log_pattern: Option<String>,
    /// Shell commands run inside the container once it is ready.
    #[serde(default)]
    pub init_commands: Vec<String>,
    /// Known-noisy failure output: init command failures whose output
    /// matches one of these regexes are downgraded to warnings.
    #[serde(default)]
    pub tolerated_signals: Vec<String>,
}

fn default_db_name() -> String {
    "lab-db".to_string()
}

// ---------------------------------------------------------------------------
// RuntimeConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibrarySpec {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_manager")]
    pub manager: String,
    pub version: String,
    #[serde(default)]
    pub libraries: Vec<LibrarySpec>,
}

fn default_manager() -> String {
    "pyenv".to_string()
}

// ---------------------------------------------------------------------------
// ContentConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentConfig {
    /// Git source for lab content.
    pub repo: String,
    /// Subdirectory to fetch; the whole tree when unset.
    #[serde(default)]
    pub subset: Option<String>,
    pub dest: String,
    /// Tarball fallback when the sparse fetch yields an empty result.
    #[serde(default)]
    pub archive_url: Option<String>,
}

// ---------------------------------------------------------------------------
// RigConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigConfig {
    #[serde(default)]
    pub state: StateConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub readiness: ReadinessConfig,
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default)]
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub runtime: Option<RuntimeConfig>,
    #[serde(default)]
    pub content: Option<ContentConfig>,
    #[serde(default)]
    pub services: Vec<ServiceDeclaration>,
    #[serde(default = "default_unit_dir")]
    pub unit_dir: String,
}

fn default_unit_dir() -> String {
    "/etc/systemd/system".to_string()
}

impl Default for RigConfig {
    fn default() -> Self {
        Self {
            state: StateConfig::default(),
            retry: RetryConfig::default(),
            readiness: ReadinessConfig::default(),
            packages: Vec::new(),
            database: None,
            runtime: None,
            content: None,
            services: Vec::new(),
            unit_dir: default_unit_dir(),
        }
    }
}

impl RigConfig {
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Err(LabrigError::NotInitialized);
        }
        let data = std::fs::read_to_string(&path)?;
        let config: RigConfig = serde_yaml::from_str(&data)?;
        Ok(config)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&paths::config_path(root), data.as_bytes())
    }

    /// Reject configs the plan builder cannot act on: bad names and
    /// patterns that would only surface mid-provisioning otherwise.
    pub fn validate(&self) -> Result<()> {
        if let Some(db) = &self.database {
            paths::validate_name(&db.name)?;
            if let Some(pattern) = &db.ready_log_pattern {
                compile(pattern)?;
            }
            for pattern in &db.tolerated_signals {
                compile(pattern)?;
            }
        }
        for service in &self.services {
            paths::validate_name(&service.name)?;
        }
        Ok(())
    }
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| LabrigError::InvalidPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
