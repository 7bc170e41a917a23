//! The GenAI-lab provisioning plan.
//!
//! Builds the fixed six-phase sequence from the loaded configuration.
//! Config sections that are absent contribute no steps, leaving their
//! phases trivially complete. Building the plan touches nothing on the
//! host: all detection and side effects live inside step actions, so
//! `labrig plan` works on any machine.

use labrig_core::clock::SystemClock;
use labrig_core::config::{ContentConfig, DatabaseConfig, RigConfig, RuntimeConfig};
use labrig_core::phase::Phase;
use labrig_core::probe::{self, Readiness, ReadinessCheck};
use labrig_core::service::{RestartPolicy, ServiceDeclaration};
use labrig_core::step::{RetryPolicy, Step, StepError};
use labrig_host::container::{ContainerCli, HealthyProbe, LogPatternProbe, RunSpec};
use labrig_host::content::{self, ContentSpec};
use labrig_host::pkg::PackageManager;
use labrig_host::runtime::VersionManager;
use labrig_host::systemd::Systemd;
use labrig_host::HostError;
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ProvisionPhase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisionPhase {
    Packages,
    Database,
    DatabaseConfig,
    Runtime,
    Content,
    Services,
}

impl ProvisionPhase {
    pub fn all() -> &'static [ProvisionPhase] {
        &[
            ProvisionPhase::Packages,
            ProvisionPhase::Database,
            ProvisionPhase::DatabaseConfig,
            ProvisionPhase::Runtime,
            ProvisionPhase::Content,
            ProvisionPhase::Services,
        ]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProvisionPhase::Packages => "packages",
            ProvisionPhase::Database => "database",
            ProvisionPhase::DatabaseConfig => "database-config",
            ProvisionPhase::Runtime => "runtime",
            ProvisionPhase::Content => "content",
            ProvisionPhase::Services => "services",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            ProvisionPhase::Packages => "Install OS packages",
            ProvisionPhase::Database => "Launch the database container",
            ProvisionPhase::DatabaseConfig => "Configure the database",
            ProvisionPhase::Runtime => "Install the language runtime",
            ProvisionPhase::Content => "Fetch lab content",
            ProvisionPhase::Services => "Register background services",
        }
    }
}

impl fmt::Display for ProvisionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Plan assembly
// ---------------------------------------------------------------------------

pub fn build_plan(config: &RigConfig, root: &Path) -> Vec<Phase> {
    let retry = RetryPolicy::new(config.retry.max_attempts, config.retry.base_delay());

    let mut packages = Phase::new(
        ProvisionPhase::Packages.as_str(),
        ProvisionPhase::Packages.title(),
    );
    if !config.packages.is_empty() {
        packages = packages.step(install_packages_step(config.packages.clone()).with_retry(retry));
    }

    let mut database = Phase::new(
        ProvisionPhase::Database.as_str(),
        ProvisionPhase::Database.title(),
    )
    .depends_on(ProvisionPhase::Packages.as_str());
    if let Some(db) = &config.database {
        database = database
            .step(launch_database_step(db.clone()).with_retry(retry))
            .step(wait_database_step(db.clone(), config).with_retry(retry));
    }

    let mut database_config = Phase::new(
        ProvisionPhase::DatabaseConfig.as_str(),
        ProvisionPhase::DatabaseConfig.title(),
    )
    .depends_on(ProvisionPhase::Database.as_str());
    if let Some(db) = &config.database {
        if !db.init_commands.is_empty() {
            database_config =
                database_config.step(configure_database_step(db.clone()).with_retry(retry));
        }
    }

    let mut runtime = Phase::new(
        ProvisionPhase::Runtime.as_str(),
        ProvisionPhase::Runtime.title(),
    )
    .depends_on(ProvisionPhase::Packages.as_str());
    if let Some(rt) = &config.runtime {
        runtime = runtime.step(install_runtime_step(rt.clone()).with_retry(retry));
        if !rt.libraries.is_empty() {
            runtime = runtime.step(install_libraries_step(rt.clone()).with_retry(retry));
        }
    }

    let mut lab_content = Phase::new(
        ProvisionPhase::Content.as_str(),
        ProvisionPhase::Content.title(),
    );
    if let Some(c) = &config.content {
        lab_content = lab_content.step(fetch_content_step(c.clone()).tolerable().with_retry(retry));
    }

    let mut services = Phase::new(
        ProvisionPhase::Services.as_str(),
        ProvisionPhase::Services.title(),
    )
    .depends_on(ProvisionPhase::Database.as_str());
    let unit_dir = PathBuf::from(&config.unit_dir);
    if let Some(db) = &config.database {
        services = services.step(
            register_database_service_step(db.name.clone(), unit_dir.clone(), root.to_path_buf())
                .with_retry(retry),
        );
    }
    for decl in &config.services {
        services = services.step(
            register_service_step(decl.clone(), unit_dir.clone(), root.to_path_buf())
                .with_retry(retry),
        );
    }

    vec![
        packages,
        database,
        database_config,
        runtime,
        lab_content,
        services,
    ]
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

fn host(e: HostError) -> StepError {
    e.into_step_error()
}

fn install_packages_step(packages: Vec<String>) -> Step {
    Step::new("install-os-packages", move || {
        let pm = PackageManager::detect()
            .ok_or_else(|| StepError::permanent("no supported package manager (apt-get or dnf)"))?;
        pm.refresh().map_err(host)?;
        pm.install(&packages).map_err(host)?;
        Ok(format!("{} packages via {}", packages.len(), pm.name()))
    })
}

fn container_cli() -> Result<ContainerCli, StepError> {
    ContainerCli::detect()
        .ok_or_else(|| StepError::permanent("no supported container runtime (docker or podman)"))
}

fn launch_database_step(db: DatabaseConfig) -> Step {
    Step::new("launch-database-container", move || {
        let cli = container_cli()?;
        let spec = RunSpec {
            image: db.image.clone(),
            name: db.name.clone(),
            env: db.env.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            ports: db.ports.clone(),
            volumes: db.volumes.clone(),
            extra_args: Vec::new(),
        };
        cli.run_detached(&spec).map_err(host)?;
        Ok(format!("container '{}' started via {}", db.name, cli.program()))
    })
}

fn wait_database_step(db: DatabaseConfig, config: &RigConfig) -> Step {
    let readiness = config.readiness.clone();
    Step::new("wait-database-ready", move || {
        let cli = container_cli()?;
        let mut check = ReadinessCheck::new(&db.name, readiness.interval(), readiness.timeout())
            .probe(HealthyProbe::new(cli, &db.name));
        check.progress_every = readiness.progress_every;
        if let Some(pattern) = &db.ready_log_pattern {
            let re = Regex::new(pattern)
                .map_err(|e| StepError::permanent(format!("bad ready_log_pattern: {e}")))?;
            check = check.probe(LogPatternProbe::new(cli, &db.name, re));
        }
        match probe::wait_for(&mut check, &SystemClock) {
            Readiness::Ready => Ok(format!("database '{}' ready", db.name)),
            Readiness::TimedOut => Err(StepError::transient(format!(
                "database '{}' not ready within {}s",
                db.name, readiness.timeout_secs
            ))),
            Readiness::PermanentFailure(reason) => Err(StepError::permanent(reason)),
        }
    })
}

/// Whether failure output matches one of the configured known-harmless
/// signals, downgrading the failure to a warning.
fn is_tolerated(output: &str, tolerated: &[Regex]) -> bool {
    tolerated.iter().any(|re| re.is_match(output))
}

fn configure_database_step(db: DatabaseConfig) -> Step {
    Step::new("configure-database", move || {
        let cli = container_cli()?;
        let tolerated: Vec<Regex> = db
            .tolerated_signals
            .iter()
            .filter_map(|p| Regex::new(p).ok())
            .collect();

        let mut applied = 0usize;
        let mut downgraded = 0usize;
        for command in &db.init_commands {
            let out = cli.exec_shell(&db.name, command).map_err(host)?;
            if out.success() {
                applied += 1;
                continue;
            }
            let text = out.combined();
            if is_tolerated(&text, &tolerated) {
                tracing::warn!(container = %db.name, "known-harmless configure failure: {}", text.trim());
                downgraded += 1;
                continue;
            }
            return Err(StepError::transient(format!(
                "configure command failed: {}",
                text.chars().take(300).collect::<String>()
            )));
        }
        Ok(format!("{applied} commands applied, {downgraded} tolerated"))
    })
    .tolerable()
}

fn install_runtime_step(rt: RuntimeConfig) -> Step {
    Step::new("install-runtime", move || {
        let manager = VersionManager::new(&rt.manager);
        manager.ensure_available().map_err(host)?;
        manager.install(&rt.version).map_err(host)?;
        manager.activate(&rt.version).map_err(host)?;
        Ok(format!("{} {} active", rt.manager, rt.version))
    })
}

fn install_libraries_step(rt: RuntimeConfig) -> Step {
    Step::new("install-libraries", move || {
        let manager = VersionManager::new(&rt.manager);
        manager.install_libraries(&rt.libraries).map_err(host)?;
        Ok(format!("{} libraries pinned", rt.libraries.len()))
    })
}

fn fetch_content_step(c: ContentConfig) -> Step {
    Step::new("fetch-lab-content", move || {
        let spec = ContentSpec {
            repo: c.repo.clone(),
            subset: c.subset.clone(),
            dest: PathBuf::from(&c.dest),
            archive_url: c.archive_url.clone(),
        };
        let method = content::fetch(&spec).map_err(host)?;
        Ok(format!("content at {} via {method}", c.dest))
    })
}

fn labrig_bin() -> String {
    std::env::current_exe()
        .ok()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "labrig".to_string())
}

fn systemd_for(unit_dir: &Path) -> Result<Systemd, StepError> {
    if !Systemd::is_available() {
        return Err(StepError::permanent("systemctl not found"));
    }
    Ok(Systemd::new(unit_dir))
}

fn register(
    systemd: &Systemd,
    decl: &ServiceDeclaration,
    root: &Path,
) -> Result<String, StepError> {
    let path = systemd.install(decl, &labrig_bin(), root).map_err(host)?;
    systemd.daemon_reload().map_err(host)?;
    systemd.enable_now(&decl.name).map_err(host)?;
    Ok(format!("unit {} enabled", path.display()))
}

/// The database container itself runs under the supervisor from here on:
/// the sequencer started it once, systemd owns restarts.
fn register_database_service_step(name: String, unit_dir: PathBuf, root: PathBuf) -> Step {
    Step::new("register-database-service", move || {
        let cli = container_cli()?;
        let systemd = systemd_for(&unit_dir)?;
        let decl = ServiceDeclaration {
            name: name.clone(),
            description: "Lab database container".to_string(),
            exec_start: format!("{} start -a {}", cli.program(), name),
            restart: RestartPolicy::Always,
            after: vec![format!("{}.service", cli.program())],
            requires_marker: Some(ProvisionPhase::Database.as_str().to_string()),
        };
        register(&systemd, &decl, &root)
    })
}

fn register_service_step(decl: ServiceDeclaration, unit_dir: PathBuf, root: PathBuf) -> Step {
    let id = format!("register-{}", decl.name);
    Step::new(id, move || {
        let systemd = systemd_for(&unit_dir)?;
        register(&systemd, &decl, &root)
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use labrig_core::phase;

    #[test]
    fn empty_config_builds_six_empty_phases() {
        let config = RigConfig::default();
        let plan = build_plan(&config, Path::new("/opt/lab"));
        assert_eq!(plan.len(), 6);
        assert!(plan.iter().all(|p| p.steps.is_empty()));
        let ids: Vec<&str> = plan.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(
            ids,
            ProvisionPhase::all()
                .iter()
                .map(|p| p.as_str())
                .collect::<Vec<_>>()
        );
        phase::validate_order(&plan).unwrap();
    }

    #[test]
    fn full_config_plan_is_valid_and_populated() {
        let yaml = r#"
packages: [git]
database:
  image: postgres:16
  init_commands: ["psql -c 'select 1'"]
runtime:
  version: "3.12.4"
  libraries:
    - name: torch
      version: "2.3.1"
content:
  repo: https://example.com/labs.git
  dest: /opt/lab/notebooks
services:
  - name: lab-notebook
    exec_start: jupyter lab
"#;
        let config: RigConfig = serde_yaml::from_str(yaml).unwrap();
        let plan = build_plan(&config, Path::new("/opt/lab"));
        phase::validate_order(&plan).unwrap();

        let steps_of = |id: &str| {
            plan.iter()
                .find(|p| p.id == id)
                .unwrap()
                .steps
                .iter()
                .map(|s| s.id.clone())
                .collect::<Vec<_>>()
        };
        assert_eq!(steps_of("packages"), ["install-os-packages"]);
        assert_eq!(
            steps_of("database"),
            ["launch-database-container", "wait-database-ready"]
        );
        assert_eq!(steps_of("database-config"), ["configure-database"]);
        assert_eq!(steps_of("runtime"), ["install-runtime", "install-libraries"]);
        assert_eq!(steps_of("content"), ["fetch-lab-content"]);
        assert_eq!(
            steps_of("services"),
            ["register-database-service", "register-lab-notebook"]
        );
    }

    #[test]
    fn content_step_is_tolerable() {
        let yaml = r#"
content:
  repo: https://example.com/labs.git
  dest: /opt/lab/notebooks
"#;
        let config: RigConfig = serde_yaml::from_str(yaml).unwrap();
        let plan = build_plan(&config, Path::new("/opt/lab"));
        let content_phase = plan.iter().find(|p| p.id == "content").unwrap();
        assert_eq!(
            content_phase.steps[0].failure_mode,
            labrig_core::types::FailureMode::Tolerable
        );
    }

    #[test]
    fn tolerated_signals_match_configured_patterns_only() {
        let tolerated = vec![
            Regex::new(r#"extension "\w+" already exists"#).unwrap(),
            Regex::new("role .* already exists").unwrap(),
        ];
        assert!(is_tolerated(
            "ERROR: extension \"vector\" already exists",
            &tolerated
        ));
        assert!(is_tolerated("ERROR: role \"lab\" already exists", &tolerated));
        assert!(!is_tolerated(
            "ERROR: connection to server was lost",
            &tolerated
        ));
        assert!(!is_tolerated("anything", &[]));
    }

    #[test]
    fn retry_config_applies_to_steps() {
        let yaml = r#"
retry:
  max_attempts: 7
  base_delay_secs: 1
packages: [git]
"#;
        let config: RigConfig = serde_yaml::from_str(yaml).unwrap();
        let plan = build_plan(&config, Path::new("/opt/lab"));
        let pkg_phase = plan.iter().find(|p| p.id == "packages").unwrap();
        assert_eq!(pkg_phase.steps[0].retry.max_attempts, 7);
    }
}
