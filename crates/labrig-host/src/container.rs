//! Container runtime adapter (docker or podman) plus the two readiness
//! probes the database phase uses: structured health status, and a log
//! pattern fallback for images that ship no healthcheck.

use crate::error::HostError;
use crate::exec::{self, CommandOutput};
use labrig_core::probe::{Probe, ProbeStatus};
use regex::Regex;

// ---------------------------------------------------------------------------
// ContainerCli
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerCli {
    Docker,
    Podman,
}

impl ContainerCli {
    pub fn detect() -> Option<Self> {
        if exec::have("docker") {
            return Some(ContainerCli::Docker);
        }
        if exec::have("podman") {
            return Some(ContainerCli::Podman);
        }
        None
    }

    pub fn program(&self) -> &'static str {
        match self {
            ContainerCli::Docker => "docker",
            ContainerCli::Podman => "podman",
        }
    }
}

// ---------------------------------------------------------------------------
// RunSpec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct RunSpec {
    pub image: String,
    pub name: String,
    pub env: Vec<(String, String)>,
    pub ports: Vec<String>,
    pub volumes: Vec<String>,
    pub extra_args: Vec<String>,
}

fn run_args(spec: &RunSpec) -> Vec<String> {
    let mut args = vec![
        "run".to_string(),
        "-d".to_string(),
        "--name".to_string(),
        spec.name.clone(),
    ];
    for (k, v) in &spec.env {
        args.push("-e".to_string());
        args.push(format!("{k}={v}"));
    }
    for port in &spec.ports {
        args.push("-p".to_string());
        args.push(port.clone());
    }
    for volume in &spec.volumes {
        args.push("-v".to_string());
        args.push(volume.clone());
    }
    args.extend(spec.extra_args.iter().cloned());
    args.push(spec.image.clone());
    args
}

// ---------------------------------------------------------------------------
// HealthState
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthState {
    Healthy,
    Unhealthy,
    Starting,
    /// Running, but the image defines no healthcheck; a log-pattern
    /// probe has to provide the readiness signal.
    NoHealthcheck,
    Exited,
    Unknown,
}

/// Parse `{{.State.Status}} {{...Health.Status or "none"}}` inspect output.
fn parse_inspect(raw: &str) -> HealthState {
    let mut parts = raw.split_whitespace();
    let status = parts.next().unwrap_or("");
    let health = parts.next().unwrap_or("none");
    match status {
        "exited" | "dead" => HealthState::Exited,
        "running" => match health {
            "healthy" => HealthState::Healthy,
            "unhealthy" => HealthState::Unhealthy,
            "starting" => HealthState::Starting,
            _ => HealthState::NoHealthcheck,
        },
        "created" | "restarting" => HealthState::Starting,
        _ => HealthState::Unknown,
    }
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

impl ContainerCli {
    /// Start a detached container. Re-entry is idempotent: a name already
    /// in use means an earlier attempt (or run) already started it.
    pub fn run_detached(&self, spec: &RunSpec) -> Result<(), HostError> {
        let args = run_args(spec);
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        let out = exec::run(self.program(), &arg_refs)?;
        if out.success() {
            return Ok(());
        }
        if out.stderr.contains("already in use") {
            tracing::info!(container = %spec.name, "container already exists, reusing");
            return Ok(());
        }
        Err(HostError::CommandFailed {
            program: self.program().to_string(),
            code: out.code.unwrap_or(-1),
            stderr: out.stderr.chars().take(500).collect(),
        })
    }

    pub fn inspect_health(&self, name: &str) -> Result<HealthState, HostError> {
        let format =
            "{{.State.Status}} {{if .State.Health}}{{.State.Health.Status}}{{else}}none{{end}}";
        let out = exec::run(self.program(), &["inspect", "--format", format, name])?;
        if !out.success() {
            return Ok(HealthState::Unknown);
        }
        Ok(parse_inspect(&out.stdout))
    }

    pub fn exec_shell(&self, name: &str, script: &str) -> Result<CommandOutput, HostError> {
        exec::run(self.program(), &["exec", name, "sh", "-c", script])
    }

    pub fn logs(&self, name: &str, tail: u32) -> Result<String, HostError> {
        // Many images log to stderr; match against both streams.
        let tail = tail.to_string();
        let out = exec::run(self.program(), &["logs", "--tail", &tail, name])?;
        Ok(out.combined())
    }
}

// ---------------------------------------------------------------------------
// Probes
// ---------------------------------------------------------------------------

/// Structured readiness: the container reports a healthy state. A
/// container that exited can never become ready.
pub struct HealthyProbe {
    cli: ContainerCli,
    name: String,
}

impl HealthyProbe {
    pub fn new(cli: ContainerCli, name: impl Into<String>) -> Self {
        Self {
            cli,
            name: name.into(),
        }
    }
}

impl Probe for HealthyProbe {
    fn name(&self) -> &str {
        "container-health"
    }

    fn poll(&mut self) -> ProbeStatus {
        match self.cli.inspect_health(&self.name) {
            Ok(HealthState::Healthy) => ProbeStatus::Ready,
            Ok(HealthState::Exited) => {
                ProbeStatus::Failed(format!("container '{}' exited", self.name))
            }
            Ok(_) => ProbeStatus::Pending,
            // A flaky runtime CLI call is not evidence of failure
            Err(_) => ProbeStatus::Pending,
        }
    }
}

/// Fallback readiness: a regex matched against the container's recent
/// log output.
pub struct LogPatternProbe {
    cli: ContainerCli,
    name: String,
    pattern: Regex,
}

impl LogPatternProbe {
    pub fn new(cli: ContainerCli, name: impl Into<String>, pattern: Regex) -> Self {
        Self {
            cli,
            name: name.into(),
            pattern,
        }
    }
}

impl Probe for LogPatternProbe {
    fn name(&self) -> &str {
        "log-pattern"
    }

    fn poll(&mut self) -> ProbeStatus {
        match self.cli.logs(&self.name, 200) {
            Ok(text) if self.pattern.is_match(&text) => ProbeStatus::Ready,
            _ => ProbeStatus::Pending,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_args_ordering() {
        let spec = RunSpec {
            image: "postgres:16".to_string(),
            name: "lab-db".to_string(),
            env: vec![("POSTGRES_PASSWORD".to_string(), "lab".to_string())],
            ports: vec!["5432:5432".to_string()],
            volumes: vec!["/var/lib/lab/pg:/var/lib/postgresql/data".to_string()],
            extra_args: vec!["--shm-size=1g".to_string()],
        };
        assert_eq!(
            run_args(&spec),
            [
                "run",
                "-d",
                "--name",
                "lab-db",
                "-e",
                "POSTGRES_PASSWORD=lab",
                "-p",
                "5432:5432",
                "-v",
                "/var/lib/lab/pg:/var/lib/postgresql/data",
                "--shm-size=1g",
                "postgres:16",
            ]
        );
    }

    #[test]
    fn minimal_run_args() {
        let spec = RunSpec {
            image: "postgres:16".to_string(),
            name: "db".to_string(),
            ..Default::default()
        };
        assert_eq!(run_args(&spec), ["run", "-d", "--name", "db", "postgres:16"]);
    }

    #[test]
    fn inspect_parsing() {
        assert_eq!(parse_inspect("running healthy"), HealthState::Healthy);
        assert_eq!(parse_inspect("running unhealthy"), HealthState::Unhealthy);
        assert_eq!(parse_inspect("running starting"), HealthState::Starting);
        assert_eq!(parse_inspect("running none"), HealthState::NoHealthcheck);
        assert_eq!(parse_inspect("exited none"), HealthState::Exited);
        assert_eq!(parse_inspect("dead none"), HealthState::Exited);
        assert_eq!(parse_inspect("created none"), HealthState::Starting);
        assert_eq!(parse_inspect(""), HealthState::Unknown);
    }

    #[test]
    fn detect_does_not_panic() {
        let _ = ContainerCli::detect();
    }
}
