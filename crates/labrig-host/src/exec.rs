//! Subprocess plumbing shared by every host adapter.
//!
//! All collaborators (package manager, container runtime, systemctl, git)
//! are driven through blocking `std::process::Command` invocations with
//! captured output; the sequencer owns the only thread of control.

use crate::error::HostError;
use std::path::PathBuf;
use std::process::{Command, Stdio};

// ---------------------------------------------------------------------------
// CommandOutput
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub code: Option<i32>,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Stdout and stderr concatenated, for signal matching against tools
    /// that report on either stream.
    pub fn combined(&self) -> String {
        let mut s = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !s.is_empty() && !s.ends_with('\n') {
                s.push('\n');
            }
            s.push_str(&self.stderr);
        }
        s
    }
}

// ---------------------------------------------------------------------------
// Binary discovery
// ---------------------------------------------------------------------------

pub fn binary(name: &str) -> Result<PathBuf, HostError> {
    which::which(name).map_err(|_| HostError::MissingBinary(name.to_string()))
}

pub fn have(name: &str) -> bool {
    which::which(name).is_ok()
}

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

/// Run a command to completion, capturing output. A non-zero exit is NOT
/// an error here; callers that want that policy use [`run_checked`].
pub fn run(program: &str, args: &[&str]) -> Result<CommandOutput, HostError> {
    run_env(program, args, &[])
}

pub fn run_env(
    program: &str,
    args: &[&str],
    envs: &[(&str, &str)],
) -> Result<CommandOutput, HostError> {
    let mut cmd = Command::new(program);
    cmd.args(args).stdin(Stdio::null());
    for (k, v) in envs {
        cmd.env(k, v);
    }
    tracing::debug!("exec: {program} {}", args.join(" "));
    let output = cmd.output().map_err(|e| HostError::Spawn {
        program: program.to_string(),
        source: e,
    })?;
    Ok(CommandOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        code: output.status.code(),
    })
}

/// Run a command and treat a non-zero exit as [`HostError::CommandFailed`].
pub fn run_checked(program: &str, args: &[&str]) -> Result<CommandOutput, HostError> {
    run_checked_env(program, args, &[])
}

pub fn run_checked_env(
    program: &str,
    args: &[&str],
    envs: &[(&str, &str)],
) -> Result<CommandOutput, HostError> {
    let output = run_env(program, args, envs)?;
    if output.success() {
        return Ok(output);
    }
    let stderr = if output.stderr.trim().is_empty() {
        output.stdout.chars().take(500).collect()
    } else {
        output.stderr.chars().take(500).collect()
    };
    Err(HostError::CommandFailed {
        program: program.to_string(),
        code: output.code.unwrap_or(-1),
        stderr,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
