use labrig_core::step::StepError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HostError {
    #[error("required binary not found: {0}")]
    MissingBinary(String),

    #[error("no supported package manager found (need apt-get or dnf)")]
    NoPackageManager,

    #[error("no supported container runtime found (need docker or podman)")]
    NoContainerRuntime,

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with status {code}: {stderr}")]
    CommandFailed {
        program: String,
        code: i32,
        stderr: String,
    },

    #[error("download failed: {0}")]
    Http(String),

    #[error("content fetch produced an empty result at {0}")]
    EmptyContent(String),

    #[error("unit install failed: {0}")]
    UnitInstall(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl HostError {
    /// Whether another attempt could plausibly succeed. Missing binaries
    /// and absent managers won't appear between retries; everything else
    /// (network, busy daemon, slow mirror) might.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            HostError::MissingBinary(_)
                | HostError::NoPackageManager
                | HostError::NoContainerRuntime
        )
    }

    /// Classify for the step executor's retry loop.
    pub fn into_step_error(self) -> StepError {
        if self.is_retryable() {
            StepError::transient(self.to_string())
        } else {
            StepError::permanent(self.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use labrig_core::types::ErrorClass;

    #[test]
    fn missing_binary_is_permanent() {
        let e = HostError::MissingBinary("docker".to_string()).into_step_error();
        assert_eq!(e.class, ErrorClass::Permanent);
    }

    #[test]
    fn command_failure_is_transient() {
        let e = HostError::CommandFailed {
            program: "apt-get".to_string(),
            code: 100,
            stderr: "temporary failure resolving archive.ubuntu.com".to_string(),
        }
        .into_step_error();
        assert_eq!(e.class, ErrorClass::Transient);
        assert!(e.message.contains("apt-get"));
    }
}
