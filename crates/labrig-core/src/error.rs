use thiserror::Error;

#[derive(Debug, Error)]
pub enum LabrigError {
    #[error("not initialized: run 'labrig init'")]
    NotInitialized,

    #[error("invalid name '{0}': must be lowercase alphanumeric with hyphens")]
    InvalidName(String),

    #[error("unknown phase: {0}")]
    UnknownPhase(String),

    #[error("duplicate phase: {0}")]
    DuplicatePhase(String),

    #[error("phase '{phase}' depends on '{dependency}', which is not declared before it")]
    InvalidPhaseOrder { phase: String, dependency: String },

    #[error("phase '{phase}' started before its dependency '{dependency}' completed")]
    DependencyNotMet { phase: String, dependency: String },

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("marker store error: {0}")]
    MarkerDb(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, LabrigError>;
