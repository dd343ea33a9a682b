use thiserror::Error;

pub type OrbitResult<T> = Result<T, OrbitError>;

#[derive(Error, Debug)]
pub enum OrbitError {
    #[error("Unauthorized: requires {required} or above")]
    Unauthorized { required: String },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Deletion job failed: {0}")]
    JobFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl OrbitError {
    /// Stable machine-readable code used in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            OrbitError::Unauthorized { .. } => "unauthorized",
            OrbitError::NotFound(_) => "not_found",
            OrbitError::InvalidTransition { .. } => "invalid_transition",
            OrbitError::Store(_) => "store_error",
            OrbitError::JobFailed(_) => "job_failed",
            OrbitError::Config(_) => "config_error",
            OrbitError::Serialization(_) => "serialization_error",
            OrbitError::Internal(_) => "internal_error",
        }
    }
}
