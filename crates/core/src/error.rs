use crate::scheduler::Phase;

/// Result alias that carries the custom [`DreamSyncError`] type.
pub type Result<T> = std::result::Result<T, DreamSyncError>;

/// Common error type for the core crate.
#[derive(Debug, thiserror::Error)]
pub enum DreamSyncError {
    /// The scene plan failed validation or normalization.
    #[error("invalid scene plan: {0}")]
    InvalidPlan(String),
    /// An operation was called from a scheduler phase that does not allow it.
    #[error("`{op}` is not valid while the scheduler is {phase}")]
    InvalidPhase { op: &'static str, phase: Phase },
    /// The playback transport refused to start (e.g. blocked by the host
    /// environment). The scheduler stays in its previous phase so the caller
    /// may retry.
    #[error("transport error: {0}")]
    Transport(String),
    /// The prompt sink rejected a scene update.
    #[error("scene sink error: {0}")]
    Sink(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
    /// Wrapper around JSON (de)serialization errors.
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

impl DreamSyncError {
    /// Creates a transport error from any displayable cause.
    pub fn transport<T: std::fmt::Display>(cause: T) -> Self {
        Self::Transport(cause.to_string())
    }

    /// Creates a sink error from any displayable cause.
    pub fn sink<T: std::fmt::Display>(cause: T) -> Self {
        Self::Sink(cause.to_string())
    }
}
