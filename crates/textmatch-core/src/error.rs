use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum Error {
    /// Missing or empty caller input. Raised before any backend call.
    #[error("{0}")]
    Validation(String),

    /// The index backend is unreachable, failed its ping, or kept timing out.
    #[error("search backend unavailable: {0}")]
    BackendUnavailable(String),

    /// The backend answered but refused the operation.
    #[error("search backend error: {0}")]
    Backend(String),

    #[error("unit id already exists: {0}")]
    DuplicateId(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Whether retrying the same backend call may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::BackendUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
