use thiserror::Error;

#[derive(Error, Debug)]
pub enum WeftError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Transient error: {0}")]
    Transient(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl WeftError {
    /// Transient failures are worth retrying or falling through to the next
    /// candidate; everything else is final for the current attempt.
    pub fn is_transient(&self) -> bool {
        matches!(self, WeftError::Transient(_))
    }
}
