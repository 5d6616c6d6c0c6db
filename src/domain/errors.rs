//! Domain errors for the TeamBoard sync engine.

use thiserror::Error;

/// Domain-level errors that can occur while syncing or serving the board.
///
/// Pure components (state classification, annotation parsing) never
/// return these; malformed input there degrades to "no classification"
/// or "skip token".
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Malformed issue reference: {0}")]
    MalformedReference(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

impl DomainError {
    /// Whether the next triggered sync run may succeed without operator action.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

pub type DomainResult<T> = Result<T, DomainError>;

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Store(err.to_string())
    }
}

impl From<serde_json::Error> for DomainError {
    fn from(err: serde_json::Error) -> Self {
        DomainError::Serialization(err.to_string())
    }
}
