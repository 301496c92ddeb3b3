// Central Error Type for the Application

use crate::domain::DomainError;
use thiserror::Error;

/// Application-level error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Domain error: {0}")]
    Domain(DomainError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate job id: {0}")]
    DuplicateId(String),

    #[error("Job {0} already reached a terminal state")]
    AlreadyTerminal(String),

    #[error("Extraction error: {0}")]
    Extraction(#[from] crate::port::ExtractionError),

    #[error("Extraction timed out after {0}ms")]
    Timeout(u64),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DomainError> for AppError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::AlreadyTerminal(id) => AppError::AlreadyTerminal(id),
            DomainError::Validation(msg) => AppError::Validation(msg),
            other => AppError::Domain(other),
        }
    }
}

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

// Note: sqlx::Error conversion is handled in the infra-sqlite crate
// by mapping to AppError::Store / AppError::DuplicateId
