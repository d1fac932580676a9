//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::quiz::QuizError;
use storage::repository::StorageError;

/// Errors emitted by quiz services.
///
/// Recorder failures never appear here: the workflow logs them and carries
/// on, because the in-memory attempt stays authoritative.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error("category not found: {0}")]
    CategoryNotFound(String),

    #[error("question source unavailable: {0}")]
    SourceUnavailable(String),

    #[error(transparent)]
    Quiz(#[from] QuizError),

    #[error(transparent)]
    Storage(#[from] StorageError),
}
