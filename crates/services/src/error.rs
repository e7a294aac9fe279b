//! Shared error types for the services crate.

use thiserror::Error;

use quiz_core::QuizError;
use storage::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `QuizController` operations.
///
/// None of these end the session; callers log them and carry on.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServiceError {
    #[error(transparent)]
    Quiz(#[from] QuizError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while assembling quiz services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QuizServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
