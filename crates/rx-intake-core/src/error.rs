//! Error taxonomy for the intake core.
//!
//! Propagation policy: validation and authorization errors always surface to
//! the caller; extraction and notification failures are logged and swallowed
//! so the record's lifecycle keeps moving; illegal state transitions surface
//! as conflicts, never silently ignored.

use thiserror::Error;

use crate::db::DbError;
use crate::models::StatusError;
use rx_intake_ocr::ExtractionError;

/// Top-level error for intake operations.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Malformed or missing input (HTTP 400).
    #[error("validation error: {0}")]
    Validation(String),

    /// Caller identity missing or unusable (HTTP 401).
    #[error("unauthenticated")]
    Unauthenticated,

    /// Caller known but not allowed on this resource (HTTP 403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Record does not exist (HTTP 404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid state transition (HTTP 409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// OCR engine failure. Recovered locally during submission; surfaced
    /// only from the explicit reprocess operation.
    #[error("extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    /// Storage/email collaborator failure.
    #[error("dependency failure: {0}")]
    Dependency(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<StatusError> for CoreError {
    fn from(e: StatusError) -> Self {
        CoreError::Conflict(e.to_string())
    }
}

impl<T> From<std::sync::PoisonError<T>> for CoreError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        CoreError::Dependency(format!("lock poisoned: {e}"))
    }
}

pub type CoreResult<T> = Result<T, CoreError>;
