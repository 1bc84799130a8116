/// Unified error types for the innovation pipeline
use thiserror::Error;

/// Main error type for pipeline operations
///
/// Domain refusals (unknown ids, empty reject reasons) are reported as
/// `false`/`None` results by the engines. This type covers the failures
/// that happen underneath them, at the storage boundary.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Collection (de)serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate registration)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for pipeline operations
pub type PipelineResult<T> = Result<T, PipelineError>;
