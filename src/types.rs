//! Error types for the vitalog core

use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, VitalogError>;

/// Errors surfaced by the progress-ledger and achievement core
#[derive(Error, Debug)]
pub enum VitalogError {
    /// Raw log-entry input rejected before any ledger delta was attempted
    #[error("Validation error: {0}")]
    Validation(String),

    /// Storage operation failed; the triggering mutation is not reflected
    /// in progress and the caller owns the failure
    #[error("Database error: {0}")]
    Database(String),

    /// Achievement catalog could not be read; the evaluation pass aborts
    /// without partial grants
    #[error("Achievement catalog unavailable: {0}")]
    Catalog(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
