// Defines the application error type and a result alias using the thiserror crate.
use thiserror::Error;

pub mod response;

use crate::services::StoreError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Conflict(String),

    #[error("insufficient availability: requested {requested}, only {available} available")]
    Insufficient { requested: i64, available: i64 },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Unauthorized(String),

    // The #[from] attribute converts a StoreError into AppError::Store via the From trait.
    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),

    #[error("credential error: {0}")]
    Credential(#[from] bcrypt::BcryptError),

    // One of two paired writes landed and the other did not; the caller
    // must not assume either the pool or the project is intact.
    #[error("torn state: {0}")]
    TornState(String),
}

// Custom result type
pub type AppResult<T> = Result<T, AppError>;
