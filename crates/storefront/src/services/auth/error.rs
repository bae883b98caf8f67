//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::models::FieldErrors;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Form input failed validation; messages are shown next to the fields.
    #[error("validation failed: {0}")]
    Validation(FieldErrors),

    /// Unknown email, malformed email, or wrong password. Deliberately
    /// indistinguishable.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}
