//! Error types for the guard module.

use thiserror::Error;

/// Errors produced while loading secrets or deriving guard values.
#[derive(Debug, Error)]
pub enum GuardError {
    /// A secret was not valid base32.
    #[error("invalid base32 secret: {0}")]
    InvalidSecret(String),

    /// The guard descriptor could not be read or was missing a field.
    #[error("malformed guard file: {0}")]
    MalformedGuardFile(String),
}

/// Result alias for guard operations.
pub type Result<T> = std::result::Result<T, GuardError>;
