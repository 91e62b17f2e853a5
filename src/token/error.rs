//! Token codec error types

use thiserror::Error;

/// Token codec error type
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("signing key set must contain at least one key pair")]
    EmptyKeySet,

    #[error("key {index} {field} must be 32 hex encoded bytes")]
    InvalidKey { index: usize, field: &'static str },

    #[error("token is longer than {max} bytes")]
    TooLong { max: usize },

    #[error("malformed token: {reason}")]
    Malformed { reason: &'static str },

    #[error("invalid or tampered token")]
    Tampered,

    #[error("token expired")]
    Expired,

    #[error("token payload is invalid: {reason}")]
    InvalidPayload { reason: String },

    #[error("failed to serialize claim: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("cipher initialization failed")]
    Cipher,
}

impl TokenError {
    /// Whether the error means the token itself is unacceptable, as opposed
    /// to a local failure while producing one
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            TokenError::TooLong { .. }
                | TokenError::Malformed { .. }
                | TokenError::Tampered
                | TokenError::Expired
                | TokenError::InvalidPayload { .. }
        )
    }
}
