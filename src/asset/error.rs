//! Asset delivery error types

use thiserror::Error;

/// Asset delivery error type
#[derive(Error, Debug)]
pub enum AssetError {
    #[error("Asset not found: {path}")]
    NotFound { path: String },

    #[error("Server bind failed: {reason}")]
    BindFailed { reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {reason}")]
    Internal { reason: String },
}

impl AssetError {
    /// Check if this error should result in a 404 Not Found response
    pub fn is_not_found(&self) -> bool {
        matches!(self, AssetError::NotFound { .. })
    }
}
