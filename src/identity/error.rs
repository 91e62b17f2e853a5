//! Identity verification error types

use thiserror::Error;

/// Errors raised while verifying a provider assertion
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("return_to mismatch: expected '{expected}', got '{actual}'")]
    ReturnToMismatch { expected: String, actual: String },

    #[error("missing parameter '{0}'")]
    MissingParameter(String),

    #[error("unexpected openid.mode '{mode}'")]
    UnexpectedMode { mode: String },

    #[error("provider rejected the assertion")]
    Rejected,

    #[error("provider request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("provider returned status {status}")]
    UnexpectedStatus { status: u16 },

    #[error("claimed id '{claimed_id}' does not name a provider account")]
    InvalidClaimedId { claimed_id: String },

    #[error("invalid callback URL: {reason}")]
    InvalidUrl { reason: String },

    #[error("request carries no Host header")]
    MissingHost,

    #[error("host '{host}' is not an allowed callback host")]
    UntrustedHost { host: String },

    #[error("failed to build HTTP client: {reason}")]
    Client { reason: String },
}
