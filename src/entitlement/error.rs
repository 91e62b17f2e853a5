//! Entitlement error types

use thiserror::Error;

/// Failure to obtain an authoritative entitlement answer
///
/// None of these mean "not entitled"; callers must not treat them that way.
#[derive(Error, Debug)]
pub enum EntitlementError {
    #[error("entitlement authority request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("entitlement authority timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("entitlement authority returned status {status}, is the app id yours?")]
    UnexpectedStatus { status: u16 },

    #[error("entitlement authority response malformed: {reason}")]
    MalformedResponse { reason: String },

    #[error("entitlement authority client could not be built: {reason}")]
    Client { reason: String },
}
