//! Error types for Asset Gatekeeper
//!
//! Module-level errors live next to the code that raises them; this module
//! holds configuration errors and the aggregate [`GatekeeperError`].

use thiserror::Error;

use crate::asset::AssetError;
use crate::entitlement::EntitlementError;
use crate::identity::IdentityError;
use crate::logging::LoggingError;
use crate::token::TokenError;

/// Result type alias for gatekeeper operations
pub type Result<T> = std::result::Result<T, GatekeeperError>;

/// Main error type for Asset Gatekeeper
#[derive(Error, Debug)]
pub enum GatekeeperError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Token error: {0}")]
    Token(#[from] TokenError),

    #[error("Entitlement error: {0}")]
    Entitlement(#[from] EntitlementError),

    #[error("Identity error: {0}")]
    Identity(#[from] IdentityError),

    #[error("Asset error: {0}")]
    Asset(#[from] AssetError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
///
/// All of these are fatal at startup; none can surface while serving.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("{0} missing")]
    Missing(&'static str),

    #[error(transparent)]
    Key(#[from] TokenError),

    #[error("skip_auth_regex is invalid: {0}")]
    InvalidRegex(#[from] regex::Error),

    #[error("{field} is not a valid URL: {reason}")]
    InvalidUrl { field: &'static str, reason: String },

    #[error("invalid store type: {0}")]
    UnknownStore(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
