//! Asset Gatekeeper Core Module
//!
//! This module contains the pieces every other module leans on:
//! - Configuration loading and validation
//! - Error types and handling
//! - Identity claim types

pub mod claim;
pub mod config;
pub mod error;

// Re-export commonly used items
pub use claim::{IdentityClaim, SubjectId};
pub use config::{GatekeeperConfig, GatekeeperSettings, StoreBackend};
pub use error::{ConfigError, GatekeeperError, Result};
