//! Asset Gatekeeper - entitlement-gated asset downloads
//!
//! This crate provides the core functionality for the gatekeeper including:
//! - Tamper-evident access tokens with key rotation
//! - Entitlement checks against an external authority, with an LRU cache
//! - A per-request authorization pipeline with a skip-list
//! - Conditional and range-aware asset streaming over HTTP
//! - The identity-provider callback that mints tokens

pub mod asset;
pub mod core;
pub mod entitlement;
pub mod gate;
pub mod identity;
pub mod logging;
pub mod token;

// Re-export commonly used items
pub use asset::{GatekeeperServer, GatekeeperState};
pub use crate::core::config::GatekeeperConfig;
pub use crate::core::error::{GatekeeperError, Result};
pub use gate::{DenyReason, Gate, Verdict};
pub use token::{TokenCodec, TokenError};
