//! Entitlement checking
//!
//! Decides whether a subject owns the configured asset class:
//! - [`EntitlementAuthority`]: the external source of truth
//! - [`EntitlementCache`]: bounded LRU of positive answers
//! - [`EntitlementChecker`]: cache first, authority on miss

mod authority;
mod cache;
mod checker;
mod error;


pub use authority::{EntitlementAuthority, SteamOwnershipAuthority, DEFAULT_AUTHORITY_ENDPOINT};
pub use cache::{EntitlementCache, DEFAULT_CACHE_CAPACITY};
pub use checker::EntitlementChecker;
pub use error::EntitlementError;
