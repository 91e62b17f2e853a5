//! Asset delivery
//!
//! Everything between an authorized path and bytes on the wire:
//! - [`AssetStore`]: storage port, with a filesystem backend
//! - [`serve_asset`]: conditional and range-aware streaming
//! - HTTP routes, middleware and the server itself

mod delivery;
mod error;
mod routes;
mod server;
mod store;

pub use delivery::{format_http_date, parse_http_date, serve_asset};
pub use error::AssetError;
pub use routes::{download, get_token, security_headers, TokenParams};
pub use server::{GatekeeperServer, GatekeeperState};
pub use store::{AssetReader, AssetStore, FilesystemStore, StoredAsset};
