//! Identity-provider callback
//!
//! `GET /get-token` walks a caller through the provider's sign-in and hands
//! back an access token. Three states, picked from `openid.mode`:
//! - Start: redirect to the provider
//! - Cancelled: the caller backed out
//! - Completed: verify the assertion, mint a token

mod callback;
mod error;
mod openid;


pub use callback::{handle_callback, CallbackOrigin, CallbackOutcome, CALLBACK_PATH};
pub use error::IdentityError;
pub use openid::{
    CallbackParams, CallbackStep, IdentityVerifier, SteamOpenId, STEAM_OPENID_ENDPOINT,
};
