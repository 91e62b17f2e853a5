//! Token Codec
//!
//! Seals an [`IdentityClaim`](crate::core::IdentityClaim) into an opaque,
//! URL-safe access token and opens it again:
//! - AES-256-CTR encryption of the serialized claim under a random IV
//! - HMAC-SHA256 over context label, timestamp and ciphertext
//! - Key rotation: the first key pair encodes, every pair may decode
//! - Age window on the minting timestamp

mod codec;
mod error;
mod keys;

#[cfg(test)]
mod tests;

pub use codec::{TokenCodec, MAX_TOKEN_LEN, TOKEN_CONTEXT};
pub use error::TokenError;
pub use keys::{KeyPair, KeySet, KEY_LEN};
