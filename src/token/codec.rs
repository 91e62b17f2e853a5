//! Token codec implementation
//!
//! Wire layout, before the outer URL-safe base64:
//!
//! ```text
//! <unix timestamp> | <sealed> | <mac>
//! ```
//!
//! `sealed` is URL-safe base64 of `iv || AES-256-CTR(json(claim))` and `mac`
//! is the raw HMAC-SHA256 of `<context>|<timestamp>|<sealed>`. Binding the
//! context label into the MAC keeps a token minted for one purpose from being
//! accepted in another.

use std::time::Duration;

use aes::Aes256;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

use super::error::TokenError;
use super::keys::{KeyPair, KeySet, KEY_LEN};
use crate::core::IdentityClaim;

type HmacSha256 = Hmac<Sha256>;
type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Context label bound into every token
pub const TOKEN_CONTEXT: &str = "user-info";

/// Tokens longer than this are rejected before any decoding work
pub const MAX_TOKEN_LEN: usize = 4096;

const IV_LEN: usize = 16;
const MAC_LEN: usize = 32;
const SEPARATOR: u8 = b'|';

/// Allowance for clocks running ahead of ours
const FUTURE_SKEW_SECS: i64 = 60;

/// Encodes and decodes access tokens under a [`KeySet`]
#[derive(Debug, Clone)]
pub struct TokenCodec {
    keys: KeySet,
    max_age: Option<Duration>,
}

impl TokenCodec {
    /// Create a codec; `max_age` of `None` accepts tokens of any age
    pub fn new(keys: KeySet, max_age: Option<Duration>) -> Self {
        Self { keys, max_age }
    }

    pub fn keys(&self) -> &KeySet {
        &self.keys
    }

    pub fn max_age(&self) -> Option<Duration> {
        self.max_age
    }

    /// Seal `claim` under the current key pair
    pub fn encode(&self, claim: &IdentityClaim) -> Result<String, TokenError> {
        self.encode_at(claim, Utc::now())
    }

    /// Seal `claim`, stamping the token with `now`
    pub fn encode_at(&self, claim: &IdentityClaim, now: DateTime<Utc>) -> Result<String, TokenError> {
        let pair = self.keys.current();
        let payload = serde_json::to_vec(claim)?;
        let sealed = URL_SAFE_NO_PAD.encode(seal(pair.encryption_key(), &payload)?);
        let timestamp = now.timestamp().to_string();
        let mac = authenticate(pair, timestamp.as_bytes(), sealed.as_bytes())?;

        let mut raw = Vec::with_capacity(timestamp.len() + sealed.len() + MAC_LEN + 2);
        raw.extend_from_slice(timestamp.as_bytes());
        raw.push(SEPARATOR);
        raw.extend_from_slice(sealed.as_bytes());
        raw.push(SEPARATOR);
        raw.extend_from_slice(&mac);

        Ok(URL_SAFE_NO_PAD.encode(raw))
    }

    /// Open a token, trying every key pair in order
    pub fn decode(&self, token: &str) -> Result<IdentityClaim, TokenError> {
        self.decode_at(token, Utc::now())
    }

    /// Open a token against an explicit clock
    pub fn decode_at(&self, token: &str, now: DateTime<Utc>) -> Result<IdentityClaim, TokenError> {
        if token.len() > MAX_TOKEN_LEN {
            return Err(TokenError::TooLong { max: MAX_TOKEN_LEN });
        }

        let raw = URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| TokenError::Malformed { reason: "not base64" })?;

        let mut parts = raw.splitn(3, |b| *b == SEPARATOR);
        let (timestamp, sealed, mac) = match (parts.next(), parts.next(), parts.next()) {
            (Some(timestamp), Some(sealed), Some(mac)) => (timestamp, sealed, mac),
            _ => return Err(TokenError::Malformed { reason: "missing separators" }),
        };

        // Tampered is the weakest verdict; a pair whose MAC verified but whose
        // contents failed later gives the more precise error.
        let mut failure = TokenError::Tampered;
        for pair in self.keys.iter() {
            match self.open(pair, timestamp, sealed, mac, now) {
                Ok(claim) => return Ok(claim),
                Err(TokenError::Tampered) => {}
                Err(e) => failure = e,
            }
        }

        Err(failure)
    }

    fn open(
        &self,
        pair: &KeyPair,
        timestamp: &[u8],
        sealed: &[u8],
        tag: &[u8],
        now: DateTime<Utc>,
    ) -> Result<IdentityClaim, TokenError> {
        mac_for(pair, timestamp, sealed)?
            .verify_slice(tag)
            .map_err(|_| TokenError::Tampered)?;

        let issued = std::str::from_utf8(timestamp)
            .ok()
            .and_then(|t| t.parse::<i64>().ok())
            .ok_or(TokenError::Malformed { reason: "bad timestamp" })?;
        self.check_age(issued, now)?;

        let sealed = URL_SAFE_NO_PAD
            .decode(sealed)
            .map_err(|_| TokenError::Malformed { reason: "sealed payload is not base64" })?;
        let payload = unseal(pair.encryption_key(), &sealed)?;

        serde_json::from_slice(&payload).map_err(|e| TokenError::InvalidPayload {
            reason: e.to_string(),
        })
    }

    fn check_age(&self, issued: i64, now: DateTime<Utc>) -> Result<(), TokenError> {
        let now = now.timestamp();
        if issued > now.saturating_add(FUTURE_SKEW_SECS) {
            return Err(TokenError::Expired);
        }
        if let Some(max_age) = self.max_age {
            let max_age = i64::try_from(max_age.as_secs()).unwrap_or(i64::MAX);
            if issued < now.saturating_sub(max_age) {
                return Err(TokenError::Expired);
            }
        }
        Ok(())
    }
}

fn mac_for(pair: &KeyPair, timestamp: &[u8], sealed: &[u8]) -> Result<HmacSha256, TokenError> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(pair.authentication_key())
        .map_err(|_| TokenError::Cipher)?;
    mac.update(TOKEN_CONTEXT.as_bytes());
    mac.update(&[SEPARATOR]);
    mac.update(timestamp);
    mac.update(&[SEPARATOR]);
    mac.update(sealed);
    Ok(mac)
}

fn authenticate(pair: &KeyPair, timestamp: &[u8], sealed: &[u8]) -> Result<Vec<u8>, TokenError> {
    Ok(mac_for(pair, timestamp, sealed)?
        .finalize()
        .into_bytes()
        .to_vec())
}

fn seal(key: &[u8; KEY_LEN], payload: &[u8]) -> Result<Vec<u8>, TokenError> {
    let iv: [u8; IV_LEN] = rand::thread_rng().gen();
    let mut cipher = Aes256Ctr::new_from_slices(key, &iv).map_err(|_| TokenError::Cipher)?;

    let mut sealed = Vec::with_capacity(IV_LEN + payload.len());
    sealed.extend_from_slice(&iv);
    sealed.extend_from_slice(payload);
    cipher.apply_keystream(&mut sealed[IV_LEN..]);
    Ok(sealed)
}

fn unseal(key: &[u8; KEY_LEN], sealed: &[u8]) -> Result<Vec<u8>, TokenError> {
    if sealed.len() <= IV_LEN {
        return Err(TokenError::Malformed { reason: "sealed payload too short" });
    }
    let (iv, ciphertext) = sealed.split_at(IV_LEN);
    let mut cipher = Aes256Ctr::new_from_slices(key, iv).map_err(|_| TokenError::Cipher)?;

    let mut payload = ciphertext.to_vec();
    cipher.apply_keystream(&mut payload);
    Ok(payload)
}
