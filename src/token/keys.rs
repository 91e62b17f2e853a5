//! Signing key set
//!
//! Each pair holds an authentication key (HMAC-SHA256) and an encryption key
//! (AES-256). Order matters: the first pair encodes new tokens, and decoding
//! tries every pair in order so tokens minted under a retired pair stay valid
//! for as long as that pair remains listed.

use std::fmt;

use rand::Rng;

use super::error::TokenError;

/// Length in bytes of both keys in a pair
pub const KEY_LEN: usize = 32;

/// One (authentication key, encryption key) pair
#[derive(Clone, PartialEq, Eq)]
pub struct KeyPair {
    authentication: [u8; KEY_LEN],
    encryption: [u8; KEY_LEN],
}

impl KeyPair {
    pub fn new(authentication: [u8; KEY_LEN], encryption: [u8; KEY_LEN]) -> Self {
        Self {
            authentication,
            encryption,
        }
    }

    /// Decode a pair from hex; `index` only labels the error
    pub fn from_hex(index: usize, authentication: &str, encryption: &str) -> Result<Self, TokenError> {
        Ok(Self {
            authentication: decode_key(authentication).ok_or(TokenError::InvalidKey {
                index,
                field: "hash_key",
            })?,
            encryption: decode_key(encryption).ok_or(TokenError::InvalidKey {
                index,
                field: "block_key",
            })?,
        })
    }

    /// Generate a fresh random pair
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        Self {
            authentication: rng.gen(),
            encryption: rng.gen(),
        }
    }

    pub fn authentication_key(&self) -> &[u8; KEY_LEN] {
        &self.authentication
    }

    pub fn encryption_key(&self) -> &[u8; KEY_LEN] {
        &self.encryption
    }

    /// Hex form of the authentication key, as written in configuration
    pub fn authentication_hex(&self) -> String {
        hex::encode(self.authentication)
    }

    /// Hex form of the encryption key, as written in configuration
    pub fn encryption_hex(&self) -> String {
        hex::encode(self.encryption)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair")
            .field("authentication", &"[REDACTED]")
            .field("encryption", &"[REDACTED]")
            .finish()
    }
}

fn decode_key(encoded: &str) -> Option<[u8; KEY_LEN]> {
    if encoded.len() != KEY_LEN * 2 {
        return None;
    }
    let bytes = hex::decode(encoded).ok()?;
    bytes.try_into().ok()
}

/// Ordered, non-empty set of key pairs
#[derive(Debug, Clone)]
pub struct KeySet {
    pairs: Vec<KeyPair>,
}

impl KeySet {
    /// Build a key set; fails if `pairs` is empty
    pub fn new(pairs: Vec<KeyPair>) -> Result<Self, TokenError> {
        if pairs.is_empty() {
            return Err(TokenError::EmptyKeySet);
        }
        Ok(Self { pairs })
    }

    /// The pair used to encode new tokens
    pub fn current(&self) -> &KeyPair {
        // Non-empty by construction.
        &self.pairs[0]
    }

    /// All pairs in decode order
    pub fn iter(&self) -> impl Iterator<Item = &KeyPair> {
        self.pairs.iter()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_key_set_rejected() {
        assert!(matches!(KeySet::new(Vec::new()), Err(TokenError::EmptyKeySet)));
    }

    #[test]
    fn test_hex_round_trip() {
        let pair = KeyPair::generate();
        let parsed =
            KeyPair::from_hex(0, &pair.authentication_hex(), &pair.encryption_hex()).unwrap();
        assert_eq!(parsed, pair);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let good = "ab".repeat(KEY_LEN);
        let short = "ab".repeat(KEY_LEN - 1);
        let long = "ab".repeat(KEY_LEN + 1);

        assert!(matches!(
            KeyPair::from_hex(2, &short, &good),
            Err(TokenError::InvalidKey { index: 2, field: "hash_key" })
        ));
        assert!(matches!(
            KeyPair::from_hex(1, &good, &long),
            Err(TokenError::InvalidKey { index: 1, field: "block_key" })
        ));
    }

    #[test]
    fn test_debug_redacts_key_material() {
        let pair = KeyPair::new([7u8; KEY_LEN], [9u8; KEY_LEN]);
        let rendered = format!("{:?}", pair);
        assert!(rendered.contains("REDACTED"));
        assert!(!rendered.contains(&pair.authentication_hex()));
    }

    #[test]
    fn test_current_is_first_pair() {
        let first = KeyPair::generate();
        let second = KeyPair::generate();
        let set = KeySet::new(vec![first.clone(), second]).unwrap();
        assert_eq!(set.current(), &first);
        assert_eq!(set.len(), 2);
    }
}
