//! Tests for the token codec
//!
//! Includes unit tests and property-based tests for:
//! - Encode/decode round trips
//! - Tamper rejection
//! - Key rotation
//! - Age window

use super::*;
use crate::core::{IdentityClaim, SubjectId};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use std::time::Duration;

fn codec_with(pairs: Vec<KeyPair>) -> TokenCodec {
    TokenCodec::new(KeySet::new(pairs).unwrap(), Some(Duration::from_secs(3600)))
}

fn claim(subject: u64) -> IdentityClaim {
    IdentityClaim::issued_at(
        SubjectId(subject),
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
    )
}

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let codec = codec_with(vec![KeyPair::generate()]);
        let original = claim(76561197960287930);

        let token = codec.encode(&original).unwrap();
        let decoded = codec.decode(&token).unwrap();

        assert_eq!(decoded, original);
    }

    #[test]
    fn test_token_is_url_safe() {
        let codec = codec_with(vec![KeyPair::generate()]);
        let token = codec.encode(&claim(1)).unwrap();

        assert!(token
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_tokens_are_not_deterministic() {
        let codec = codec_with(vec![KeyPair::generate()]);
        let c = claim(7);
        assert_ne!(codec.encode(&c).unwrap(), codec.encode(&c).unwrap());
    }

    #[test]
    fn test_foreign_key_rejected() {
        let minting = codec_with(vec![KeyPair::generate()]);
        let verifying = codec_with(vec![KeyPair::generate()]);

        let token = minting.encode(&claim(5)).unwrap();
        assert!(matches!(verifying.decode(&token), Err(TokenError::Tampered)));
    }

    #[test]
    fn test_retired_key_still_decodes() {
        let retired = KeyPair::generate();
        let current = KeyPair::generate();

        let old_codec = codec_with(vec![retired.clone()]);
        let token = old_codec.encode(&claim(11)).unwrap();

        let rotated = codec_with(vec![current, retired]);
        assert_eq!(rotated.decode(&token).unwrap(), claim(11));
    }

    #[test]
    fn test_rotated_codec_encodes_with_first_pair() {
        let current = KeyPair::generate();
        let retired = KeyPair::generate();

        let rotated = codec_with(vec![current.clone(), retired.clone()]);
        let token = rotated.encode(&claim(12)).unwrap();

        assert!(codec_with(vec![current]).decode(&token).is_ok());
        assert!(codec_with(vec![retired]).decode(&token).is_err());
    }

    #[test]
    fn test_removed_key_invalidates_token() {
        let removed = KeyPair::generate();
        let token = codec_with(vec![removed]).encode(&claim(13)).unwrap();

        let codec = codec_with(vec![KeyPair::generate(), KeyPair::generate()]);
        assert!(matches!(codec.decode(&token), Err(TokenError::Tampered)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let codec = codec_with(vec![KeyPair::generate()]);
        let minted = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let token = codec.encode_at(&claim(3), minted).unwrap();

        let within = minted + ChronoDuration::minutes(59);
        assert!(codec.decode_at(&token, within).is_ok());

        let after = minted + ChronoDuration::minutes(61);
        assert!(matches!(
            codec.decode_at(&token, after),
            Err(TokenError::Expired)
        ));
    }

    #[test]
    fn test_token_from_the_future_rejected() {
        let codec = codec_with(vec![KeyPair::generate()]);
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let token = codec
            .encode_at(&claim(3), now + ChronoDuration::hours(1))
            .unwrap();

        assert!(matches!(codec.decode_at(&token, now), Err(TokenError::Expired)));
    }

    #[test]
    fn test_no_max_age_accepts_old_tokens() {
        let keys = KeySet::new(vec![KeyPair::generate()]).unwrap();
        let codec = TokenCodec::new(keys, None);
        let minted = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let token = codec.encode_at(&claim(4), minted).unwrap();

        let years_later = minted + ChronoDuration::days(3 * 365);
        assert!(codec.decode_at(&token, years_later).is_ok());
    }

    #[test]
    fn test_garbage_rejected() {
        let codec = codec_with(vec![KeyPair::generate()]);

        assert!(matches!(
            codec.decode("not a token!"),
            Err(TokenError::Malformed { .. })
        ));
        assert!(matches!(
            codec.decode(&URL_SAFE_NO_PAD.encode(b"no separators here")),
            Err(TokenError::Malformed { .. })
        ));
        assert!(codec.decode("").is_err());
    }

    #[test]
    fn test_truncated_token_rejected() {
        let codec = codec_with(vec![KeyPair::generate()]);
        let token = codec.encode(&claim(9)).unwrap();

        for cut in [1, 4, token.len() / 2, token.len() - 1] {
            assert!(codec.decode(&token[..cut]).is_err(), "cut at {}", cut);
        }
    }

    #[test]
    fn test_overlong_token_rejected() {
        let codec = codec_with(vec![KeyPair::generate()]);
        let token = "A".repeat(MAX_TOKEN_LEN + 1);
        assert!(matches!(
            codec.decode(&token),
            Err(TokenError::TooLong { .. })
        ));
    }

    #[test]
    fn test_context_label_is_bound() {
        // Re-MAC the same sealed payload under a different label; the codec
        // must refuse it even though the keys are right.
        use hmac::{Hmac, Mac};
        use sha2::Sha256;

        let pair = KeyPair::generate();
        let codec = codec_with(vec![pair.clone()]);
        let token = codec.encode(&claim(21)).unwrap();

        let raw = URL_SAFE_NO_PAD.decode(&token).unwrap();
        let mut parts = raw.splitn(3, |b| *b == b'|');
        let timestamp = parts.next().unwrap().to_vec();
        let sealed = parts.next().unwrap().to_vec();

        let mut mac = <Hmac<Sha256> as Mac>::new_from_slice(pair.authentication_key()).unwrap();
        mac.update(b"other-purpose|");
        mac.update(&timestamp);
        mac.update(b"|");
        mac.update(&sealed);
        let forged_mac = mac.finalize().into_bytes();

        let mut forged = timestamp;
        forged.push(b'|');
        forged.extend_from_slice(&sealed);
        forged.push(b'|');
        forged.extend_from_slice(&forged_mac);

        let forged = URL_SAFE_NO_PAD.encode(forged);
        assert!(matches!(codec.decode(&forged), Err(TokenError::Tampered)));
    }

    #[test]
    fn test_rejections_are_classified() {
        assert!(TokenError::Tampered.is_rejection());
        assert!(TokenError::Expired.is_rejection());
        assert!(!TokenError::Cipher.is_rejection());
        assert!(!TokenError::EmptyKeySet.is_rejection());
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

    fn key_pair_strategy() -> impl Strategy<Value = KeyPair> {
        (prop::array::uniform32(any::<u8>()), prop::array::uniform32(any::<u8>()))
            .prop_map(|(auth, enc)| KeyPair::new(auth, enc))
    }

    fn claim_strategy() -> impl Strategy<Value = IdentityClaim> {
        (any::<u64>(), 0i64..4_000_000_000i64).prop_map(|(subject, secs)| {
            IdentityClaim::issued_at(SubjectId(subject), Utc.timestamp_opt(secs, 0).unwrap())
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn prop_round_trip(
            pairs in prop::collection::vec(key_pair_strategy(), 1..4),
            original in claim_strategy()
        ) {
            let codec = TokenCodec::new(KeySet::new(pairs).unwrap(), None);
            let token = codec.encode(&original).unwrap();
            prop_assert_eq!(codec.decode(&token).unwrap(), original);
        }

        #[test]
        fn prop_single_character_tamper_rejected(
            pair in key_pair_strategy(),
            original in claim_strategy(),
            position in any::<prop::sample::Index>(),
            replacement in any::<prop::sample::Index>()
        ) {
            let codec = TokenCodec::new(KeySet::new(vec![pair]).unwrap(), None);
            let token = codec.encode(&original).unwrap();

            let mut bytes = token.into_bytes();
            let at = position.index(bytes.len());
            let mut substitute = ALPHABET[replacement.index(ALPHABET.len())];
            if substitute == bytes[at] {
                substitute = if substitute == b'A' { b'B' } else { b'A' };
            }
            bytes[at] = substitute;
            let tampered = String::from_utf8(bytes).unwrap();

            prop_assert!(codec.decode(&tampered).is_err());
        }

        #[test]
        fn prop_arbitrary_input_never_panics(input in ".{0,256}") {
            let codec = codec_with(vec![KeyPair::generate()]);
            let _ = codec.decode(&input);
        }
    }
}
