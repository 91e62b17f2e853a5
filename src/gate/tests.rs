//! Tests for path normalization and the decision pipeline

use super::*;

#[cfg(test)]
mod path_tests {
    use super::*;

    fn clean(raw: &str) -> Option<String> {
        normalize(raw).map(|p| p.as_str().to_string())
    }

    #[test]
    fn test_plain_paths_unchanged() {
        assert_eq!(clean("game.zip").as_deref(), Some("game.zip"));
        assert_eq!(clean("builds/v1/game.zip").as_deref(), Some("builds/v1/game.zip"));
    }

    #[test]
    fn test_redundant_segments_removed() {
        assert_eq!(clean("/builds//v1/./game.zip").as_deref(), Some("builds/v1/game.zip"));
        assert_eq!(clean("builds/v2/../v1/game.zip").as_deref(), Some("builds/v1/game.zip"));
        assert_eq!(clean("builds/v1/").as_deref(), Some("builds/v1"));
    }

    #[test]
    fn test_nothing_to_serve() {
        assert_eq!(clean(""), None);
        assert_eq!(clean("."), None);
        assert_eq!(clean("/"), None);
        assert_eq!(clean("builds/.."), None);
    }

    #[test]
    fn test_escapes_rejected() {
        assert_eq!(clean(".."), None);
        assert_eq!(clean("../../etc/passwd"), None);
        assert_eq!(clean("builds/../../secret"), None);
        assert_eq!(clean("a/b/../../../c"), None);
    }

    #[test]
    fn test_nul_rejected() {
        assert_eq!(clean("game\0.zip"), None);
    }

    #[test]
    fn test_file_name() {
        assert_eq!(normalize("builds/v1/game.zip").unwrap().file_name(), "game.zip");
        assert_eq!(normalize("readme").unwrap().file_name(), "readme");
        assert_eq!(
            normalize("a/b/c").unwrap().segments().collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
    }
}

#[cfg(test)]
mod decision_tests {
    use super::*;
    use crate::core::{IdentityClaim, SubjectId};
    use crate::entitlement::tests::CountingAuthority;
    use crate::entitlement::{EntitlementCache, EntitlementChecker};
    use crate::token::{KeyPair, KeySet, TokenCodec};
    use regex::Regex;
    use std::sync::Arc;

    struct Fixture {
        gate: Gate,
        codec: Arc<TokenCodec>,
        authority: Arc<CountingAuthority>,
    }

    fn fixture(owns: bool, skip: Option<&str>) -> Fixture {
        let codec = Arc::new(TokenCodec::new(
            KeySet::new(vec![KeyPair::generate()]).unwrap(),
            None,
        ));
        let authority = Arc::new(CountingAuthority::new(owns));
        let checker = Arc::new(EntitlementChecker::new(
            authority.clone(),
            EntitlementCache::with_capacity(16),
        ));
        let gate = Gate::new(codec.clone(), checker, skip.map(|p| Regex::new(p).unwrap()));
        Fixture {
            gate,
            codec,
            authority,
        }
    }

    impl Fixture {
        fn token_for(&self, subject: u64) -> String {
            self.codec
                .encode(&IdentityClaim::new(SubjectId(subject)))
                .unwrap()
        }
    }

    #[tokio::test]
    async fn test_entitled_subject_allowed() {
        let f = fixture(true, None);
        let token = f.token_for(42);

        let verdict = f.gate.authorize("game.zip", Some(&token)).await;
        assert_eq!(verdict, Verdict::Allow(normalize("game.zip").unwrap()));
        assert_eq!(f.authority.calls(), 1);

        // Second request is answered from the cache.
        assert!(f.gate.authorize("game.zip", Some(&token)).await.is_allowed());
        assert_eq!(f.authority.calls(), 1);
    }

    #[tokio::test]
    async fn test_allowed_path_is_normalized() {
        let f = fixture(true, None);
        let token = f.token_for(42);

        let verdict = f.gate.authorize("/builds//./v1/game.zip", Some(&token)).await;
        assert_eq!(verdict, Verdict::Allow(normalize("builds/v1/game.zip").unwrap()));
    }

    #[tokio::test]
    async fn test_missing_token() {
        let f = fixture(true, None);
        assert_eq!(
            f.gate.authorize("game.zip", None).await,
            Verdict::Deny(DenyReason::MissingToken)
        );
        assert_eq!(
            f.gate.authorize("game.zip", Some("")).await,
            Verdict::Deny(DenyReason::MissingToken)
        );
        assert_eq!(f.authority.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_token() {
        let f = fixture(true, None);
        assert_eq!(
            f.gate.authorize("game.zip", Some("garbage")).await,
            Verdict::Deny(DenyReason::InvalidToken)
        );

        let foreign = fixture(true, None).token_for(1);
        assert_eq!(
            f.gate.authorize("game.zip", Some(&foreign)).await,
            Verdict::Deny(DenyReason::InvalidToken)
        );
        assert_eq!(f.authority.calls(), 0);
    }

    #[tokio::test]
    async fn test_not_entitled() {
        let f = fixture(false, None);
        let token = f.token_for(7);
        assert_eq!(
            f.gate.authorize("game.zip", Some(&token)).await,
            Verdict::Deny(DenyReason::NotEntitled)
        );
    }

    #[tokio::test]
    async fn test_authority_failure_is_internal() {
        let f = fixture(true, None);
        f.authority.set_failing(true);
        let token = f.token_for(7);

        assert_eq!(
            f.gate.authorize("game.zip", Some(&token)).await,
            Verdict::Deny(DenyReason::Internal)
        );
    }

    #[tokio::test]
    async fn test_traversal_is_not_found_before_anything_else() {
        let f = fixture(true, Some(".*"));
        assert_eq!(
            f.gate.authorize("../../etc/passwd", None).await,
            Verdict::Deny(DenyReason::NotFound)
        );
        assert_eq!(
            f.gate.authorize("", Some("garbage")).await,
            Verdict::Deny(DenyReason::NotFound)
        );
        assert_eq!(f.authority.calls(), 0);
    }

    #[tokio::test]
    async fn test_skip_pattern_bypasses_token_and_entitlement() {
        let f = fixture(false, Some("^public/"));

        let verdict = f.gate.authorize("public/readme.txt", None).await;
        assert_eq!(verdict, Verdict::Allow(normalize("public/readme.txt").unwrap()));

        // Even a broken token is never looked at.
        assert!(f
            .gate
            .authorize("public/readme.txt", Some("garbage"))
            .await
            .is_allowed());
        assert_eq!(f.authority.calls(), 0);

        assert_eq!(
            f.gate.authorize("private/game.zip", None).await,
            Verdict::Deny(DenyReason::MissingToken)
        );
    }

    #[tokio::test]
    async fn test_skip_pattern_sees_normalized_path() {
        let f = fixture(false, Some("^public/"));
        assert!(f
            .gate
            .authorize("private/../public/readme.txt", None)
            .await
            .is_allowed());
        assert_eq!(
            f.gate.authorize("public/../private/game.zip", None).await,
            Verdict::Deny(DenyReason::MissingToken)
        );
    }

    #[test]
    fn test_deny_messages() {
        assert_eq!(DenyReason::NotFound.message(), "404 page not found");
        assert_eq!(DenyReason::MissingToken.to_string(), "missing token");
        assert_eq!(DenyReason::InvalidToken.message(), "invalid token");
        assert_eq!(DenyReason::NotEntitled.message(), "not entitled");
        assert_eq!(DenyReason::Internal.message(), "internal error");
    }
}
