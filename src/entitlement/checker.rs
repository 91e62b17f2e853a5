//! Cache-fronted entitlement check

use std::sync::Arc;

use super::authority::EntitlementAuthority;
use super::cache::EntitlementCache;
use super::error::EntitlementError;
use crate::core::SubjectId;

/// Answers entitlement questions, consulting the authority only on a miss
pub struct EntitlementChecker {
    authority: Arc<dyn EntitlementAuthority>,
    cache: EntitlementCache,
}

impl EntitlementChecker {
    pub fn new(authority: Arc<dyn EntitlementAuthority>, cache: EntitlementCache) -> Self {
        Self { authority, cache }
    }

    /// Whether `subject` is entitled
    ///
    /// A cached grant answers immediately. Otherwise the authority is asked;
    /// a grant is cached, a refusal is not, and an authority failure is
    /// returned as an error rather than a refusal.
    pub async fn has_entitlement(&self, subject: SubjectId) -> Result<bool, EntitlementError> {
        if self.cache.is_entitled(subject) {
            tracing::trace!(subject = %subject, "Entitlement cache hit");
            return Ok(true);
        }

        let entitled = self.authority.check_ownership(subject).await?;
        if entitled {
            self.cache.mark_entitled(subject);
        }

        tracing::debug!(subject = %subject, entitled, "Entitlement authority answered");
        Ok(entitled)
    }

    pub fn cache(&self) -> &EntitlementCache {
        &self.cache
    }
}
