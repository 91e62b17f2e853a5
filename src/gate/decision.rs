//! Per-request authorization pipeline

use std::fmt;
use std::sync::Arc;

use regex::Regex;

use super::path::{normalize, AssetPath};
use crate::entitlement::EntitlementChecker;
use crate::token::TokenCodec;

/// Why a request was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// The path names nothing servable; indistinguishable from a missing file
    NotFound,
    MissingToken,
    InvalidToken,
    NotEntitled,
    /// The entitlement authority could not be consulted
    Internal,
}

impl DenyReason {
    /// Body text sent with the refusal
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::NotFound => "404 page not found",
            DenyReason::MissingToken => "missing token",
            DenyReason::InvalidToken => "invalid token",
            DenyReason::NotEntitled => "not entitled",
            DenyReason::Internal => "internal error",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of [`Gate::authorize`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Allow(AssetPath),
    Deny(DenyReason),
}

impl Verdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Verdict::Allow(_))
    }
}

/// Decides whether a request may fetch an asset
#[derive(Clone)]
pub struct Gate {
    codec: Arc<TokenCodec>,
    entitlements: Arc<EntitlementChecker>,
    skip_auth: Option<Regex>,
}

impl Gate {
    pub fn new(
        codec: Arc<TokenCodec>,
        entitlements: Arc<EntitlementChecker>,
        skip_auth: Option<Regex>,
    ) -> Self {
        Self {
            codec,
            entitlements,
            skip_auth,
        }
    }

    pub fn entitlements(&self) -> &EntitlementChecker {
        &self.entitlements
    }

    /// Authorize a download of `raw_path` carrying `token`
    pub async fn authorize(&self, raw_path: &str, token: Option<&str>) -> Verdict {
        match self.evaluate(raw_path, token).await {
            Ok(path) => Verdict::Allow(path),
            Err(reason) => Verdict::Deny(reason),
        }
    }

    async fn evaluate(&self, raw_path: &str, token: Option<&str>) -> Result<AssetPath, DenyReason> {
        let path = normalize(raw_path).ok_or(DenyReason::NotFound)?;

        if self.skips(&path) {
            tracing::debug!(path = %path, "Path matches skip pattern");
            return Ok(path);
        }

        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(DenyReason::MissingToken)?;

        let claim = self.codec.decode(token).map_err(|e| {
            tracing::debug!(path = %path, error = %e, "Rejected token");
            DenyReason::InvalidToken
        })?;

        let entitled = self
            .entitlements
            .has_entitlement(claim.subject)
            .await
            .map_err(|e| {
                tracing::error!(subject = %claim.subject, error = %e, "Entitlement check failed");
                DenyReason::Internal
            })?;

        if !entitled {
            tracing::debug!(subject = %claim.subject, "Subject is not entitled");
            return Err(DenyReason::NotEntitled);
        }

        Ok(path)
    }

    fn skips(&self, path: &AssetPath) -> bool {
        self.skip_auth
            .as_ref()
            .map_or(false, |pattern| pattern.is_match(path.as_str()))
    }
}
