//! Callback protocol driver
//!
//! Independent of axum so the three states can be exercised directly.

use url::Url;

use super::error::IdentityError;
use super::openid::{CallbackParams, CallbackStep, IdentityVerifier};
use crate::core::{IdentityClaim, SubjectId};
use crate::token::TokenCodec;

/// Route the provider returns to
pub const CALLBACK_PATH: &str = "get-token";

/// Result of one callback request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    /// Send the caller to the provider
    Redirect(Url),
    /// The caller cancelled; nothing was minted
    Cancelled,
    /// A token was minted for `subject`
    Issued { subject: SubjectId, token: String },
}

/// Where the absolute callback URL comes from
///
/// The `return_to` check only protects the callback when the expected URL
/// cannot be chosen by the caller, so a request `Host` is honoured only when
/// it is on the configured list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOrigin {
    /// Fixed externally visible base URL
    Public(Url),
    /// Rebuilt from the request `Host`, which must be one of these
    Hosts(Vec<String>),
}

impl CallbackOrigin {
    /// Work out the absolute callback URL for one request
    ///
    /// With [`CallbackOrigin::Hosts`] the scheme is taken from
    /// `X-Forwarded-Proto` when a proxy set one.
    pub fn callback_url(
        &self,
        host: Option<&str>,
        forwarded_proto: Option<&str>,
    ) -> Result<Url, IdentityError> {
        let base = match self {
            CallbackOrigin::Public(url) => url.clone(),
            CallbackOrigin::Hosts(allowed) => {
                let host = host
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .ok_or(IdentityError::MissingHost)?;
                if !allowed.iter().any(|a| a.eq_ignore_ascii_case(host)) {
                    return Err(IdentityError::UntrustedHost {
                        host: host.to_string(),
                    });
                }
                let scheme = forwarded_proto
                    .and_then(|p| p.split(',').next())
                    .map(str::trim)
                    .filter(|p| *p == "http" || *p == "https")
                    .unwrap_or("http");
                Url::parse(&format!("{}://{}/", scheme, host)).map_err(|e| {
                    IdentityError::InvalidUrl {
                        reason: e.to_string(),
                    }
                })?
            }
        };

        with_trailing_slash(base)
            .join(CALLBACK_PATH)
            .map_err(|e| IdentityError::InvalidUrl {
                reason: e.to_string(),
            })
    }
}

fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

/// Drive one callback request to its outcome
pub async fn handle_callback(
    verifier: &dyn IdentityVerifier,
    codec: &TokenCodec,
    params: &CallbackParams,
    return_to: &Url,
) -> crate::Result<CallbackOutcome> {
    match verifier.step(params) {
        CallbackStep::Start => {
            let url = verifier.authorization_url(return_to)?;
            tracing::debug!(provider = %url.origin().ascii_serialization(), "Redirecting to identity provider");
            Ok(CallbackOutcome::Redirect(url))
        }
        CallbackStep::Cancelled => {
            tracing::debug!("Sign-in cancelled at identity provider");
            Ok(CallbackOutcome::Cancelled)
        }
        CallbackStep::Completed => {
            let subject = verifier.verify(params, return_to).await?;
            let token = codec.encode(&IdentityClaim::new(subject))?;
            tracing::info!(subject = %subject, "Issued access token");
            Ok(CallbackOutcome::Issued { subject, token })
        }
    }
}
