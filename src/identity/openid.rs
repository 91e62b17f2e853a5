//! Steam OpenID 2.0 verifier
//!
//! Stateless: the assertion is checked by posting it back to the provider
//! with `openid.mode=check_authentication`, so no association or nonce
//! store is kept here.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use url::Url;

use super::error::IdentityError;
use crate::core::SubjectId;

/// Steam's OpenID 2.0 endpoint
pub const STEAM_OPENID_ENDPOINT: &str = "https://steamcommunity.com/openid/login";

const OPENID_NS: &str = "http://specs.openid.net/auth/2.0";
const IDENTIFIER_SELECT: &str = "http://specs.openid.net/auth/2.0/identifier_select";
const PROVIDER_TIMEOUT: Duration = Duration::from_secs(10);
const USER_AGENT: &str = "asset-gatekeeper";

lazy_static! {
    static ref CLAIMED_ID: Regex =
        Regex::new(r"^https?://steamcommunity\.com/openid/id/(\d+)/?$")
            .expect("claimed id pattern is valid");
}

/// Query parameters of a callback request
pub type CallbackParams = HashMap<String, String>;

/// Where a caller is in the sign-in round trip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackStep {
    /// No assertion yet; send the caller to the provider
    Start,
    /// The caller cancelled at the provider
    Cancelled,
    /// The provider sent back an assertion to verify
    Completed,
}

impl CallbackStep {
    pub fn from_params(params: &CallbackParams) -> Self {
        match params.get("openid.mode").map(String::as_str) {
            None | Some("") => CallbackStep::Start,
            Some("cancel") => CallbackStep::Cancelled,
            Some(_) => CallbackStep::Completed,
        }
    }
}

/// A sign-in provider that can vouch for a subject id
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Classify a callback request
    fn step(&self, params: &CallbackParams) -> CallbackStep {
        CallbackStep::from_params(params)
    }

    /// URL that starts sign-in and returns to `return_to`
    fn authorization_url(&self, return_to: &Url) -> Result<Url, IdentityError>;

    /// Check the assertion in `params` and return the subject it names
    async fn verify(
        &self,
        params: &CallbackParams,
        return_to: &Url,
    ) -> Result<SubjectId, IdentityError>;
}

/// Steam Community OpenID verifier
pub struct SteamOpenId {
    client: Client,
    provider: Url,
}

impl SteamOpenId {
    pub fn new(provider: Url) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(PROVIDER_TIMEOUT)
            .build()
            .map_err(|e| IdentityError::Client {
                reason: e.to_string(),
            })?;

        Ok(Self { client, provider })
    }

    pub fn provider(&self) -> &Url {
        &self.provider
    }

    async fn check_authentication(&self, form: &BTreeMap<String, String>) -> Result<(), IdentityError> {
        let response = self
            .client
            .post(self.provider.clone())
            .form(form)
            .send()
            .await
            .map_err(IdentityError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(IdentityError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(IdentityError::Transport)?;
        if body.lines().any(|line| line.trim() == "is_valid:true") {
            Ok(())
        } else {
            Err(IdentityError::Rejected)
        }
    }
}

fn required<'a>(params: &'a CallbackParams, name: &str) -> Result<&'a str, IdentityError> {
    params
        .get(name)
        .map(String::as_str)
        .ok_or_else(|| IdentityError::MissingParameter(name.to_string()))
}

/// Build the `check_authentication` form from a positive assertion
fn verification_form(params: &CallbackParams) -> Result<BTreeMap<String, String>, IdentityError> {
    let mut form = BTreeMap::new();
    for name in ["openid.ns", "openid.assoc_handle", "openid.signed", "openid.sig"] {
        form.insert(name.to_string(), required(params, name)?.to_string());
    }

    let signed = required(params, "openid.signed")?;
    for field in signed.split(',').filter(|f| !f.is_empty() && *f != "mode") {
        let name = format!("openid.{}", field);
        let value = required(params, &name)?.to_string();
        form.insert(name, value);
    }

    form.insert("openid.mode".to_string(), "check_authentication".to_string());
    Ok(form)
}

fn subject_from_claimed_id(claimed_id: &str) -> Result<SubjectId, IdentityError> {
    CLAIMED_ID
        .captures(claimed_id)
        .and_then(|caps| caps.get(1))
        .and_then(|id| id.as_str().parse::<u64>().ok())
        .map(SubjectId)
        .ok_or_else(|| IdentityError::InvalidClaimedId {
            claimed_id: claimed_id.to_string(),
        })
}

#[async_trait]
impl IdentityVerifier for SteamOpenId {
    fn authorization_url(&self, return_to: &Url) -> Result<Url, IdentityError> {
        let realm = return_to.origin().ascii_serialization();
        if realm == "null" {
            return Err(IdentityError::InvalidUrl {
                reason: format!("'{}' has no origin", return_to),
            });
        }

        let mut url = self.provider.clone();
        url.query_pairs_mut()
            .append_pair("openid.claimed_id", IDENTIFIER_SELECT)
            .append_pair("openid.identity", IDENTIFIER_SELECT)
            .append_pair("openid.mode", "checkid_setup")
            .append_pair("openid.ns", OPENID_NS)
            .append_pair("openid.realm", &realm)
            .append_pair("openid.return_to", return_to.as_str());
        Ok(url)
    }

    async fn verify(
        &self,
        params: &CallbackParams,
        return_to: &Url,
    ) -> Result<SubjectId, IdentityError> {
        let mode = required(params, "openid.mode")?;
        if mode != "id_res" {
            return Err(IdentityError::UnexpectedMode {
                mode: mode.to_string(),
            });
        }

        let echoed = required(params, "openid.return_to")?;
        if echoed != return_to.as_str() {
            return Err(IdentityError::ReturnToMismatch {
                expected: return_to.to_string(),
                actual: echoed.to_string(),
            });
        }

        let claimed_id = required(params, "openid.claimed_id")?;
        let subject = subject_from_claimed_id(claimed_id)?;

        let form = verification_form(params)?;
        self.check_authentication(&form).await?;

        tracing::debug!(subject = %subject, "Provider confirmed assertion");
        Ok(subject)
    }
}
