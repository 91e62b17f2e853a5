//! Entitlement authority client
//!
//! The authority answers "does subject S own app A". Only an HTTP 200 with a
//! well-formed body counts as an answer; everything else is an error.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use super::error::EntitlementError;
use crate::core::SubjectId;

/// Steam partner ownership endpoint
pub const DEFAULT_AUTHORITY_ENDPOINT: &str =
    "https://partner.steam-api.com/ISteamUser/CheckAppOwnership/v2/";

const USER_AGENT: &str = "asset-gatekeeper";

/// External source of truth for entitlements
#[async_trait]
pub trait EntitlementAuthority: Send + Sync {
    /// Ask whether `subject` is entitled to the configured asset class
    async fn check_ownership(&self, subject: SubjectId) -> Result<bool, EntitlementError>;
}

#[derive(Debug, Deserialize)]
struct OwnershipResponse {
    appownership: AppOwnership,
}

#[derive(Debug, Deserialize)]
struct AppOwnership {
    #[serde(rename = "bool", alias = "ownsapp")]
    owns: bool,
}

/// Steam `CheckAppOwnership` client
pub struct SteamOwnershipAuthority {
    client: Client,
    endpoint: Url,
    publisher_key: SecretString,
    app_id: String,
    timeout: Duration,
}

impl SteamOwnershipAuthority {
    /// Create a client; `timeout` bounds each request end to end
    pub fn new(
        endpoint: Url,
        publisher_key: SecretString,
        app_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, EntitlementError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| EntitlementError::Client {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint,
            publisher_key,
            app_id: app_id.into(),
            timeout,
        })
    }

    pub fn app_id(&self) -> &str {
        &self.app_id
    }

    fn request_error(&self, err: reqwest::Error) -> EntitlementError {
        if err.is_timeout() {
            EntitlementError::Timeout {
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else {
            // The URL carries the publisher key in its query string.
            EntitlementError::Transport(err.without_url())
        }
    }
}

#[async_trait]
impl EntitlementAuthority for SteamOwnershipAuthority {
    async fn check_ownership(&self, subject: SubjectId) -> Result<bool, EntitlementError> {
        let steam_id = subject.to_string();

        tracing::debug!(subject = %subject, app_id = %self.app_id, "Querying entitlement authority");

        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("key", self.publisher_key.expose_secret().as_str()),
                ("appid", self.app_id.as_str()),
                ("steamid", steam_id.as_str()),
            ])
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(EntitlementError::UnexpectedStatus {
                status: status.as_u16(),
            });
        }

        let body = response.bytes().await.map_err(|e| self.request_error(e))?;
        let parsed: OwnershipResponse =
            serde_json::from_slice(&body).map_err(|e| EntitlementError::MalformedResponse {
                reason: e.to_string(),
            })?;

        Ok(parsed.appownership.owns)
    }
}
