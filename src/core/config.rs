//! Configuration module for Asset Gatekeeper
//!
//! Handles service configuration including:
//! - Entitlement authority credentials
//! - Token signing keys
//! - Skip-authorization rule
//! - Storage backend selection
//!
//! Raw settings are read with the `config` crate (YAML file layered with
//! `GATEKEEPER_*` environment overrides) into [`GatekeeperConfig`], then
//! validated once into [`GatekeeperSettings`]. Nothing is served until
//! validation succeeds.

use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use config::{Config, Environment, File, FileFormat};
use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use url::Url;

use super::error::ConfigError;
use crate::entitlement::{DEFAULT_AUTHORITY_ENDPOINT, DEFAULT_CACHE_CAPACITY};
use crate::identity::{CallbackOrigin, STEAM_OPENID_ENDPOINT};
use crate::logging::LoggingConfig;
use crate::token::{KeyPair, KeySet};

/// Environment variable prefix for overrides (`GATEKEEPER_APP_ID`, ...)
pub const ENV_PREFIX: &str = "GATEKEEPER";

/// Default token lifetime: 30 days
pub const DEFAULT_TOKEN_MAX_AGE_SECS: u64 = 30 * 24 * 60 * 60;

/// Default entitlement authority request timeout
pub const DEFAULT_AUTHORITY_TIMEOUT_SECS: u64 = 10;

/// Raw configuration as read from disk
///
/// Keys are matched case-insensitively, so files written with the camelCase
/// spellings (`publisherKey`, `appID`, `hashKey`, ...) load unchanged.
#[derive(Debug, Clone, Deserialize)]
pub struct GatekeeperConfig {
    /// Entitlement authority credential
    #[serde(default, alias = "publisherkey")]
    pub publisher_key: Option<SecretString>,

    /// Asset-class identifier checked against the authority
    #[serde(default, alias = "appid")]
    pub app_id: Option<String>,

    /// Signing key pairs; the first one encodes new tokens
    #[serde(default)]
    pub keys: Vec<KeyPairConfig>,

    /// Paths matching this pattern bypass authorization
    #[serde(default, alias = "skipauthregex")]
    pub skip_auth_regex: Option<String>,

    /// Externally visible base URL, used to build the identity callback URL
    #[serde(default, alias = "publicurl")]
    pub public_url: Option<String>,

    /// `Host` values the callback URL may be rebuilt from when `public_url`
    /// is unset
    #[serde(default, alias = "allowedhosts")]
    pub allowed_hosts: Vec<String>,

    #[serde(default)]
    pub token: TokenConfig,

    #[serde(default)]
    pub entitlement: EntitlementConfig,

    #[serde(default)]
    pub identity: IdentityConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// One hex-encoded signing key pair
#[derive(Debug, Clone, Deserialize)]
pub struct KeyPairConfig {
    /// Authentication (HMAC) key, 64 hex characters
    #[serde(alias = "hashkey")]
    pub hash_key: String,
    /// Encryption (AES-256) key, 64 hex characters
    #[serde(alias = "blockkey")]
    pub block_key: String,
}

/// Token settings
#[derive(Debug, Clone, Deserialize)]
pub struct TokenConfig {
    /// Maximum token age in seconds (0 disables the check)
    #[serde(default = "default_token_max_age")]
    pub max_age_secs: u64,
}

fn default_token_max_age() -> u64 {
    DEFAULT_TOKEN_MAX_AGE_SECS
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            max_age_secs: DEFAULT_TOKEN_MAX_AGE_SECS,
        }
    }
}

/// Entitlement authority and cache settings
#[derive(Debug, Clone, Deserialize)]
pub struct EntitlementConfig {
    #[serde(default = "default_authority_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_authority_timeout")]
    pub timeout_secs: u64,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// Optional lifetime of a cached grant; unset keeps grants until evicted
    #[serde(default)]
    pub cache_ttl_secs: Option<u64>,
}

fn default_authority_endpoint() -> String {
    DEFAULT_AUTHORITY_ENDPOINT.to_string()
}

fn default_authority_timeout() -> u64 {
    DEFAULT_AUTHORITY_TIMEOUT_SECS
}

fn default_cache_capacity() -> usize {
    DEFAULT_CACHE_CAPACITY
}

impl Default for EntitlementConfig {
    fn default() -> Self {
        Self {
            endpoint: default_authority_endpoint(),
            timeout_secs: DEFAULT_AUTHORITY_TIMEOUT_SECS,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            cache_ttl_secs: None,
        }
    }
}

/// Identity provider settings
#[derive(Debug, Clone, Deserialize)]
pub struct IdentityConfig {
    #[serde(default = "default_provider_url")]
    pub provider_url: String,
}

fn default_provider_url() -> String {
    STEAM_OPENID_ENDPOINT.to_string()
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            provider_url: default_provider_url(),
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,

    #[serde(default)]
    pub filesystem: FilesystemStoreConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilesystemStoreConfig {
    #[serde(default)]
    pub path: PathBuf,
}

/// Validated storage backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    Filesystem { root: PathBuf },
}

/// Validated entitlement settings
#[derive(Debug, Clone)]
pub struct EntitlementSettings {
    pub endpoint: Url,
    pub timeout: Duration,
    pub cache_capacity: NonZeroUsize,
    pub cache_ttl: Option<Duration>,
}

/// Fully validated settings, ready to build the server state from
#[derive(Debug, Clone)]
pub struct GatekeeperSettings {
    pub publisher_key: SecretString,
    pub app_id: String,
    pub key_set: KeySet,
    pub skip_auth: Option<Regex>,
    pub callback_origin: CallbackOrigin,
    pub token_max_age: Option<Duration>,
    pub entitlement: EntitlementSettings,
    pub identity_provider: Url,
    pub store: StoreBackend,
    pub logging: LoggingConfig,
}

impl GatekeeperConfig {
    /// Load configuration from a YAML file plus environment overrides
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(Self::environment())
            .build()?;

        Ok(config.try_deserialize()?)
    }

    /// Parse configuration from an in-memory YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::from_str(yaml, FileFormat::Yaml))
            .build()?;

        Ok(config.try_deserialize()?)
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
    }

    /// Validate raw configuration into [`GatekeeperSettings`]
    pub fn validate(self) -> Result<GatekeeperSettings, ConfigError> {
        let publisher_key = self
            .publisher_key
            .filter(|key| !key.expose_secret().is_empty())
            .ok_or(ConfigError::Missing("publisher_key"))?;

        let app_id = self
            .app_id
            .filter(|id| !id.is_empty())
            .ok_or(ConfigError::Missing("app_id"))?;

        if self.keys.is_empty() {
            return Err(ConfigError::Missing("keys"));
        }

        let store_kind = self
            .store
            .kind
            .filter(|kind| !kind.is_empty())
            .ok_or(ConfigError::Missing("store.type"))?;

        let pairs = self
            .keys
            .iter()
            .enumerate()
            .map(|(index, pair)| KeyPair::from_hex(index, &pair.hash_key, &pair.block_key))
            .collect::<Result<Vec<_>, _>>()?;
        let key_set = KeySet::new(pairs)?;

        let skip_auth = match self.skip_auth_regex.as_deref() {
            Some(pattern) if !pattern.is_empty() => Some(Regex::new(pattern)?),
            _ => None,
        };

        let public_url = self
            .public_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .map(|url| parse_url("public_url", url))
            .transpose()?;
        let allowed_hosts: Vec<String> = self
            .allowed_hosts
            .iter()
            .map(|host| host.trim().to_string())
            .filter(|host| !host.is_empty())
            .collect();
        let callback_origin = match public_url {
            Some(url) => CallbackOrigin::Public(url),
            None if !allowed_hosts.is_empty() => CallbackOrigin::Hosts(allowed_hosts),
            None => return Err(ConfigError::Missing("public_url or allowed_hosts")),
        };

        let store = match store_kind.as_str() {
            "filesystem" => {
                if self.store.filesystem.path.as_os_str().is_empty() {
                    return Err(ConfigError::Missing("store.filesystem.path"));
                }
                StoreBackend::Filesystem {
                    root: self.store.filesystem.path,
                }
            }
            other => return Err(ConfigError::UnknownStore(other.to_string())),
        };

        let cache_capacity = NonZeroUsize::new(self.entitlement.cache_capacity).ok_or_else(|| {
            ConfigError::Invalid("entitlement.cache_capacity must be greater than zero".to_string())
        })?;

        if self.entitlement.timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "entitlement.timeout_secs must be greater than zero".to_string(),
            ));
        }

        let entitlement = EntitlementSettings {
            endpoint: parse_url("entitlement.endpoint", &self.entitlement.endpoint)?,
            timeout: Duration::from_secs(self.entitlement.timeout_secs),
            cache_capacity,
            cache_ttl: self.entitlement.cache_ttl_secs.map(Duration::from_secs),
        };

        let token_max_age = match self.token.max_age_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };

        Ok(GatekeeperSettings {
            publisher_key,
            app_id,
            key_set,
            skip_auth,
            callback_origin,
            token_max_age,
            entitlement,
            identity_provider: parse_url("identity.provider_url", &self.identity.provider_url)?,
            store,
            logging: self.logging,
        })
    }
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        field,
        reason: e.to_string(),
    })
}
