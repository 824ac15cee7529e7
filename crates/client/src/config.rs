//! Client configuration.
//!
//! The library never reads the environment or files: the caller builds a
//! [`ClientConfig`] (the CLI does so from environment variables) and hands
//! it in. [`ClientConfig::validate`] checks the few things that would
//! otherwise fail confusingly at request time.

use std::time::Duration;

use chrono::NaiveTime;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tuckbox_core::{BusinessZone, CutoffPolicy};
use url::Url;

/// Default identity provider REST base.
pub const DEFAULT_IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
/// Default OAuth authorization endpoint.
pub const DEFAULT_AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
/// Default OAuth token endpoint.
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
/// Provider id passed to `accounts:signInWithIdp`.
pub const DEFAULT_PROVIDER_ID: &str = "google.com";
/// Scopes requested during OAuth sign-in.
pub const OAUTH_SCOPES: &str = "openid email profile";
/// Delay before the single post-sign-in retry.
pub const DEFAULT_PROPAGATION_DELAY: Duration = Duration::from_millis(500);

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must not be empty")]
    Empty(&'static str),
    #[error("invalid URL in {field}: {reason}")]
    InvalidUrl { field: &'static str, reason: String },
    #[error("{0} must use https")]
    InsecureUrl(&'static str),
}

/// Identity provider (email/password and federated sign-in).
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct IdentityConfig {
    /// Web API key appended as `?key=` to every identity call
    pub api_key: SecretString,
    /// REST base, e.g. `https://identitytoolkit.googleapis.com/v1`
    pub base_url: Url,
}

impl IdentityConfig {
    /// Config pointing at the default identity endpoint.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` only if the built-in default fails
    /// to parse.
    pub fn new(api_key: SecretString) -> Result<Self, ConfigError> {
        Ok(Self {
            api_key,
            base_url: parse_url("identity.base_url", DEFAULT_IDENTITY_BASE_URL)?,
        })
    }
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("api_key", &"[REDACTED]")
            .field("base_url", &self.base_url.as_str())
            .finish()
    }
}

/// OAuth 2.0 authorization-code-with-PKCE settings.
#[derive(Debug, Clone)]
pub struct OAuthConfig {
    /// OAuth client id
    pub client_id: String,
    pub authorization_endpoint: Url,
    pub token_endpoint: Url,
    /// HTTPS redirect registered with the provider; also sent as `requestUri`
    pub redirect_uri: Url,
    /// Where the user agent hands control back to the app
    pub app_callback_uri: Url,
    /// Provider id for `accounts:signInWithIdp`
    pub provider_id: String,
}

impl OAuthConfig {
    /// Config using the default provider endpoints.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidUrl` if either URI does not parse.
    pub fn new(
        client_id: impl Into<String>,
        redirect_uri: &str,
        app_callback_uri: &str,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            client_id: client_id.into(),
            authorization_endpoint: parse_url(
                "oauth.authorization_endpoint",
                DEFAULT_AUTHORIZATION_ENDPOINT,
            )?,
            token_endpoint: parse_url("oauth.token_endpoint", DEFAULT_TOKEN_ENDPOINT)?,
            redirect_uri: parse_url("oauth.redirect_uri", redirect_uri)?,
            app_callback_uri: parse_url("oauth.app_callback_uri", app_callback_uri)?,
            provider_id: DEFAULT_PROVIDER_ID.to_string(),
        })
    }
}

/// Remote document store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Database root, e.g. `https://tuckbox-default-rtdb.firebaseio.com`
    pub base_url: Url,
}

/// Kitchen business rules.
#[derive(Debug, Clone, Copy)]
pub struct BusinessConfig {
    pub zone: BusinessZone,
    /// Orders are accepted strictly before this local time
    pub cutoff: NaiveTime,
    /// Wait before the one retry of a post-sign-in write
    pub propagation_delay: Duration,
}

impl BusinessConfig {
    /// The cutoff rule derived from this config.
    #[must_use]
    pub const fn cutoff_policy(&self) -> CutoffPolicy {
        CutoffPolicy::new(self.zone, self.cutoff)
    }
}

impl Default for BusinessConfig {
    fn default() -> Self {
        let policy = CutoffPolicy::default();
        Self {
            zone: policy.zone(),
            cutoff: policy.cutoff(),
            propagation_delay: DEFAULT_PROPAGATION_DELAY,
        }
    }
}

/// Everything the client needs to talk to its three services.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub identity: IdentityConfig,
    /// Absent when federated sign-in is not configured
    pub oauth: Option<OAuthConfig>,
    pub store: StoreConfig,
    pub business: BusinessConfig,
}

impl ClientConfig {
    /// Check the configuration for values that cannot work.
    ///
    /// # Errors
    ///
    /// Returns the first problem found: an empty API key or client id, or a
    /// non-HTTPS redirect URI or service endpoint.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Empty("identity.api_key"));
        }
        require_https("identity.base_url", &self.identity.base_url)?;
        require_https("store.base_url", &self.store.base_url)?;

        if let Some(oauth) = &self.oauth {
            if oauth.client_id.trim().is_empty() {
                return Err(ConfigError::Empty("oauth.client_id"));
            }
            if oauth.provider_id.trim().is_empty() {
                return Err(ConfigError::Empty("oauth.provider_id"));
            }
            require_https("oauth.redirect_uri", &oauth.redirect_uri)?;
            require_https("oauth.authorization_endpoint", &oauth.authorization_endpoint)?;
            require_https("oauth.token_endpoint", &oauth.token_endpoint)?;
        }

        Ok(())
    }
}

fn parse_url(field: &'static str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidUrl {
        field,
        reason: e.to_string(),
    })
}

fn require_https(field: &'static str, url: &Url) -> Result<(), ConfigError> {
    if url.scheme() == "https" {
        Ok(())
    } else {
        Err(ConfigError::InsecureUrl(field))
    }
}
