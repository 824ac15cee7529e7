//! CLI configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `TUCKBOX_API_KEY` - Identity provider web API key
//! - `TUCKBOX_DATABASE_URL` - Remote store root (e.g. `https://tuckbox-default-rtdb.firebaseio.com`)
//!
//! ## Optional
//! - `TUCKBOX_IDENTITY_URL` - Identity REST base (default: `https://identitytoolkit.googleapis.com/v1`)
//! - `TUCKBOX_OAUTH_CLIENT_ID` - OAuth client id; enables `--google`
//! - `TUCKBOX_OAUTH_REDIRECT_URI` - HTTPS redirect registered with the provider
//! - `TUCKBOX_OAUTH_CALLBACK_URI` - App callback (default: `com.tuckbox.app://oauth2redirect`)
//! - `TUCKBOX_UTC_OFFSET_MINUTES` - Kitchen time zone offset (default: 720)
//! - `TUCKBOX_CUTOFF` - Last order time, `HH:MM` (default: 10:00)
//! - `TUCKBOX_MIRROR_DIR` - Local profile mirror directory (default: `.tuckbox`)

use std::path::PathBuf;

use chrono::NaiveTime;
use secrecy::SecretString;
use thiserror::Error;
use tuckbox_client::config::{
    BusinessConfig, ClientConfig, DEFAULT_IDENTITY_BASE_URL, IdentityConfig, OAuthConfig,
    StoreConfig,
};
use tuckbox_core::BusinessZone;
use url::Url;

const DEFAULT_CALLBACK_URI: &str = "com.tuckbox.app://oauth2redirect";
const DEFAULT_UTC_OFFSET_MINUTES: &str = "720";
const DEFAULT_CUTOFF: &str = "10:00";
const DEFAULT_MIRROR_DIR: &str = ".tuckbox";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
    #[error(transparent)]
    Client(#[from] tuckbox_client::config::ConfigError),
}

/// Everything the CLI needs.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub client: ClientConfig,
    /// Where profile copies are kept
    pub mirror_dir: PathBuf,
}

impl CliConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid,
    /// or if the API key looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from any key lookup.
    ///
    /// # Errors
    ///
    /// Same as [`CliConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(lookup);

        let api_key = env.validated_secret("TUCKBOX_API_KEY")?;
        let identity = IdentityConfig {
            api_key,
            base_url: env.url_or_default("TUCKBOX_IDENTITY_URL", DEFAULT_IDENTITY_BASE_URL)?,
        };
        let store = StoreConfig {
            base_url: parse_url("TUCKBOX_DATABASE_URL", &env.required("TUCKBOX_DATABASE_URL")?)?,
        };

        let oauth = match (
            env.optional("TUCKBOX_OAUTH_CLIENT_ID"),
            env.optional("TUCKBOX_OAUTH_REDIRECT_URI"),
        ) {
            (Some(client_id), Some(redirect_uri)) => Some(OAuthConfig::new(
                client_id,
                &redirect_uri,
                &env.or_default("TUCKBOX_OAUTH_CALLBACK_URI", DEFAULT_CALLBACK_URI),
            )?),
            (None, None) => None,
            (Some(_), None) => {
                return Err(ConfigError::MissingEnvVar(
                    "TUCKBOX_OAUTH_REDIRECT_URI".to_string(),
                ));
            }
            (None, Some(_)) => {
                return Err(ConfigError::MissingEnvVar(
                    "TUCKBOX_OAUTH_CLIENT_ID".to_string(),
                ));
            }
        };

        let offset = env
            .or_default("TUCKBOX_UTC_OFFSET_MINUTES", DEFAULT_UTC_OFFSET_MINUTES)
            .parse::<i32>()
            .ok()
            .and_then(BusinessZone::from_offset_minutes)
            .ok_or_else(|| {
                ConfigError::InvalidEnvVar(
                    "TUCKBOX_UTC_OFFSET_MINUTES".to_string(),
                    "expected minutes east of UTC, within ±24h".to_string(),
                )
            })?;
        let cutoff = NaiveTime::parse_from_str(&env.or_default("TUCKBOX_CUTOFF", DEFAULT_CUTOFF), "%H:%M")
            .map_err(|e| ConfigError::InvalidEnvVar("TUCKBOX_CUTOFF".to_string(), e.to_string()))?;

        let client = ClientConfig {
            identity,
            oauth,
            store,
            business: BusinessConfig {
                zone: offset,
                cutoff,
                ..BusinessConfig::default()
            },
        };
        client.validate()?;

        Ok(Self {
            client,
            mirror_dir: PathBuf::from(env.or_default("TUCKBOX_MIRROR_DIR", DEFAULT_MIRROR_DIR)),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get a required variable. Blank counts as missing.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable. Blank counts as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }

    fn url_or_default(&self, key: &str, default: &str) -> Result<Url, ConfigError> {
        parse_url(key, &self.or_default(key, default))
    }

    /// Load a secret and reject obvious placeholders.
    fn validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.required(key)?;
        validate_not_placeholder(&value, key)?;
        Ok(SecretString::from(value))
    }
}

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Validate that a secret is not a placeholder.
fn validate_not_placeholder(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();
    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<CliConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        CliConfig::from_lookup(|key| map.get(key).cloned())
    }

    const BASE: &[(&str, &str)] = &[
        ("TUCKBOX_API_KEY", "AIzaSyD3k9fQ0uV7wLmN2pR8sT4xY6zB1cE5gH"),
        ("TUCKBOX_DATABASE_URL", "https://tuckbox-rtdb.firebaseio.com"),
    ];

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = load(BASE).unwrap();
        assert!(config.client.oauth.is_none());
        assert_eq!(
            config.client.identity.base_url.as_str(),
            "https://identitytoolkit.googleapis.com/v1"
        );
        assert_eq!(config.client.business.cutoff_policy().cutoff_label(), "10:00");
        assert_eq!(config.mirror_dir, PathBuf::from(".tuckbox"));
    }

    #[test]
    fn test_missing_api_key() {
        let result = load(&[("TUCKBOX_DATABASE_URL", "https://db.test")]);
        assert!(matches!(result, Err(ConfigError::MissingEnvVar(ref k)) if k == "TUCKBOX_API_KEY"));
    }

    #[test]
    fn test_placeholder_api_key_rejected() {
        let result = load(&[
            ("TUCKBOX_API_KEY", "your-api-key-here"),
            ("TUCKBOX_DATABASE_URL", "https://db.test"),
        ]);
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_oauth_needs_both_halves() {
        let mut vars = BASE.to_vec();
        vars.push(("TUCKBOX_OAUTH_CLIENT_ID", "123.apps.googleusercontent.com"));
        assert!(matches!(
            load(&vars),
            Err(ConfigError::MissingEnvVar(ref k)) if k == "TUCKBOX_OAUTH_REDIRECT_URI"
        ));

        vars.push(("TUCKBOX_OAUTH_REDIRECT_URI", "https://tuckbox.firebaseapp.com/__/auth/handler"));
        let config = load(&vars).unwrap();
        let oauth = config.client.oauth.unwrap();
        assert_eq!(oauth.app_callback_uri.scheme(), "com.tuckbox.app");
    }

    #[test]
    fn test_insecure_redirect_rejected() {
        let mut vars = BASE.to_vec();
        vars.push(("TUCKBOX_OAUTH_CLIENT_ID", "123.apps.googleusercontent.com"));
        vars.push(("TUCKBOX_OAUTH_REDIRECT_URI", "http://localhost/handler"));
        assert!(matches!(load(&vars), Err(ConfigError::Client(_))));
    }

    #[test]
    fn test_business_settings() {
        let mut vars = BASE.to_vec();
        vars.push(("TUCKBOX_UTC_OFFSET_MINUTES", "0"));
        vars.push(("TUCKBOX_CUTOFF", "11:30"));
        let config = load(&vars).unwrap();
        assert_eq!(config.client.business.zone, BusinessZone::utc());
        assert_eq!(config.client.business.cutoff_policy().cutoff_label(), "11:30");

        let mut bad = BASE.to_vec();
        bad.push(("TUCKBOX_CUTOFF", "half ten"));
        assert!(matches!(load(&bad), Err(ConfigError::InvalidEnvVar(_, _))));
    }
}
