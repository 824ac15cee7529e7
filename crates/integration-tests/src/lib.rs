//! Live integration tests for TuckBox.
//!
//! These talk to a real identity provider and document store, so every test
//! is `#[ignore]`d and needs credentials in the environment (or `.env`).
//!
//! # Running Tests
//!
//! ```bash
//! TUCKBOX_API_KEY=... TUCKBOX_DATABASE_URL=https://... \
//!     cargo test -p tuckbox-integration-tests -- --ignored
//! ```
//!
//! # Environment Variables
//!
//! - `TUCKBOX_API_KEY` - Identity provider web API key (required)
//! - `TUCKBOX_DATABASE_URL` - Store root of a disposable test database (required)
//! - `TUCKBOX_IDENTITY_URL` - Identity REST base, e.g. a local emulator (optional)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;

use secrecy::SecretString;
use tuckbox_client::config::{BusinessConfig, IdentityConfig, StoreConfig};
use tuckbox_client::{
    ClientConfig, HttpTransport, RemoteDataGateway, ReqwestTransport, SessionManager,
};
use url::Url;

/// Password used for every throwaway account.
pub const TEST_PASSWORD: &str = "tuckbox-live-test";

/// A wired-up client against the live services.
pub struct TestContext {
    pub config: ClientConfig,
    pub sessions: SessionManager,
    pub gateway: RemoteDataGateway,
}

impl TestContext {
    /// Build from the environment.
    ///
    /// # Panics
    ///
    /// Panics with a readable message if a variable is missing or invalid;
    /// these are tests.
    #[must_use]
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        let api_key = std::env::var("TUCKBOX_API_KEY").expect("TUCKBOX_API_KEY must be set");
        let mut identity = IdentityConfig::new(SecretString::from(api_key))
            .expect("default identity URL parses");
        if let Ok(base) = std::env::var("TUCKBOX_IDENTITY_URL") {
            identity.base_url = Url::parse(&base).expect("TUCKBOX_IDENTITY_URL must be a URL");
        }
        let store = StoreConfig {
            base_url: Url::parse(
                &std::env::var("TUCKBOX_DATABASE_URL").expect("TUCKBOX_DATABASE_URL must be set"),
            )
            .expect("TUCKBOX_DATABASE_URL must be a URL"),
        };

        let config = ClientConfig {
            identity,
            oauth: None,
            store,
            business: BusinessConfig::default(),
        };

        let transport: Arc<dyn HttpTransport> =
            Arc::new(ReqwestTransport::new().expect("HTTP client builds"));
        Self {
            sessions: SessionManager::new(transport.clone(), config.identity.clone()),
            gateway: RemoteDataGateway::new(transport, &config.store),
            config,
        }
    }

    /// A fresh session manager sharing nothing with `self.sessions`.
    #[must_use]
    pub fn second_device(&self) -> SessionManager {
        let transport: Arc<dyn HttpTransport> =
            Arc::new(ReqwestTransport::new().expect("HTTP client builds"));
        SessionManager::new(transport, self.config.identity.clone())
    }
}

/// An email address no earlier run has used.
#[must_use]
pub fn unique_email() -> String {
    format!("live-{}@tuckbox.test", uuid::Uuid::new_v4().simple())
}
