//! Subcommand implementations.
//!
//! Every command gets a [`Context`] holding the loaded configuration, the
//! session manager and the store gateway, and writes its output to a
//! `std::io::Write` so the formatting can be tested without a terminal.

pub mod account;
pub mod history;
pub mod ordering;

use std::sync::Arc;

use clap::Args;
use thiserror::Error;
use tracing::info;
use tuckbox_client::flows::{OrderError, ProfileError};
use tuckbox_client::transport::TransportError;
use tuckbox_client::{
    HttpTransport, OAuthSignIn, RemoteDataGateway, ReqwestTransport, SessionManager, StoreError,
};

use crate::agent::TerminalAgent;
use crate::config::CliConfig;

/// Sign-in options shared by every subcommand.
#[derive(Debug, Clone, Default, Args)]
pub struct AuthArgs {
    /// Account email
    #[arg(long, global = true, requires = "password")]
    pub email: Option<String>,

    /// Account password
    #[arg(long, global = true, requires = "email")]
    pub password: Option<String>,

    /// Sign in with Google in the browser
    #[arg(long, global = true, conflicts_with_all = ["email", "password"])]
    pub google: bool,
}

impl AuthArgs {
    const fn requested(&self) -> bool {
        self.google || self.email.is_some()
    }
}

/// Errors surfaced by commands.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("this command needs --email and --password, or --google")]
    CredentialsRequired,

    #[error("sign-in failed")]
    SignInFailed,

    #[error("sign-in cancelled")]
    Cancelled,

    #[error("Google sign-in is not configured (set TUCKBOX_OAUTH_CLIENT_ID and TUCKBOX_OAUTH_REDIRECT_URI)")]
    OAuthNotConfigured,

    #[error("no {kind} matches {value:?}")]
    UnknownChoice { kind: &'static str, value: String },

    #[error("{}", .0.user_message())]
    Order(#[from] OrderError),

    #[error("{}", .0.user_message())]
    Profile(#[from] ProfileError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Mirror(#[from] tuckbox_client::flows::MirrorError),

    #[error("output failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Shared state for one CLI invocation.
pub struct Context {
    pub config: CliConfig,
    pub sessions: SessionManager,
    pub gateway: RemoteDataGateway,
}

impl Context {
    /// Build the HTTP stack from configuration.
    ///
    /// # Errors
    ///
    /// Returns `CommandError::Transport` if the HTTP client cannot be built.
    pub fn new(config: CliConfig) -> Result<Self, CommandError> {
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new()?);
        Ok(Self {
            sessions: SessionManager::new(transport.clone(), config.client.identity.clone()),
            gateway: RemoteDataGateway::new(transport, &config.client.store),
            config,
        })
    }

    /// Sign in with whatever the user passed. Fails if they passed nothing.
    ///
    /// # Errors
    ///
    /// Returns `CredentialsRequired`, `OAuthNotConfigured`, `Cancelled` or
    /// `SignInFailed`.
    pub async fn sign_in(&mut self, auth: &AuthArgs) -> Result<(), CommandError> {
        if auth.google {
            let oauth = self
                .config
                .client
                .oauth
                .as_ref()
                .ok_or(CommandError::OAuthNotConfigured)?;
            return match self.sessions.sign_in_with_oauth(oauth, &TerminalAgent).await {
                OAuthSignIn::SignedIn(user_id) => {
                    info!(%user_id, "signed in with Google");
                    Ok(())
                }
                OAuthSignIn::Cancelled => Err(CommandError::Cancelled),
                OAuthSignIn::Failed => Err(CommandError::SignInFailed),
            };
        }

        let (Some(email), Some(password)) = (&auth.email, &auth.password) else {
            return Err(CommandError::CredentialsRequired);
        };
        self.sessions
            .sign_in(email, password)
            .await
            .map(|_| ())
            .ok_or(CommandError::SignInFailed)
    }

    /// Sign in only when options were given; stay anonymous otherwise.
    ///
    /// # Errors
    ///
    /// Same as [`Context::sign_in`] when options were given.
    pub async fn sign_in_if_requested(&mut self, auth: &AuthArgs) -> Result<(), CommandError> {
        if auth.requested() {
            self.sign_in(auth).await
        } else {
            Ok(())
        }
    }
}
