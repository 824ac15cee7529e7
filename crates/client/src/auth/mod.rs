//! Authentication and session lifecycle.
//!
//! [`SessionManager`] owns the one live [`Session`]. It signs users up and
//! in with email/password, runs the OAuth PKCE flow through a
//! [`UserAgent`], and signs out. Every failure collapses to "no session" for
//! the caller; the cause is logged.
//!
//! # States
//!
//! `Anonymous -> Authenticating -> Authenticated -> Anonymous`
//!
//! Authenticating is the span of a `&mut self` sign-in call. A session is
//! only replaced once the new attempt has fully succeeded, so a failed
//! attempt leaves any previous session in place.

mod agent;
mod error;
mod identity;
pub mod pkce;
mod session;

pub use agent::{AgentResponse, UserAgent};
pub use error::AuthError;
pub use pkce::{AuthorizationGrant, CallbackOutcome, PkceVerifier};
pub use session::Session;

use std::sync::Arc;

use secrecy::SecretString;
use tracing::{info, instrument, warn};
use tuckbox_core::{Email, Password, UserId};

use crate::config::{IdentityConfig, OAuthConfig};
use crate::transport::HttpTransport;

/// Observable session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Anonymous,
    Authenticated,
}

/// Outcome of an OAuth sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OAuthSignIn {
    SignedIn(UserId),
    /// The user backed out; not an error.
    Cancelled,
    /// Any protocol, transport or provider failure.
    Failed,
}

/// Holds the current session and performs sign-in transitions.
pub struct SessionManager {
    transport: Arc<dyn HttpTransport>,
    identity: IdentityConfig,
    session: Option<Session>,
}

impl SessionManager {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, identity: IdentityConfig) -> Self {
        Self {
            transport,
            identity,
            session: None,
        }
    }

    /// The live session, if any.
    #[must_use]
    pub const fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        if self.session.is_some() {
            SessionState::Authenticated
        } else {
            SessionState::Anonymous
        }
    }

    /// Create an account and sign into it.
    ///
    /// Returns the new user id, or `None` on any failure.
    #[instrument(skip(self, email, password))]
    pub async fn sign_up(&mut self, email: &str, password: &str) -> Option<UserId> {
        let result = match parse_credentials(email, password) {
            Ok((email, password)) => {
                info!("authenticating: sign-up");
                identity::sign_up(self.transport.as_ref(), &self.identity, &email, &password).await
            }
            Err(e) => Err(e),
        };
        self.settle("sign-up", result)
    }

    /// Sign into an existing account. Never creates one.
    ///
    /// Only empty credentials are refused locally; anything else is sent to
    /// the provider as typed.
    ///
    /// Returns the user id, or `None` on any failure.
    #[instrument(skip(self, email, password))]
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Option<UserId> {
        let result = match require_credentials(email, password) {
            Ok(()) => {
                info!("authenticating: password sign-in");
                identity::sign_in_with_password(
                    self.transport.as_ref(),
                    &self.identity,
                    email.trim(),
                    &SecretString::from(password.to_owned()),
                )
                .await
            }
            Err(e) => Err(e),
        };
        self.settle("sign-in", result)
    }

    /// Run the OAuth authorization code flow with PKCE.
    #[instrument(skip_all)]
    pub async fn sign_in_with_oauth(
        &mut self,
        oauth: &OAuthConfig,
        agent: &dyn UserAgent,
    ) -> OAuthSignIn {
        info!("authenticating: oauth");
        let result = self.oauth_session(oauth, agent).await;
        match result {
            Err(AuthError::Cancelled) => {
                info!("oauth sign-in cancelled by user");
                OAuthSignIn::Cancelled
            }
            result => self
                .settle("oauth sign-in", result)
                .map_or(OAuthSignIn::Failed, OAuthSignIn::SignedIn),
        }
    }

    /// Drop the session. Always succeeds.
    pub fn sign_out(&mut self) {
        if let Some(session) = self.session.take() {
            info!(user_id = %session.user_id(), "signed out");
        }
    }

    async fn oauth_session(
        &self,
        oauth: &OAuthConfig,
        agent: &dyn UserAgent,
    ) -> Result<Session, AuthError> {
        let verifier = PkceVerifier::generate();
        let state = pkce::generate_state();
        let url = pkce::authorization_url(oauth, &verifier.challenge(), &state)?;

        let callback = match agent.authorize(&url, &oauth.app_callback_uri).await? {
            AgentResponse::Cancelled => return Err(AuthError::Cancelled),
            AgentResponse::Redirected(callback) => callback,
        };

        let id_token =
            match pkce::parse_callback(&callback, &oauth.app_callback_uri, &state).into_result()? {
                AuthorizationGrant::Code(code) => {
                    pkce::exchange_code(self.transport.as_ref(), oauth, &code, &verifier).await?
                }
                AuthorizationGrant::IdToken(token) => token,
            };

        identity::sign_in_with_idp(self.transport.as_ref(), &self.identity, oauth, &id_token).await
    }

    /// Install a successful session, or log the failure and keep the old one.
    fn settle(&mut self, action: &str, result: Result<Session, AuthError>) -> Option<UserId> {
        match result {
            Ok(session) => {
                let user_id = session.user_id().clone();
                info!(%user_id, action, "authenticated");
                self.session = Some(session);
                Some(user_id)
            }
            Err(e) => {
                warn!(error = %e, action, "authentication failed");
                None
            }
        }
    }
}

fn require_credentials(email: &str, password: &str) -> Result<(), AuthError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }
    Ok(())
}

fn parse_credentials(email: &str, password: &str) -> Result<(Email, Password), AuthError> {
    require_credentials(email, password)?;
    Ok((Email::parse(email)?, Password::parse(password)?))
}
