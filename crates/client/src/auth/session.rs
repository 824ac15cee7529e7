//! The authenticated session.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use tuckbox_core::UserId;

/// A signed-in user and the bearer token the store accepts for them.
///
/// Only `SessionManager` creates sessions from provider responses; the
/// constructor is public so callers can restore one or fake one in tests.
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct Session {
    user_id: UserId,
    bearer_token: SecretString,
    obtained_at: DateTime<Utc>,
}

impl Session {
    /// Create a session. Returns `None` if the user id or token is blank.
    #[must_use]
    pub fn new(user_id: UserId, bearer_token: SecretString, obtained_at: DateTime<Utc>) -> Option<Self> {
        if user_id.is_empty() || bearer_token.expose_secret().trim().is_empty() {
            return None;
        }
        Some(Self {
            user_id,
            bearer_token,
            obtained_at,
        })
    }

    #[must_use]
    pub const fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub const fn bearer_token(&self) -> &SecretString {
        &self.bearer_token
    }

    /// When the token was issued to us.
    #[must_use]
    pub const fn obtained_at(&self) -> DateTime<Utc> {
        self.obtained_at
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("bearer_token", &"[REDACTED]")
            .field("obtained_at", &self.obtained_at)
            .finish()
    }
}
