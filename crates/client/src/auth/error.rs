//! Authentication errors.
//!
//! None of these reach the UI directly: `SessionManager` logs them and
//! reports a plain "no session". They exist so the log says why.

use reqwest::StatusCode;
use thiserror::Error;
use tuckbox_core::CredentialError;

use crate::transport::TransportError;

/// Why an authentication step failed.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Email or password was empty; nothing was sent.
    #[error("email and password are required")]
    MissingCredentials,

    /// Email or password failed local validation; nothing was sent.
    #[error(transparent)]
    InvalidCredentials(#[from] CredentialError),

    /// The request never produced a status.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Non-2xx from the identity provider or token endpoint.
    #[error("{endpoint} rejected the request ({status}): {message}")]
    Rejected {
        endpoint: &'static str,
        status: StatusCode,
        message: String,
    },

    /// 2xx with a body that does not decode or lacks a required field.
    #[error("malformed response from {endpoint}: {reason}")]
    MalformedResponse {
        endpoint: &'static str,
        reason: String,
    },

    /// An endpoint URL could not be built.
    #[error("invalid endpoint URL: {0}")]
    InvalidEndpoint(#[from] url::ParseError),

    /// The user closed the browser or declined to continue.
    #[error("sign-in cancelled by the user")]
    Cancelled,

    /// The callback carried neither an authorization code nor an ID token.
    #[error("callback carried neither an authorization code nor an ID token")]
    MissingGrant,

    /// The callback did not come back to us, or its `state` did not match.
    #[error("callback rejected: {0}")]
    CallbackMismatch(String),

    /// The provider reported an error on the callback.
    #[error("identity provider returned an error: {0}")]
    ProviderError(String),

    /// The user agent itself failed (could not open a browser, read input, ...).
    #[error("user agent failed: {0}")]
    UserAgent(String),
}
