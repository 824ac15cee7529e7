//! Identity provider REST calls.
//!
//! All three endpoints live under `{base}/accounts:{method}?key={api_key}`
//! and answer with the same shape: `localId` plus `idToken` on success,
//! `{"error": {"message": "..."}}` otherwise.

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use tuckbox_core::{Email, Password, UserId};
use url::Url;

use super::{AuthError, Session};
use crate::config::{IdentityConfig, OAuthConfig};
use crate::transport::{HttpRequest, HttpTransport};

const SIGN_UP: &str = "accounts:signUp";
const SIGN_IN_WITH_PASSWORD: &str = "accounts:signInWithPassword";
const SIGN_IN_WITH_IDP: &str = "accounts:signInWithIdp";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpRequest<'a> {
    post_body: String,
    request_uri: &'a str,
    return_secure_token: bool,
    return_idp_credential: bool,
}

/// Success body. Both fields are optional here so a missing one becomes a
/// `MalformedResponse` rather than a generic decode error.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IdentityResponse {
    #[serde(default)]
    local_id: Option<String>,
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Deserialize)]
struct IdentityErrorResponse {
    error: IdentityErrorBody,
}

#[derive(Deserialize)]
struct IdentityErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Create a new identity from email and password.
///
/// # Errors
///
/// Returns `AuthError::Rejected` if the provider refuses (e.g. the email is
/// taken), or a transport/malformed-response error.
#[instrument(skip(transport, config, password), fields(email = %email))]
pub async fn sign_up(
    transport: &dyn HttpTransport,
    config: &IdentityConfig,
    email: &Email,
    password: &Password,
) -> Result<Session, AuthError> {
    let body = PasswordRequest {
        email: email.as_str(),
        password: password.expose(),
        return_secure_token: true,
    };
    call(transport, config, SIGN_UP, to_json(&body)?).await
}

/// Authenticate an existing identity. Never creates one.
///
/// Credentials go out as typed; the provider decides whether they match.
///
/// # Errors
///
/// Returns `AuthError::Rejected` for unknown emails and wrong passwords, or a
/// transport/malformed-response error.
#[instrument(skip(transport, config, password), fields(email = %email))]
pub async fn sign_in_with_password(
    transport: &dyn HttpTransport,
    config: &IdentityConfig,
    email: &str,
    password: &SecretString,
) -> Result<Session, AuthError> {
    let body = PasswordRequest {
        email,
        password: password.expose_secret(),
        return_secure_token: true,
    };
    call(transport, config, SIGN_IN_WITH_PASSWORD, to_json(&body)?).await
}

/// Trade a federated provider's ID token for a session.
///
/// # Errors
///
/// Returns `AuthError::Rejected` if the provider does not accept the token,
/// or a transport/malformed-response error.
#[instrument(skip(transport, config, oauth, id_token))]
pub async fn sign_in_with_idp(
    transport: &dyn HttpTransport,
    config: &IdentityConfig,
    oauth: &OAuthConfig,
    id_token: &SecretString,
) -> Result<Session, AuthError> {
    let post_body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("id_token", id_token.expose_secret())
        .append_pair("providerId", &oauth.provider_id)
        .finish();
    let body = IdpRequest {
        post_body,
        request_uri: oauth.redirect_uri.as_str(),
        return_secure_token: true,
        return_idp_credential: true,
    };
    call(transport, config, SIGN_IN_WITH_IDP, to_json(&body)?).await
}

fn to_json<T: Serialize>(body: &T) -> Result<serde_json::Value, AuthError> {
    serde_json::to_value(body).map_err(|e| AuthError::MalformedResponse {
        endpoint: "request encoder",
        reason: e.to_string(),
    })
}

/// `{base}/accounts:{method}?key={api_key}`
fn endpoint_url(config: &IdentityConfig, method: &str) -> Result<Url, AuthError> {
    let base = config.base_url.as_str().trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}/{method}"))?;
    url.query_pairs_mut()
        .append_pair("key", config.api_key.expose_secret());
    Ok(url)
}

async fn call(
    transport: &dyn HttpTransport,
    config: &IdentityConfig,
    endpoint: &'static str,
    body: serde_json::Value,
) -> Result<Session, AuthError> {
    let url = endpoint_url(config, endpoint)?;
    let response = transport.send(HttpRequest::post_json(url, body)).await?;
    debug!(endpoint, status = %response.status, "identity provider responded");

    if !response.is_success() {
        let message = response
            .json::<IdentityErrorResponse>()
            .ok()
            .and_then(|e| e.error.message)
            .unwrap_or_else(|| "no error message".to_string());
        return Err(AuthError::Rejected {
            endpoint,
            status: response.status,
            message,
        });
    }

    let parsed: IdentityResponse =
        response
            .json()
            .map_err(|e| AuthError::MalformedResponse {
                endpoint,
                reason: e.to_string(),
            })?;

    let missing = |field: &str| AuthError::MalformedResponse {
        endpoint,
        reason: format!("missing {field}"),
    };
    let local_id = parsed.local_id.ok_or_else(|| missing("localId"))?;
    let id_token = parsed.id_token.ok_or_else(|| missing("idToken"))?;

    Session::new(UserId::new(local_id), SecretString::from(id_token), Utc::now())
        .ok_or_else(|| missing("non-empty localId and idToken"))
}
