//! OAuth 2.0 authorization code flow with PKCE (RFC 7636).
//!
//! Stateless helpers: verifier and challenge generation, the authorization
//! URL, callback parsing and the code-for-token exchange. The orchestration
//! that strings them together lives on `SessionManager`.

use std::collections::HashMap;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};
use url::Url;

use super::AuthError;
use crate::config::{OAUTH_SCOPES, OAuthConfig};
use crate::transport::{HttpRequest, HttpTransport};

const TOKEN_ENDPOINT: &str = "token endpoint";

/// A PKCE code verifier: 32 random bytes, base64url without padding.
///
/// Lives only for the duration of one sign-in attempt.
pub struct PkceVerifier(SecretString);

impl PkceVerifier {
    /// Generate a fresh verifier from the thread CSPRNG.
    #[must_use]
    pub fn generate() -> Self {
        Self(SecretString::from(random_token(32)))
    }

    /// The verifier text, as sent to the token endpoint.
    #[must_use]
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// The S256 challenge for this verifier.
    #[must_use]
    pub fn challenge(&self) -> String {
        challenge_for(self.expose())
    }
}

/// `base64url(SHA-256(verifier))`, no padding.
#[must_use]
pub fn challenge_for(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// A random `state` value binding the callback to this attempt.
#[must_use]
pub fn generate_state() -> String {
    random_token(16)
}

fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Build the URL the user agent should open.
///
/// # Errors
///
/// Returns `AuthError::InvalidEndpoint` only if the configured endpoint
/// cannot carry a query.
pub fn authorization_url(
    config: &OAuthConfig,
    challenge: &str,
    state: &str,
) -> Result<Url, AuthError> {
    if config.authorization_endpoint.cannot_be_a_base() {
        return Err(AuthError::InvalidEndpoint(
            url::ParseError::RelativeUrlWithCannotBeABaseBase,
        ));
    }
    let mut url = config.authorization_endpoint.clone();
    url.query_pairs_mut()
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", config.redirect_uri.as_str())
        .append_pair("response_type", "code")
        .append_pair("scope", OAUTH_SCOPES)
        .append_pair("code_challenge", challenge)
        .append_pair("code_challenge_method", "S256")
        .append_pair("prompt", "select_account")
        .append_pair("state", state);
    Ok(url)
}

/// What the provider handed back.
pub enum AuthorizationGrant {
    /// Authorization code, to be exchanged at the token endpoint.
    Code(String),
    /// The provider skipped the code and returned an ID token directly.
    IdToken(SecretString),
}

impl std::fmt::Debug for AuthorizationGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Code(_) => f.write_str("Code([REDACTED])"),
            Self::IdToken(_) => f.write_str("IdToken([REDACTED])"),
        }
    }
}

/// Result of parsing a callback URL.
#[derive(Debug)]
pub enum CallbackOutcome {
    Grant(AuthorizationGrant),
    Failed(AuthError),
}

impl CallbackOutcome {
    /// Convert into a `Result` for `?` chaining.
    ///
    /// # Errors
    ///
    /// Returns the failure reason for `Failed`.
    pub fn into_result(self) -> Result<AuthorizationGrant, AuthError> {
        match self {
            Self::Grant(grant) => Ok(grant),
            Self::Failed(err) => Err(err),
        }
    }
}

/// Parse the URL the user agent was redirected to.
///
/// Query parameters take precedence over fragment parameters. The callback
/// must come back on the configured app callback (same scheme, host and
/// path) and must carry the `state` that was sent.
#[must_use]
pub fn parse_callback(callback: &Url, expected: &Url, expected_state: &str) -> CallbackOutcome {
    if callback.scheme() != expected.scheme()
        || callback.host_str() != expected.host_str()
        || callback.path().trim_end_matches('/') != expected.path().trim_end_matches('/')
    {
        return CallbackOutcome::Failed(AuthError::CallbackMismatch(format!(
            "expected {}://, got {}://",
            expected.scheme(),
            callback.scheme()
        )));
    }

    let mut params: HashMap<String, String> = callback.query_pairs().into_owned().collect();
    if let Some(fragment) = callback.fragment() {
        for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()).into_owned() {
            params.entry(key).or_insert(value);
        }
    }

    if let Some(error) = params.get("error") {
        let detail = params
            .get("error_description")
            .map_or_else(|| error.clone(), |d| format!("{error}: {d}"));
        return CallbackOutcome::Failed(AuthError::ProviderError(detail));
    }

    match params.get("state") {
        Some(state) if state == expected_state => {}
        Some(_) => {
            return CallbackOutcome::Failed(AuthError::CallbackMismatch(
                "state does not match".to_string(),
            ));
        }
        None => {
            return CallbackOutcome::Failed(AuthError::CallbackMismatch(
                "state missing".to_string(),
            ));
        }
    }

    if let Some(code) = params.remove("code").filter(|c| !c.is_empty()) {
        return CallbackOutcome::Grant(AuthorizationGrant::Code(code));
    }
    if let Some(token) = params.remove("id_token").filter(|t| !t.is_empty()) {
        return CallbackOutcome::Grant(AuthorizationGrant::IdToken(SecretString::from(token)));
    }
    CallbackOutcome::Failed(AuthError::MissingGrant)
}

#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// Exchange an authorization code for the provider's ID token.
///
/// # Errors
///
/// Returns `AuthError::Rejected` on non-2xx and
/// `AuthError::MalformedResponse` if the body has no `id_token`.
#[instrument(skip_all)]
pub async fn exchange_code(
    transport: &dyn HttpTransport,
    config: &OAuthConfig,
    code: &str,
    verifier: &PkceVerifier,
) -> Result<SecretString, AuthError> {
    let fields = vec![
        ("code".to_string(), code.to_string()),
        ("client_id".to_string(), config.client_id.clone()),
        ("code_verifier".to_string(), verifier.expose().to_string()),
        ("redirect_uri".to_string(), config.redirect_uri.to_string()),
        ("grant_type".to_string(), "authorization_code".to_string()),
    ];

    let response = transport
        .send(HttpRequest::post_form(config.token_endpoint.clone(), fields))
        .await?;
    debug!(status = %response.status, "token endpoint responded");

    if !response.is_success() {
        let message = response
            .json::<TokenErrorResponse>()
            .ok()
            .and_then(|e| e.error_description.or(e.error))
            .unwrap_or_else(|| "no error message".to_string());
        return Err(AuthError::Rejected {
            endpoint: TOKEN_ENDPOINT,
            status: response.status,
            message,
        });
    }

    let parsed: TokenResponse = response
        .json()
        .map_err(|e| AuthError::MalformedResponse {
            endpoint: TOKEN_ENDPOINT,
            reason: e.to_string(),
        })?;

    parsed
        .id_token
        .filter(|t| !t.is_empty())
        .map(SecretString::from)
        .ok_or_else(|| AuthError::MalformedResponse {
            endpoint: TOKEN_ENDPOINT,
            reason: "missing id_token".to_string(),
        })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use reqwest::Method;

    use super::*;
    use crate::config::tests::test_config;
    use crate::transport::RequestBody;
    use crate::transport::mock::MockTransport;

    fn oauth() -> OAuthConfig {
        test_config().oauth.unwrap()
    }

    fn callback(suffix: &str) -> Url {
        Url::parse(&format!("com.tuckbox.app://oauth2redirect{suffix}")).unwrap()
    }

    #[test]
    fn test_verifier_shape() {
        let verifier = PkceVerifier::generate();
        assert_eq!(verifier.expose().len(), 43);
        assert!(
            verifier
                .expose()
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
        assert_ne!(verifier.expose(), PkceVerifier::generate().expose());
    }

    #[test]
    fn test_challenge_matches_rfc7636_appendix_b() {
        assert_eq!(
            challenge_for("dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn test_authorization_url_carries_challenge_not_verifier() {
        let verifier = PkceVerifier::generate();
        let url = authorization_url(&oauth(), &verifier.challenge(), "st4te").unwrap();
        let params: HashMap<_, _> = url.query_pairs().into_owned().collect();

        assert_eq!(params["client_id"], "client-123");
        assert_eq!(params["redirect_uri"], "https://tuckbox.test/__/auth/handler");
        assert_eq!(params["response_type"], "code");
        assert_eq!(params["scope"], "openid email profile");
        assert_eq!(params["code_challenge"], verifier.challenge());
        assert_eq!(params["code_challenge_method"], "S256");
        assert_eq!(params["prompt"], "select_account");
        assert_eq!(params["state"], "st4te");
        assert!(!url.as_str().contains(verifier.expose()));
    }

    #[test]
    fn test_callback_code_from_query() {
        let outcome = parse_callback(&callback("?code=abc&state=s1"), &callback(""), "s1");
        assert!(matches!(
            outcome,
            CallbackOutcome::Grant(AuthorizationGrant::Code(ref c)) if c == "abc"
        ));
    }

    #[test]
    fn test_callback_id_token_from_fragment() {
        let outcome = parse_callback(&callback("#id_token=xyz&state=s1"), &callback(""), "s1");
        match outcome {
            CallbackOutcome::Grant(AuthorizationGrant::IdToken(token)) => {
                assert_eq!(token.expose_secret(), "xyz");
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn test_query_wins_over_fragment() {
        let outcome = parse_callback(
            &callback("?code=from-query&state=s1#code=from-fragment"),
            &callback(""),
            "s1",
        );
        assert!(matches!(
            outcome,
            CallbackOutcome::Grant(AuthorizationGrant::Code(ref c)) if c == "from-query"
        ));
    }

    #[test]
    fn test_callback_without_grant_fails() {
        let outcome = parse_callback(&callback("?state=s1"), &callback(""), "s1");
        assert!(matches!(
            outcome,
            CallbackOutcome::Failed(AuthError::MissingGrant)
        ));
    }

    #[test]
    fn test_callback_state_mismatch_fails() {
        let outcome = parse_callback(&callback("?code=abc&state=evil"), &callback(""), "s1");
        assert!(matches!(
            outcome,
            CallbackOutcome::Failed(AuthError::CallbackMismatch(_))
        ));
        let outcome = parse_callback(&callback("?code=abc"), &callback(""), "s1");
        assert!(matches!(
            outcome,
            CallbackOutcome::Failed(AuthError::CallbackMismatch(_))
        ));
    }

    #[test]
    fn test_callback_wrong_scheme_fails() {
        let foreign = Url::parse("https://evil.test/oauth2redirect?code=abc&state=s1").unwrap();
        let outcome = parse_callback(&foreign, &callback(""), "s1");
        assert!(matches!(
            outcome,
            CallbackOutcome::Failed(AuthError::CallbackMismatch(_))
        ));
    }

    #[test]
    fn test_callback_provider_error() {
        let outcome = parse_callback(
            &callback("?error=access_denied&state=s1"),
            &callback(""),
            "s1",
        );
        assert!(matches!(
            outcome,
            CallbackOutcome::Failed(AuthError::ProviderError(_))
        ));
    }

    #[tokio::test]
    async fn test_exchange_code_sends_verifier() {
        let mock = MockTransport::new().on(
            Method::POST,
            "oauth2.test/token",
            200,
            r#"{"id_token":"google-id","access_token":"ya29"}"#,
        );
        let verifier = PkceVerifier::generate();

        let token = exchange_code(&mock, &oauth(), "abc", &verifier)
            .await
            .unwrap();
        assert_eq!(token.expose_secret(), "google-id");

        let calls = mock.calls();
        let RequestBody::Form(fields) = &calls[0].body else {
            panic!("expected form body");
        };
        let fields: HashMap<_, _> = fields.iter().cloned().collect();
        assert_eq!(fields["code"], "abc");
        assert_eq!(fields["code_verifier"], verifier.expose());
        assert_eq!(fields["grant_type"], "authorization_code");
        assert_eq!(fields["redirect_uri"], "https://tuckbox.test/__/auth/handler");
    }

    #[tokio::test]
    async fn test_exchange_code_without_id_token_fails() {
        let mock = MockTransport::new().on(
            Method::POST,
            "oauth2.test/token",
            200,
            r#"{"access_token":"ya29"}"#,
        );
        let err = exchange_code(&mock, &oauth(), "abc", &PkceVerifier::generate())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MalformedResponse { .. }));
    }
}
