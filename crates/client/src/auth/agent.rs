//! The user agent seam: whatever shows the provider's consent page and
//! brings back the redirect.

use async_trait::async_trait;
use url::Url;

use super::AuthError;

/// How the interactive step ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentResponse {
    /// The provider redirected to the app callback with this URL.
    Redirected(Url),
    /// The user backed out.
    Cancelled,
}

/// Presents an authorization URL to the user and waits for the callback.
///
/// There is no timeout: the user may take as long as they like. Dropping
/// the returned future abandons the attempt.
#[async_trait]
pub trait UserAgent: Send + Sync {
    /// Open `authorization_url` and wait for a redirect to `callback_uri`.
    async fn authorize(
        &self,
        authorization_url: &Url,
        callback_uri: &Url,
    ) -> Result<AgentResponse, AuthError>;
}
