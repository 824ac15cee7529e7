//! HTTP transport seam.
//!
//! Every network call in this crate goes through [`HttpTransport`] so the
//! session and store logic can be exercised against a recording mock. The
//! production implementation is a thin wrapper over `reqwest`.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use url::Url;

/// Request timeout for the production transport.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised before any HTTP status is available.
#[derive(Debug, Error)]
pub enum TransportError {
    /// HTTP request failed (DNS, TLS, timeout, connection reset, ...).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The transport could not carry the request for another reason.
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Outgoing request body.
#[derive(Clone)]
pub enum RequestBody {
    /// No body.
    Empty,
    /// `application/json` body.
    Json(serde_json::Value),
    /// `application/x-www-form-urlencoded` body.
    Form(Vec<(String, String)>),
}

/// An HTTP request.
///
/// `Debug` prints only the method, path and body kind: URLs may carry
/// `auth=`/`key=` parameters and bodies may carry passwords.
#[derive(Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub body: RequestBody,
}

impl HttpRequest {
    /// A `GET` with no body.
    #[must_use]
    pub const fn get(url: Url) -> Self {
        Self {
            method: Method::GET,
            url,
            body: RequestBody::Empty,
        }
    }

    /// A `PUT` with a JSON body.
    #[must_use]
    pub const fn put_json(url: Url, body: serde_json::Value) -> Self {
        Self {
            method: Method::PUT,
            url,
            body: RequestBody::Json(body),
        }
    }

    /// A `POST` with a JSON body.
    #[must_use]
    pub const fn post_json(url: Url, body: serde_json::Value) -> Self {
        Self {
            method: Method::POST,
            url,
            body: RequestBody::Json(body),
        }
    }

    /// A `POST` with a form-encoded body.
    #[must_use]
    pub const fn post_form(url: Url, fields: Vec<(String, String)>) -> Self {
        Self {
            method: Method::POST,
            url,
            body: RequestBody::Form(fields),
        }
    }
}

impl fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match &self.body {
            RequestBody::Empty => "empty",
            RequestBody::Json(_) => "json",
            RequestBody::Form(_) => "form",
        };
        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("path", &self.url.path())
            .field("body", &body)
            .finish()
    }
}

/// A fully-read HTTP response.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: String,
}

impl HttpResponse {
    /// Whether the status is 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error if the body does not match `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// Sends requests and reads whole responses.
///
/// Implementations must not treat non-2xx as an error: status handling is
/// the caller's policy.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Send one request.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Create a transport with a 30 second request timeout.
    ///
    /// # Errors
    ///
    /// Returns `TransportError::Http` if the TLS backend cannot be initialised.
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("TuckBox/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an existing client.
    #[must_use]
    pub const fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let builder = self.client.request(request.method, request.url);
        let builder = match request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Form(fields) => builder.form(&fields),
        };

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(HttpResponse { status, body })
    }
}
